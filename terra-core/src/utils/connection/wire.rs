//! Serial Event Framing
//!
//! Every peripheral event is reported to the RoboTerra UI as one fixed
//! 12-byte frame on the shared serial transport:
//!
//! ```text
//! [0xF0][count=1][device id][port][len=6][state][type][d1 lo][d1 hi][d2 lo][d2 hi][0xFF]
//! ```
//!
//! The count field allows batching, but every frame carries exactly one event.

use core::{cell::RefCell, fmt};

use embedded_io::Write;

use crate::utils::{
    electronics::{DeviceKind, PortId, RoboCoreLink},
    events::{queue::EventQueue, Event, EventKind, Source},
};

pub const FRAME_START: u8 = 0xF0;
pub const FRAME_END: u8 = 0xFF;
pub const EVENT_COUNT: u8 = 0x01;
pub const PAYLOAD_LEN: u8 = 6;
pub const FRAME_LEN: usize = 6 + PAYLOAD_LEN as usize;

/// Errors reported while decoding a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    Length(usize),
    StartMarker(u8),
    EndMarker(u8),
    EventCount(u8),
    PayloadLength(u8),
    UnknownDevice(u8),
    UnknownEventType(u8),
}

impl fmt::Display for FrameError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            FrameError::Length(len) => write!(f, "frame is {len} bytes, expected {FRAME_LEN}"),
            FrameError::StartMarker(b) => write!(f, "bad start marker 0x{b:02X}"),
            FrameError::EndMarker(b) => write!(f, "bad end marker 0x{b:02X}"),
            FrameError::EventCount(n) => write!(f, "unsupported event count {n}"),
            FrameError::PayloadLength(n) => write!(f, "unsupported payload length {n}"),
            FrameError::UnknownDevice(id) => write!(f, "unknown device id {id}"),
            FrameError::UnknownEventType(t) => write!(f, "unknown event type {t}"),
        }
    }
}

/// One decoded event frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireFrame {
    pub source: Source,
    pub state: u8,
    pub kind: EventKind,
    pub first: i16,
    pub second: i16,
}

impl WireFrame {
    pub fn new(
        source: Source,
        state: u8,
        kind: EventKind,
        first: i16,
        second: i16,
    ) -> Self {
        Self {
            source,
            state,
            kind,
            first,
            second,
        }
    }

    /// Data fields are little-endian.
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let [f_lo, f_hi] = self.first.to_le_bytes();
        let [s_lo, s_hi] = self.second.to_le_bytes();
        [
            FRAME_START,
            EVENT_COUNT,
            self.source.kind.device_id(),
            self.source.port.0,
            PAYLOAD_LEN,
            self.state,
            self.kind.as_byte(),
            f_lo,
            f_hi,
            s_lo,
            s_hi,
            FRAME_END,
        ]
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() != FRAME_LEN {
            return Err(FrameError::Length(bytes.len()));
        }
        if bytes[0] != FRAME_START {
            return Err(FrameError::StartMarker(bytes[0]));
        }
        if bytes[FRAME_LEN - 1] != FRAME_END {
            return Err(FrameError::EndMarker(bytes[FRAME_LEN - 1]));
        }
        if bytes[1] != EVENT_COUNT {
            return Err(FrameError::EventCount(bytes[1]));
        }
        if bytes[4] != PAYLOAD_LEN {
            return Err(FrameError::PayloadLength(bytes[4]));
        }
        let kind = DeviceKind::from_device_id(bytes[2]).ok_or(FrameError::UnknownDevice(bytes[2]))?;
        let event = EventKind::from_byte(bytes[6]).ok_or(FrameError::UnknownEventType(bytes[6]))?;

        Ok(Self {
            source: Source {
                kind,
                port: PortId(bytes[3]),
            },
            state: bytes[5],
            kind: event,
            first: i16::from_le_bytes([bytes[7], bytes[8]]),
            second: i16::from_le_bytes([bytes[9], bytes[10]]),
        })
    }

    pub fn event(&self) -> Event {
        Event::new(self.source, self.kind, self.first, self.second)
    }
}

/// Dual delivery of a peripheral's events: wire frame on the shared serial
/// transport, then the local event queue.
///
/// The two channels are independent. A serial failure is logged and the event
/// is still enqueued.
pub struct Reporter<'a, W> {
    serial: &'a RefCell<W>,
    source: Source,
    queue: EventQueue,
}

impl<'a, W: Write> Reporter<'a, W> {
    pub fn new(
        link: RoboCoreLink<'a, W>,
        source: Source,
    ) -> Self {
        Self {
            serial: link.serial,
            source,
            queue: EventQueue::new(),
        }
    }

    pub fn deliver(
        &mut self,
        state: u8,
        kind: EventKind,
        first: i16,
        second: i16,
    ) {
        let frame = WireFrame::new(self.source, state, kind, first, second);
        if let Err(e) = self.serial.borrow_mut().write_all(&frame.encode()) {
            tracing::warn!(?e, ?kind, "failed to write event frame");
        }
        tracing::debug!(source = ?self.source, ?kind, first, second, state, "event");
        self.queue.enqueue(frame.event());
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut EventQueue {
        &mut self.queue
    }
}
