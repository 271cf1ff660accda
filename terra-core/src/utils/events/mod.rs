//! Event records emitted by peripheral drivers.
//!
//! Every observable state transition produces one `Event`. Events are
//! immutable once built and carry at most two integer data fields.

pub mod queue;

use serde::{Deserialize, Serialize};

use crate::utils::electronics::{DeviceKind, PortId};

/// Event types understood by the RoboTerra UI. The discriminant is the type
/// byte on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum EventKind {
    Activate = 1,
    Deactivate = 2,
    ButtonPress = 3,
    ButtonRelease = 4,
    MotorSpeedChange = 5,
    MotorReverse = 6,
    MotorSpeedZero = 7,
}

impl EventKind {
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(EventKind::Activate),
            2 => Some(EventKind::Deactivate),
            3 => Some(EventKind::ButtonPress),
            4 => Some(EventKind::ButtonRelease),
            5 => Some(EventKind::MotorSpeedChange),
            6 => Some(EventKind::MotorReverse),
            7 => Some(EventKind::MotorSpeedZero),
            _ => None,
        }
    }
}

/// Identity of the peripheral that emitted an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    pub kind: DeviceKind,
    pub port: PortId,
}

/// A single peripheral event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    source: Source,
    kind: EventKind,
    first: i16,
    second: i16,
}

impl Event {
    pub const fn new(
        source: Source,
        kind: EventKind,
        first: i16,
        second: i16,
    ) -> Self {
        Self {
            source,
            kind,
            first,
            second,
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn first_data(&self) -> i16 {
        self.first
    }

    pub fn second_data(&self) -> i16 {
        self.second
    }
}

/// A peripheral that reports its transitions.
///
/// Implementors supply their current state byte and hand off to
/// [`Reporter::deliver`](crate::utils::connection::wire::Reporter::deliver),
/// which writes the wire frame and enqueues the event in that order.
pub trait EventSource {
    fn emit(
        &mut self,
        kind: EventKind,
        first: i16,
        second: i16,
    );
}
