//! Push-button driver for the RoboCore digital I/O ports.
//!
//! The kernel samples the button through [`Service::needs_service`]; a level
//! change must hold for the debounce interval before [`Service::step`] accepts
//! it as a press or release.

use embassy_time::{Duration, Instant};
use embedded_hal::digital::InputPin;
use embedded_io::Write;
use serde::{Deserialize, Serialize};

use crate::utils::{
    connection::wire::Reporter,
    electronics::{
        DeviceKind, DriverError, Electronics, ElectronicsBase, PortId, RoboCoreLink, Service,
    },
    events::{queue::EventQueue, EventKind, EventSource, Source},
};

/// Default contact bounce suppression window.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

/// Button state; the discriminant is the state byte on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ButtonState {
    Inactive = 0,
    Released = 1,
    Pressed = 2,
}

/// Button command variants.
///
/// Serialized as JSON with tag `"bc"`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "bc", rename_all = "snake_case")]
pub enum ButtonCommand {
    Activate,
    Deactivate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonConfig {
    /// How long a new level must hold before it counts.
    pub debounce: Duration,
    /// Pressed reads low (pull-up wiring).
    pub active_low: bool,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            active_low: false,
        }
    }
}

pub struct Button<'a, W, IN> {
    base: ElectronicsBase<'a>,
    reporter: Reporter<'a, W>,
    pin: IN,
    config: ButtonConfig,
    last_level: bool,
    last_change: Instant,
    /// Presses and releases both count.
    count: u16,
    state: ButtonState,
    service_flag: bool,
}

impl<'a, W, IN> Button<'a, W, IN>
where
    W: Write,
    IN: InputPin,
{
    /// Bind a button to one of the digital I/O ports.
    ///
    /// The button starts inactive and reports DEACTIVATE with the current
    /// number of active buttons.
    pub fn attach(
        link: RoboCoreLink<'a, W>,
        port: impl Into<PortId>,
        pin: IN,
        config: ButtonConfig,
    ) -> Result<Self, DriverError> {
        let port = port.into();
        let base = ElectronicsBase::attach(DeviceKind::Button, port, link.registry)?;
        let source = Source {
            kind: DeviceKind::Button,
            port,
        };
        let mut button = Self {
            base,
            reporter: Reporter::new(link, source),
            pin,
            config,
            last_level: config.active_low,
            last_change: Instant::from_ticks(0),
            count: 0,
            state: ButtonState::Inactive,
            service_flag: false,
        };
        tracing::debug!(port = port.0, "button attached");
        let count = button.base.active_count();
        button.emit(EventKind::Deactivate, i16::from(count), 0);
        Ok(button)
    }

    pub fn state(&self) -> ButtonState {
        self.state
    }

    pub fn is_pressed(&self) -> bool {
        self.state == ButtonState::Pressed
    }

    /// Accepted presses plus releases since attach. Wraps at `u16::MAX`; the
    /// event data carries the same 16 bits read as `i16`, so it turns
    /// negative past 32767.
    pub fn count(&self) -> u16 {
        self.count
    }

    pub fn events(&self) -> &EventQueue {
        self.reporter.queue()
    }

    pub fn events_mut(&mut self) -> &mut EventQueue {
        self.reporter.queue_mut()
    }

    /// Execute an incoming `ButtonCommand`.
    pub fn execute(
        &mut self,
        cmd: ButtonCommand,
    ) -> Result<(), DriverError> {
        match cmd {
            ButtonCommand::Activate => self.activate(),
            ButtonCommand::Deactivate => self.deactivate(),
        }
    }

    fn is_pressed_level(
        &self,
        level: bool,
    ) -> bool {
        level != self.config.active_low
    }

    fn sample(&mut self) -> Result<bool, DriverError> {
        self.pin.is_high().map_err(DriverError::pin)
    }
}

impl<W, IN> EventSource for Button<'_, W, IN>
where
    W: Write,
{
    fn emit(
        &mut self,
        kind: EventKind,
        first: i16,
        second: i16,
    ) {
        self.reporter
            .deliver(self.state as u8, kind, first, second);
    }
}

impl<W, IN> Electronics for Button<'_, W, IN>
where
    W: Write,
    IN: InputPin,
{
    fn kind(&self) -> DeviceKind {
        self.base.kind()
    }

    fn port(&self) -> PortId {
        self.base.port()
    }

    fn is_active(&self) -> bool {
        self.base.is_active()
    }

    /// Seeds the state from the current pin level.
    fn activate(&mut self) -> Result<(), DriverError> {
        if self.base.is_active() {
            return Ok(());
        }
        let level = self.sample()?;
        let Some(count) = self.base.activate() else {
            return Ok(());
        };
        self.last_level = level;
        self.service_flag = false;
        self.state = if self.is_pressed_level(level) {
            ButtonState::Pressed
        } else {
            ButtonState::Released
        };
        tracing::debug!(port = self.base.port().0, count, state = ?self.state, "button activated");
        self.emit(EventKind::Activate, i16::from(count), 0);
        Ok(())
    }

    fn deactivate(&mut self) -> Result<(), DriverError> {
        let Some(count) = self.base.deactivate() else {
            return Ok(());
        };
        self.state = ButtonState::Inactive;
        self.service_flag = false;
        tracing::debug!(port = self.base.port().0, count, "button deactivated");
        self.emit(EventKind::Deactivate, i16::from(count), 0);
        Ok(())
    }
}

impl<W, IN> Service for Button<'_, W, IN>
where
    W: Write,
    IN: InputPin,
{
    /// Samples the pin. Any raw level change sets the service flag and
    /// restarts the debounce window.
    fn needs_service(
        &mut self,
        now: Instant,
    ) -> bool {
        if !self.base.is_active() {
            return false;
        }
        match self.sample() {
            Ok(level) if level != self.last_level => {
                self.last_level = level;
                self.last_change = now;
                self.service_flag = true;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(port = self.base.port().0, "button read failed: {}", e),
        }
        self.service_flag
    }

    /// Accepts the sampled level once it has been stable for the debounce
    /// interval. The flag stays set until then.
    fn step(
        &mut self,
        now: Instant,
    ) -> Result<(), DriverError> {
        if !self.base.is_active() || !self.service_flag {
            return Ok(());
        }
        let settled = now
            .checked_duration_since(self.last_change)
            .is_some_and(|held| held >= self.config.debounce);
        if !settled {
            return Ok(());
        }
        self.service_flag = false;

        let pressed = self.is_pressed_level(self.last_level);
        if pressed == self.is_pressed() {
            tracing::trace!(port = self.base.port().0, "bounce ignored");
            return Ok(());
        }
        self.count = self.count.wrapping_add(1);
        let kind = if pressed {
            self.state = ButtonState::Pressed;
            EventKind::ButtonPress
        } else {
            self.state = ButtonState::Released;
            EventKind::ButtonRelease
        };
        self.emit(kind, self.count as i16, 0);
        Ok(())
    }
}
