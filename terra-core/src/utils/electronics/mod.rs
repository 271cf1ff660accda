//! Peripheral base shared by every RoboCore driver.
//!
//! Holds the port binding and active flag of a peripheral, the error type the
//! drivers return, and the two traits the kernel talks to: `Electronics` for
//! activation and `Service` for the flag-polled state machine contract.

pub mod port_map;
pub mod registry;

use core::{cell::RefCell, fmt};

use embassy_time::Instant;
use embedded_hal::{digital, pwm};
use serde::{Deserialize, Serialize};

use registry::ActiveRegistry;

/// Kind of peripheral attached to a RoboCore port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Button,
    Motor,
}

impl DeviceKind {
    pub const COUNT: usize = 2;

    /// Device identifier carried in every wire frame.
    pub const fn device_id(self) -> u8 {
        match self {
            DeviceKind::Button => 129,
            DeviceKind::Motor => 130,
        }
    }

    pub const fn from_device_id(id: u8) -> Option<Self> {
        match id {
            129 => Some(DeviceKind::Button),
            130 => Some(DeviceKind::Motor),
            _ => None,
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            DeviceKind::Button => 0,
            DeviceKind::Motor => 1,
        }
    }
}

/// RoboCore port identifier as supplied by the kernel at attach time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortId(pub u8);

impl From<u8> for PortId {
    fn from(id: u8) -> Self {
        PortId(id)
    }
}

/// Errors surfaced by the peripheral drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// The port does not accept this kind of peripheral.
    InvalidPort(u8),
    /// Motor speed outside `-10..=10`.
    OutOfRange(i32),
    /// A digital pin read or write failed.
    Pin(digital::ErrorKind),
    /// A PWM duty cycle write failed.
    Pwm(pwm::ErrorKind),
}

impl DriverError {
    pub(crate) fn pin<E: digital::Error>(err: E) -> Self {
        DriverError::Pin(err.kind())
    }

    pub(crate) fn pwm<E: pwm::Error>(err: E) -> Self {
        DriverError::Pwm(err.kind())
    }
}

impl fmt::Display for DriverError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            DriverError::InvalidPort(port) => write!(f, "invalid port {port}"),
            DriverError::OutOfRange(speed) => write!(f, "speed {speed} outside -10..=10"),
            DriverError::Pin(kind) => write!(f, "pin error: {kind:?}"),
            DriverError::Pwm(kind) => write!(f, "pwm error: {kind:?}"),
        }
    }
}

/// Activation surface every peripheral exposes to the host.
pub trait Electronics {
    fn kind(&self) -> DeviceKind;
    fn port(&self) -> PortId;
    fn is_active(&self) -> bool;

    /// Idempotent; emits ACTIVATE only on an inactive to active transition.
    fn activate(&mut self) -> Result<(), DriverError>;

    /// Idempotent; emits DEACTIVATE only on an active to inactive transition.
    fn deactivate(&mut self) -> Result<(), DriverError>;
}

/// Flag-polled contract between a peripheral and the RoboCore kernel.
pub trait Service {
    /// Whether the kernel should call `step` in this cycle.
    fn needs_service(
        &mut self,
        now: Instant,
    ) -> bool;

    /// Run one state machine step.
    fn step(
        &mut self,
        now: Instant,
    ) -> Result<(), DriverError>;
}

/// One kernel scheduling cycle: check every peripheral in order and step
/// each one that asks for it exactly once.
///
/// Returns the number of peripherals stepped. A failing step is logged and
/// does not stop the cycle.
pub fn run_cycle(
    peripherals: &mut [&mut dyn Service],
    now: Instant,
) -> usize {
    let mut stepped = 0;
    for peripheral in peripherals.iter_mut() {
        if peripheral.needs_service(now) {
            stepped += 1;
            if let Err(e) = peripheral.step(now) {
                tracing::warn!("state machine step failed: {}", e);
            }
        }
    }
    stepped
}

/// Shared RoboCore resources handed to every driver: the serial transport
/// that carries event frames and the active-instance registry.
pub struct RoboCoreLink<'a, W> {
    pub(crate) serial: &'a RefCell<W>,
    pub(crate) registry: &'a ActiveRegistry,
}

impl<'a, W> RoboCoreLink<'a, W> {
    pub fn new(
        serial: &'a RefCell<W>,
        registry: &'a ActiveRegistry,
    ) -> Self {
        Self { serial, registry }
    }
}

impl<W> Clone for RoboCoreLink<'_, W> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<W> Copy for RoboCoreLink<'_, W> {}

/// Port binding and active flag common to all peripherals.
pub(crate) struct ElectronicsBase<'a> {
    kind: DeviceKind,
    port: PortId,
    active: bool,
    registry: &'a ActiveRegistry,
}

impl<'a> ElectronicsBase<'a> {
    /// Bind to `port`, starting inactive.
    pub(crate) fn attach(
        kind: DeviceKind,
        port: PortId,
        registry: &'a ActiveRegistry,
    ) -> Result<Self, DriverError> {
        port_map::validate(kind, port)?;
        Ok(Self {
            kind,
            port,
            active: false,
            registry,
        })
    }

    pub(crate) fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub(crate) fn port(&self) -> PortId {
        self.port
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    /// Active count of this kind, for events that report it without a
    /// transition.
    pub(crate) fn active_count(&self) -> u8 {
        self.registry.count(self.kind)
    }

    /// Returns the new active count, or `None` when already active.
    pub(crate) fn activate(&mut self) -> Option<u8> {
        if self.active {
            return None;
        }
        self.active = true;
        Some(self.registry.increment(self.kind))
    }

    /// Returns the new active count, or `None` when already inactive.
    pub(crate) fn deactivate(&mut self) -> Option<u8> {
        if !self.active {
            return None;
        }
        self.active = false;
        Some(self.registry.decrement(self.kind))
    }
}
