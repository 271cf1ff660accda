//! Utility re-exports for the RoboTerra peripheral core.
//!
//! - `electronics`: peripheral base, active-instance registry, port map and the
//!   kernel polling contract
//! - `events`: event records and the per-peripheral event queue
//! - `connection`: serial wire framing and dual event delivery
//! - `controllers`: Button and Motor drivers plus the host command surface
//! - `math`: speed to PWM duty mapping

pub mod connection;
pub mod controllers;
pub mod electronics;
pub mod events;
pub mod math;

pub use connection::wire::{Reporter, WireFrame};
pub use controllers::{button::Button, motor::Motor, SystemCommand, COMMAND_CHANNEL};
pub use electronics::{
    registry::ActiveRegistry, run_cycle, DeviceKind, DriverError, Electronics, PortId,
    RoboCoreLink, Service,
};
pub use embassy_time::{Duration, Instant};
pub use events::{queue::EventQueue, Event, EventKind, EventSource, Source};
