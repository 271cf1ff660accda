//! Module Exports
//!
//! This file exports the RoboCore peripheral drivers and the host command
//! surface.
//!
//! - `button`: debounced push-button input on the digital I/O ports.
//! - `motor`: DC motor output on the motor ports.

pub mod button;
pub mod motor;

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use serde::{Deserialize, Serialize};

use crate::utils::electronics::PortId;

pub use button::{Button, ButtonCommand, ButtonConfig, ButtonState};
pub use motor::{Motor, MotorCommand, MotorState};

/// Host commands waiting for the kernel. Drained once per scheduling cycle.
pub static COMMAND_CHANNEL: Channel<CriticalSectionRawMutex, SystemCommand, 16> = Channel::new();

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "ct", rename_all = "snake_case")] // ct = command type
pub enum SystemCommand {
    /// Motor command for the motor on port `p`.
    M { p: PortId, c: MotorCommand },
    /// Button command for the button on port `p`.
    B { p: PortId, c: ButtonCommand },
}

impl SystemCommand {
    /// Parse one JSON-encoded command, e.g.
    /// `{"ct":"m","p":5,"c":{"mc":"rotate","s":5}}`.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn port(&self) -> PortId {
        match self {
            SystemCommand::M { p, .. } | SystemCommand::B { p, .. } => *p,
        }
    }
}
