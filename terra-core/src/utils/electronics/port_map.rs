//! RoboCore port to pin mapping.
//!
//! Motors sit on the two dedicated motor ports, buttons on the digital I/O
//! ports. The motor pin assignment changed between board revisions.

use serde::{Deserialize, Serialize};

use super::{DeviceKind, DriverError, PortId};

pub const MOTOR_A: PortId = PortId(5);
pub const MOTOR_B: PortId = PortId(6);

pub const DIO_1: PortId = PortId(1);
pub const DIO_2: PortId = PortId(2);
pub const DIO_3: PortId = PortId(3);
pub const DIO_4: PortId = PortId(4);

/// RoboCore hardware revision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardRevision {
    /// RoboCore V1.1 and V1.2.
    V1_1,
    /// RoboCore V1.3, V1.4 and V1.5.
    #[default]
    V1_3,
}

/// Board pin numbers behind a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortPins {
    Motor { pwm: u8, dir: u8 },
    Digital { pin: u8 },
}

/// Check that `port` accepts a peripheral of `kind`.
pub fn validate(
    kind: DeviceKind,
    port: PortId,
) -> Result<(), DriverError> {
    let ok = match kind {
        DeviceKind::Motor => port == MOTOR_A || port == MOTOR_B,
        DeviceKind::Button => (DIO_1.0..=DIO_4.0).contains(&port.0),
    };
    if ok {
        Ok(())
    } else {
        Err(DriverError::InvalidPort(port.0))
    }
}

/// Pin numbers for a peripheral of `kind` on `port`.
pub fn pins(
    kind: DeviceKind,
    port: PortId,
    revision: BoardRevision,
) -> Result<PortPins, DriverError> {
    validate(kind, port)?;
    let pins = match (kind, revision, port == MOTOR_A) {
        (DeviceKind::Motor, BoardRevision::V1_3, true) => PortPins::Motor { pwm: 6, dir: 2 },
        (DeviceKind::Motor, BoardRevision::V1_3, false) => PortPins::Motor { pwm: 5, dir: 4 },
        (DeviceKind::Motor, BoardRevision::V1_1, true) => PortPins::Motor { pwm: 5, dir: 4 },
        (DeviceKind::Motor, BoardRevision::V1_1, false) => PortPins::Motor { pwm: 6, dir: 2 },
        // DIO ports 1..=4 live on pins 10..=13
        (DeviceKind::Button, _, _) => PortPins::Digital { pin: port.0 + 9 },
    };
    Ok(pins)
}
