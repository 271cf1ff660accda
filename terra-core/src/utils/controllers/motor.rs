//! DC motor driver for the RoboCore motor ports.
//!
//! The motor is driven by one PWM output (speed) and one digital output
//! (direction, high = forward). Every transition is driven synchronously by a
//! host call, so the motor never asks the kernel for service.

use embassy_time::Instant;
use embedded_hal::{
    digital::{OutputPin, PinState},
    pwm::SetDutyCycle,
};
use embedded_io::Write;
use serde::{Deserialize, Serialize};

use crate::utils::{
    connection::wire::Reporter,
    electronics::{
        DeviceKind, DriverError, Electronics, ElectronicsBase, PortId, RoboCoreLink, Service,
    },
    events::{queue::EventQueue, EventKind, EventSource, Source},
    math::duty::{self, duty_for, DUTY_FULL_SCALE},
};

/// Motor state; the discriminant is the state byte on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MotorState {
    Inactive = 0,
    Stop = 1,
    Move = 2,
}

/// Motor command variants.
///
/// Serialized as JSON with tag `"mc"`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "mc", rename_all = "snake_case")]
pub enum MotorCommand {
    Activate,
    Deactivate,
    /// Signed speed in `-10..=10`; zero pauses.
    Rotate { s: i32 },
    Reverse,
    Pause,
    Resume,
}

pub struct Motor<'a, W, PWM, DIR> {
    base: ElectronicsBase<'a>,
    reporter: Reporter<'a, W>,
    speed_pin: PWM,
    dir_pin: DIR,
    state: MotorState,
    /// Last commanded speed, kept across `pause` for `resume`.
    speed: i8,
    direction: bool,
}

impl<'a, W, PWM, DIR> Motor<'a, W, PWM, DIR>
where
    W: Write,
    PWM: SetDutyCycle,
    DIR: OutputPin,
{
    /// Bind a motor to `port`. Only the two motor ports are accepted.
    ///
    /// The motor starts inactive and reports DEACTIVATE with the current
    /// number of active motors.
    pub fn attach(
        link: RoboCoreLink<'a, W>,
        port: impl Into<PortId>,
        speed_pin: PWM,
        dir_pin: DIR,
    ) -> Result<Self, DriverError> {
        let port = port.into();
        let base = ElectronicsBase::attach(DeviceKind::Motor, port, link.registry)?;
        let source = Source {
            kind: DeviceKind::Motor,
            port,
        };
        let mut motor = Self {
            base,
            reporter: Reporter::new(link, source),
            speed_pin,
            dir_pin,
            state: MotorState::Inactive,
            speed: 0,
            direction: true,
        };
        tracing::debug!(port = port.0, "motor attached");
        let count = motor.base.active_count();
        motor.emit(EventKind::Deactivate, i16::from(count), 0);
        Ok(motor)
    }

    pub fn state(&self) -> MotorState {
        self.state
    }

    /// Last commanded signed speed. Retained while stopped.
    pub fn speed(&self) -> i8 {
        self.speed
    }

    /// `true` for forward.
    pub fn direction(&self) -> bool {
        self.direction
    }

    /// Duty currently applied to the speed output, out of 255.
    pub fn output_duty(&self) -> u8 {
        match self.state {
            MotorState::Move => duty_for(self.speed),
            _ => 0,
        }
    }

    pub fn events(&self) -> &EventQueue {
        self.reporter.queue()
    }

    pub fn events_mut(&mut self) -> &mut EventQueue {
        self.reporter.queue_mut()
    }

    /// Set a signed speed in `-10..=10`.
    ///
    /// From STOP a nonzero speed starts the motor. While moving, a sign flip
    /// reports REVERSE and a magnitude change reports SPEED_CHANGE; both can
    /// fire for one call. Zero while moving is the same as [`pause`](Self::pause).
    pub fn rotate(
        &mut self,
        speed: i32,
    ) -> Result<(), DriverError> {
        if !self.base.is_active() {
            tracing::trace!(speed, "rotate ignored, motor inactive");
            return Ok(());
        }
        if speed == 0 {
            return match self.state {
                MotorState::Move => self.pause(),
                _ => Ok(()),
            };
        }
        if !duty::in_range(speed) {
            return Err(DriverError::OutOfRange(speed));
        }
        let speed = speed as i8;

        match self.state {
            MotorState::Stop => {
                self.drive(speed)?;
                self.speed = speed;
                self.state = MotorState::Move;
                self.emit(EventKind::MotorSpeedChange, self.magnitude(), self.direction_data());
            }
            MotorState::Move => {
                if speed == self.speed {
                    return Ok(());
                }
                let previous = self.speed;
                self.drive(speed)?;
                self.speed = speed;
                if (previous > 0) != (speed > 0) {
                    self.emit(EventKind::MotorReverse, self.magnitude(), self.direction_data());
                }
                if previous.unsigned_abs() != speed.unsigned_abs() {
                    self.emit(EventKind::MotorSpeedChange, self.magnitude(), self.direction_data());
                }
            }
            MotorState::Inactive => {}
        }
        Ok(())
    }

    /// Flip direction while moving, keeping the magnitude.
    pub fn reverse(&mut self) -> Result<(), DriverError> {
        if !self.base.is_active() || self.state != MotorState::Move {
            return Ok(());
        }
        let direction = !self.direction;
        self.dir_pin
            .set_state(PinState::from(direction))
            .map_err(DriverError::pin)?;
        self.direction = direction;
        self.speed = -self.speed;
        self.emit(EventKind::MotorReverse, self.magnitude(), self.direction_data());
        Ok(())
    }

    /// Stop the output while moving. The speed is remembered for `resume`.
    pub fn pause(&mut self) -> Result<(), DriverError> {
        if !self.base.is_active() || self.state != MotorState::Move {
            return Ok(());
        }
        self.speed_pin
            .set_duty_cycle_fully_off()
            .map_err(DriverError::pwm)?;
        self.state = MotorState::Stop;
        self.emit(EventKind::MotorSpeedZero, 0, self.direction_data());
        Ok(())
    }

    /// Re-apply the remembered speed after a `pause`.
    pub fn resume(&mut self) -> Result<(), DriverError> {
        if !self.base.is_active() || self.state != MotorState::Stop || self.speed == 0 {
            return Ok(());
        }
        self.drive(self.speed)?;
        self.state = MotorState::Move;
        self.emit(EventKind::MotorSpeedChange, self.magnitude(), self.direction_data());
        Ok(())
    }

    /// Execute an incoming `MotorCommand`.
    pub fn execute(
        &mut self,
        cmd: MotorCommand,
    ) -> Result<(), DriverError> {
        match cmd {
            MotorCommand::Activate => self.activate(),
            MotorCommand::Deactivate => self.deactivate(),
            MotorCommand::Rotate { s } => self.rotate(s),
            MotorCommand::Reverse => self.reverse(),
            MotorCommand::Pause => self.pause(),
            MotorCommand::Resume => self.resume(),
        }
    }

    /// Write direction and duty for `speed`. `direction` is only updated once
    /// both writes succeed; a failed duty write restores the previous level
    /// on the direction pin.
    fn drive(
        &mut self,
        speed: i8,
    ) -> Result<(), DriverError> {
        let direction = speed > 0;
        self.dir_pin
            .set_state(PinState::from(direction))
            .map_err(DriverError::pin)?;
        if let Err(e) = self
            .speed_pin
            .set_duty_cycle_fraction(u16::from(duty_for(speed)), u16::from(DUTY_FULL_SCALE))
        {
            // put the direction pin back so it matches `self.direction`
            if direction != self.direction {
                if let Err(rollback) = self.dir_pin.set_state(PinState::from(self.direction)) {
                    tracing::warn!(?rollback, "direction rollback failed");
                }
            }
            return Err(DriverError::pwm(e));
        }
        self.direction = direction;
        Ok(())
    }

    fn magnitude(&self) -> i16 {
        i16::from(self.speed.unsigned_abs())
    }

    fn direction_data(&self) -> i16 {
        i16::from(self.direction)
    }
}

impl<W, PWM, DIR> EventSource for Motor<'_, W, PWM, DIR>
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

impl<W, PWM, DIR> Electronics for Motor<'_, W, PWM, DIR>
where
    W: Write,
    PWM: SetDutyCycle,
    DIR: OutputPin,
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

    fn activate(&mut self) -> Result<(), DriverError> {
        let Some(count) = self.base.activate() else {
            return Ok(());
        };
        self.state = MotorState::Stop;
        tracing::debug!(port = self.base.port().0, count, "motor activated");
        self.emit(EventKind::Activate, i16::from(count), 0);
        Ok(())
    }

    /// A moving motor is stopped and reports SPEED_ZERO before DEACTIVATE.
    fn deactivate(&mut self) -> Result<(), DriverError> {
        if !self.base.is_active() {
            return Ok(());
        }
        let was_moving = self.state == MotorState::Move;
        if was_moving {
            self.speed_pin
                .set_duty_cycle_fully_off()
                .map_err(DriverError::pwm)?;
        }
        let Some(count) = self.base.deactivate() else {
            return Ok(());
        };
        self.state = MotorState::Inactive;
        tracing::debug!(port = self.base.port().0, count, "motor deactivated");
        if was_moving {
            self.emit(EventKind::MotorSpeedZero, 0, self.direction_data());
        }
        self.emit(EventKind::Deactivate, i16::from(count), 0);
        Ok(())
    }
}

/// Motors are driven entirely by host calls and never request service.
impl<W, PWM, DIR> Service for Motor<'_, W, PWM, DIR> {
    fn needs_service(
        &mut self,
        _now: Instant,
    ) -> bool {
        false
    }

    fn step(
        &mut self,
        _now: Instant,
    ) -> Result<(), DriverError> {
        Ok(())
    }
}
