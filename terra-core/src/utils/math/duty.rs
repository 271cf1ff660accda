//! Speed to PWM duty mapping for RoboTerra DC motors.
//!
//! A speed magnitude of `1..=10` maps linearly onto a duty of `40..=220` out
//! of [`DUTY_FULL_SCALE`]; zero means the output is off.
//!
//! # Example
//! ```rust
//! use terra_core::utils::math::duty::duty_for;
//! assert_eq!(duty_for(5), 120);
//! assert_eq!(duty_for(-10), 220);
//! assert_eq!(duty_for(0), 0);
//! ```

/// Denominator of every duty value written to the PWM output.
pub const DUTY_FULL_SCALE: u8 = 255;

pub const MAX_SPEED: i8 = 10;
pub const MIN_SPEED: i8 = -MAX_SPEED;

const DUTY_PER_STEP: u8 = 20;
const DUTY_OFFSET: u8 = 20;

/// Whether `speed` is inside the motor's accepted range.
pub fn in_range(speed: i32) -> bool {
    (i32::from(MIN_SPEED)..=i32::from(MAX_SPEED)).contains(&speed)
}

/// Duty cycle for `speed`, out of [`DUTY_FULL_SCALE`].
pub fn duty_for(speed: i8) -> u8 {
    let magnitude = speed.unsigned_abs().min(MAX_SPEED as u8);
    if magnitude == 0 {
        return 0;
    }
    magnitude * DUTY_PER_STEP + DUTY_OFFSET
}
