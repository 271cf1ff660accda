//! Math Module
//!
//! Provides the linear speed to PWM duty mapping used by the motor driver.

pub mod duty;
