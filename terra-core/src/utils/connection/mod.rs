//! Module Exports
//!
//! This file exports the serial side of the peripheral core.
//!
//! # Modules
//! - `wire`: Encodes events into fixed serial frames for the RoboTerra UI and
//!   delivers each event to both the wire and the peripheral's queue.

/// Module for event framing and dual delivery.
pub mod wire;
