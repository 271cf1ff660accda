//! Peripheral drivers and event reporting for the RoboTerra RoboCore on no-std
//! embedded platforms.
//!
//! For a runnable simulation, see the `terra-app/mock-robocore` binary.
#![no_std]

extern crate alloc;

pub mod utils;
