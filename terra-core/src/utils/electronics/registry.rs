//! Active-instance counters per peripheral kind.

use core::cell::Cell;

use super::DeviceKind;

/// Number of active peripherals of each kind.
///
/// Shared by reference between drivers on a single thread of control; the
/// kernel owns one registry per RoboCore.
#[derive(Debug, Default)]
pub struct ActiveRegistry {
    counts: [Cell<u8>; DeviceKind::COUNT],
}

impl ActiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(
        &self,
        kind: DeviceKind,
    ) -> u8 {
        self.counts[kind.index()].get()
    }

    /// Saturates at `u8::MAX`.
    pub fn increment(
        &self,
        kind: DeviceKind,
    ) -> u8 {
        let cell = &self.counts[kind.index()];
        let next = cell.get().saturating_add(1);
        cell.set(next);
        next
    }

    /// Floors at zero.
    pub fn decrement(
        &self,
        kind: DeviceKind,
    ) -> u8 {
        let cell = &self.counts[kind.index()];
        let next = cell.get().saturating_sub(1);
        cell.set(next);
        next
    }
}
