use alloc::collections::VecDeque;

use super::Event;

/// FIFO of pending events, owned by a single peripheral.
///
/// There is no eviction: the kernel or host is expected to drain it.
#[derive(Debug, Default, Clone)]
pub struct EventQueue {
    events: VecDeque<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(
        &mut self,
        event: Event,
    ) {
        self.events.push_back(event);
    }

    /// Oldest pending event.
    pub fn dequeue(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn peek(&self) -> Option<&Event> {
        self.events.front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Remove and yield every pending event in emission order.
    pub fn drain(&mut self) -> impl Iterator<Item = Event> + '_ {
        self.events.drain(..)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
