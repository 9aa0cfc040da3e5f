// src/host.rs - The capability a host application drives

use crate::event::HostEvent;
use std::time::{Duration, Instant};

/// Receives the host's event-loop ticks and named events.
///
/// The host calls `on_tick` once per loop iteration with the time elapsed
/// since the last user input, and `on_event` whenever a named event such as
/// `focus-lost` or `post-init` occurs.
pub trait HostListener {
    fn on_tick(&self, now: Instant, idle: Duration);
    fn on_event(&self, now: Instant, event: &HostEvent);
}

/// Idle time as seen by a host that records its own input timestamps.
#[derive(Debug, Clone, Copy)]
pub struct IdleClock {
    last_input: Instant,
}

impl IdleClock {
    pub fn new(now: Instant) -> Self {
        Self { last_input: now }
    }

    pub fn record_input(&mut self, now: Instant) {
        self.last_input = now;
    }

    pub fn idle(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_input)
    }
}
