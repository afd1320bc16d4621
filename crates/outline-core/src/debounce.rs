//! Tick-driven debouncing.
//!
//! The crate never spawns timers. The host calls [`Debouncer::poll`] from its run loop
//! and acts when it returns `true`.

use std::time::{Duration, Instant};

/// Coalesces bursts of triggers into one firing `delay` after the last trigger.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
    triggers: usize,
}

impl Debouncer {
    /// Create an idle debouncer.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
            triggers: 0,
        }
    }

    /// Debounce delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Change the delay. A pending deadline keeps its old value.
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Record a trigger at `now`, pushing the deadline back.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
        self.triggers += 1;
    }

    /// `true` while a firing is scheduled.
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Triggers coalesced into the pending firing.
    pub fn pending_triggers(&self) -> usize {
        self.triggers
    }

    /// Returns `true` exactly once when the deadline has passed, then goes idle.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.triggers = 0;
                true
            }
            _ => false,
        }
    }

    /// Reschedule a due firing one delay later (used when the work cannot run yet).
    pub fn defer(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Drop any pending firing.
    pub fn cancel(&mut self) {
        self.deadline = None;
        self.triggers = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_fires_once_after_last_trigger() {
        let start = Instant::now();
        let ms = Duration::from_millis;
        let mut debouncer = Debouncer::new(ms(100));

        debouncer.trigger(start);
        debouncer.trigger(start + ms(50));
        assert_eq!(debouncer.pending_triggers(), 2);
        assert!(!debouncer.poll(start + ms(120)));
        assert!(debouncer.poll(start + ms(150)));
        assert!(!debouncer.poll(start + ms(500)));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_defer_and_cancel() {
        let start = Instant::now();
        let ms = Duration::from_millis;
        let mut debouncer = Debouncer::new(ms(10));
        debouncer.trigger(start);
        debouncer.defer(start + ms(10));
        assert!(!debouncer.poll(start + ms(15)));
        debouncer.cancel();
        assert!(!debouncer.poll(start + ms(100)));
    }
}
