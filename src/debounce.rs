//! Deadline-based debounce timer.
//!
//! The single scheduling primitive behind every "write after a quiet
//! period" effect: persist-worthy state changes and document autosave.
//! Cooperative, not preemptive — `arm` records a deadline and the host
//! drives the effect from its event loop by polling `take_due`. Re-arming
//! replaces the pending deadline, coalescing a burst of triggers into one
//! eventual effect.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Debouncer {
    interval: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    /// (Re)start the quiet period. A pending deadline is replaced.
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.interval);
    }

    /// Drop a pending deadline without firing.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// True while a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// True once the quiet period has elapsed.
    pub fn is_due(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Consume a due deadline. Returns true when the caller should run the
    /// effect now; leaves a not-yet-due deadline pending.
    pub fn take_due(&mut self) -> bool {
        if self.is_due() {
            self.deadline = None;
            true
        } else {
            false
        }
    }
}
