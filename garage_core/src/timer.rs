//! Single-slot cancellable deadline.
//!
//! Every component owns one `OneShot` per timer kind. Arming replaces any
//! pending deadline, which gives cancel-then-rearm for free: there is never
//! more than one outstanding instance of a given timer.

use std::time::Instant;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OneShot {
    due: Option<Instant>,
}

impl OneShot {
    pub const fn new() -> Self {
        Self { due: None }
    }

    /// Arm for `at`, dropping whatever was pending.
    #[inline]
    pub fn arm(&mut self, at: Instant) {
        self.due = Some(at);
    }

    /// Cancel; returns whether something was pending.
    #[inline]
    pub fn cancel(&mut self) -> bool {
        self.due.take().is_some()
    }

    #[inline]
    pub fn due(&self) -> Option<Instant> {
        self.due
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.due.is_some()
    }

    /// Disarm and return the deadline if it is at or before `now`.
    pub fn take_expired(&mut self, now: Instant) -> Option<Instant> {
        match self.due {
            Some(at) if at <= now => self.due.take(),
            _ => None,
        }
    }
}
