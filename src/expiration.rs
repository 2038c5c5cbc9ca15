use std::time::{Duration, SystemTime};

/// Deadline bookkeeping for the miss detector: a fixed-cadence poll that
/// runs for the lifetime of an active session and nowhere else. The session
/// owns the actual miss handling; this type only answers "is a poll due"
/// and keeps the cadence drift-free.
#[derive(Debug)]
pub struct ExpirationMonitor {
    next_poll_at: Option<SystemTime>,
    poll_interval: Duration,
}

impl ExpirationMonitor {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            next_poll_at: None,
            poll_interval,
        }
    }

    pub fn start(&mut self, now: SystemTime) {
        debug_assert!(
            self.next_poll_at.is_none(),
            "poll timer leaked across sessions"
        );
        self.next_poll_at = Some(now + self.poll_interval);
    }

    pub fn stop(&mut self) {
        self.next_poll_at = None;
    }

    pub fn running(&self) -> bool {
        self.next_poll_at.is_some()
    }

    pub fn next_poll_at(&self) -> Option<SystemTime> {
        self.next_poll_at
    }

    /// Schedule the next poll one interval after the previous due time, not
    /// after the observed firing time, so the cadence does not drift.
    pub fn reschedule(&mut self) {
        if let Some(at) = self.next_poll_at {
            self.next_poll_at = Some(at + self.poll_interval);
        }
    }
}
