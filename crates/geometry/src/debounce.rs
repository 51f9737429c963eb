//! Trailing debouncer with an explicit clock
//!
//! Coalesces a burst of calls into one, executed after a quiet period,
//! always with the arguments of the most recent call. The caller owns
//! the clock: timestamps are passed in and delivery happens from
//! `poll`, which keeps the primitive deterministic under test and free
//! of timers.
//!
//! The contract callers rely on: at most one delivery per quiet window,
//! and the last submitted value is never dropped; `flush` hands it
//! over immediately regardless of the window.

use std::time::{Duration, Instant};

/// Default quiet window used across the viewer (scroll, overlay commits,
/// thumbnail navigation).
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(100);

/// Trailing-edge debouncer
///
/// Each `submit` replaces the pending value and restarts the quiet
/// window. `poll` delivers the pending value once the window has
/// elapsed with no further submissions.
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<T>,
    deadline: Option<Instant>,
}

impl<T> Debouncer<T> {
    /// Create a debouncer with the given quiet window
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            deadline: None,
        }
    }

    /// Submit a value, replacing any pending one and restarting the window
    pub fn submit(&mut self, value: T, now: Instant) {
        self.pending = Some(value);
        self.deadline = Some(now + self.window);
    }

    /// Deliver the pending value if the quiet window has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.pending.take()
            }
            _ => None,
        }
    }

    /// Deliver the pending value immediately, if any
    ///
    /// Used on teardown and gesture-finalization paths so the last
    /// submission is never lost.
    pub fn flush(&mut self) -> Option<T> {
        self.deadline = None;
        self.pending.take()
    }

    /// Whether a value is waiting for its window to elapse
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The configured quiet window
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn nothing_delivered_before_window_elapses() {
        let mut debouncer = Debouncer::new(ms(100));
        let start = Instant::now();

        debouncer.submit(1, start);
        assert_eq!(debouncer.poll(start), None);
        assert_eq!(debouncer.poll(start + ms(99)), None);
        assert_eq!(debouncer.poll(start + ms(100)), Some(1));
    }

    #[test]
    fn burst_coalesces_to_most_recent_value() {
        let mut debouncer = Debouncer::new(ms(100));
        let start = Instant::now();

        debouncer.submit(1, start);
        debouncer.submit(2, start + ms(10));
        debouncer.submit(3, start + ms(20));

        // Window restarted at the last submit.
        assert_eq!(debouncer.poll(start + ms(100)), None);
        assert_eq!(debouncer.poll(start + ms(120)), Some(3));
        assert_eq!(debouncer.poll(start + ms(500)), None);
    }

    #[test]
    fn each_submit_restarts_the_quiet_window() {
        let mut debouncer = Debouncer::new(ms(100));
        let start = Instant::now();

        // Keep submitting inside the window; nothing fires until quiet.
        for i in 0..5 {
            debouncer.submit(i, start + ms(50 * i as u64));
            assert_eq!(debouncer.poll(start + ms(50 * i as u64)), None);
        }

        assert_eq!(debouncer.poll(start + ms(200 + 99)), None);
        assert_eq!(debouncer.poll(start + ms(200 + 100)), Some(4));
    }

    #[test]
    fn flush_never_drops_the_last_call() {
        let mut debouncer = Debouncer::new(ms(100));
        let start = Instant::now();

        debouncer.submit("intermediate", start);
        debouncer.submit("final", start + ms(5));

        // Flushed before the window elapses, the latest value still wins.
        assert_eq!(debouncer.flush(), Some("final"));
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(start + ms(500)), None);
    }

    #[test]
    fn delivery_clears_pending_state() {
        let mut debouncer = Debouncer::new(ms(100));
        let start = Instant::now();

        debouncer.submit(7, start);
        assert!(debouncer.is_pending());
        assert_eq!(debouncer.poll(start + ms(100)), Some(7));
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.flush(), None);
    }
}
