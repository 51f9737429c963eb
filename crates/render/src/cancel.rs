//! Cooperative cancellation for render tasks
//!
//! Render tasks check their token between suspension points and bail
//! out without touching shared state once cancelled. Cancellation is
//! cooperative, never preemptive: a task that is mid-way through an
//! engine call observes the cancellation at the next checkpoint.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Cancellation token shared between a render task and its slot
///
/// Cloning shares the underlying state: cancelling any clone cancels
/// all of them. Cancelling is idempotent.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token in the non-cancelled state
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel this token and every clone of it
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether `cancel` has been called on this token or any clone
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
