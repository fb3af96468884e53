//! Cancelable handle for one scheduled automatic transition

use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Handle to a running departure timer.
///
/// Each handle carries a process-unique generation so a timer that completes
/// on its own can unregister itself without removing a newer replacement.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    generation: u64,
    cancel: CancellationToken,
}

impl TimerHandle {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            cancel,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cancel the timer task. Canceling twice is a no-op.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generations_are_unique() {
        let a = TimerHandle::new(CancellationToken::new());
        let b = TimerHandle::new(CancellationToken::new());
        assert_ne!(a.generation(), b.generation());
    }

    #[test]
    fn test_cancel_is_idempotent_and_shared_with_task_token() {
        let token = CancellationToken::new();
        let handle = TimerHandle::new(token.clone());
        assert!(!handle.is_cancelled());
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
        assert!(token.is_cancelled());
    }
}
