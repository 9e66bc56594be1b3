use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag threaded through a planning run. The
/// traverser observes it at every node entry; cancelling discards the run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_visible_through_clones() {
        let token = CancelToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());

        token.cancel();
        assert!(observer.is_cancelled());
    }
}
