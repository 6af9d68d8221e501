use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{MmuError, Result};

/// Token for cooperative cancellation. Cancelling stops new tasks from
/// starting; tasks already running finish normally.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Ok(()) to continue, Err if cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(MmuError::Cancelled);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_token() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());

        clone.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(MmuError::Cancelled)));
    }
}
