//! Cooperative cancellation flag shared between a transfer and its caller

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable cancel flag. Any clone may raise it from any thread; the
/// transfer engine polls it once per chunk.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Lower the flag so the same handle can drive another transfer
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Release);
    }
}
