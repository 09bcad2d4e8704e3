//! Cooperative cancellation for the check run.
//!
//! The token is set from a Ctrl-C handler and consulted by the runner
//! between checks, never mid-check: an in-flight batch is allowed to
//! drain so its handles stay meaningful. Once cancelled, a token stays
//! cancelled forever.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable cancellation flag shared between the signal handler and the
/// runner.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation (idempotent).
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// True once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
