//! The per-trial shared cancellation flag.
//!
//! One flag is created per trial and handed to every detector.  Detectors
//! write it (at most once wins); the coordinating thread only reads it.
//! The flag is advisory: it shortens the settle wait only when the
//! harness is configured to allow that.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A one-shot, first-writer-wins cancellation signal.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    tripped: Arc<AtomicBool>,
}

impl CancelFlag {
    /// A fresh, untripped flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal.  Returns `true` for the caller that actually
    /// tripped it; later calls are no-ops returning `false`.
    pub fn trip(&self) -> bool {
        !self.tripped.swap(true, Ordering::SeqCst)
    }

    /// Whether the signal has been raised.
    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }
}
