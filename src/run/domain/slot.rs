//! The process-wide run exclusivity slot.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Single-permit slot that admits one run at a time.
///
/// Acquisition never waits: a caller either gets the permit immediately or
/// is turned away. Clones share the same permit.
#[derive(Debug, Clone)]
pub struct RunSlot {
    semaphore: Arc<Semaphore>,
}

/// Proof of holding the run slot; dropping it frees the slot.
#[derive(Debug)]
pub struct RunPermit {
    _permit: OwnedSemaphorePermit,
}

impl RunSlot {
    /// Creates a free slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
        }
    }

    /// Takes the slot if it is free.
    #[must_use]
    pub fn try_acquire(&self) -> Option<RunPermit> {
        Arc::clone(&self.semaphore)
            .try_acquire_owned()
            .ok()
            .map(|permit| RunPermit { _permit: permit })
    }

    /// Returns `true` while a run holds the slot.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.semaphore.available_permits() == 0
    }
}

impl Default for RunSlot {
    fn default() -> Self {
        Self::new()
    }
}
