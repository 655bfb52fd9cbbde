//! Thread-safe FIFO of received envelopes.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use herding_types::Envelope;

/// Shared queue that delivery paths append to and the engine drains.
///
/// Cloning yields another handle to the same queue.
#[derive(Debug, Clone, Default)]
pub struct Inbox {
    queue: Arc<Mutex<VecDeque<Envelope>>>,
}

impl Inbox {
    /// Create an empty inbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a received envelope.
    pub fn push(&self, envelope: Envelope) {
        self.lock().push_back(envelope);
    }

    /// Remove and return every queued envelope in arrival order.
    pub fn take_all(&self) -> Vec<Envelope> {
        self.lock().drain(..).collect()
    }

    /// Number of envelopes waiting.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the queue half-updated,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Envelope>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
