//! Persisted tick counter.

use std::sync::Arc;
use chronos_core::SequenceCounter;
use chronos_storage::{Storage, StorageError};
use tracing::{debug, warn};

/// Tick handed out when the counter cannot be read or written.
pub const FALLBACK_SEQUENCE: u64 = 1;

/// Monotonic counter persisted per working context.
///
/// `next` is a read-increment-write with no locking: two processes sharing a
/// working context can hand out the same tick (last writer wins). That is a
/// known limitation of the single-agent-per-context model.
pub struct SequenceStore<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> SequenceStore<S> {
    /// Create a counter over `storage`.
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Advance the counter and return the new value.
    ///
    /// Never fails: storage errors yield [`FALLBACK_SEQUENCE`].
    pub async fn next(&self) -> u64 {
        match self.try_next().await {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "sequence counter unavailable, using fallback tick");
                FALLBACK_SEQUENCE
            }
        }
    }

    /// Last handed-out value without advancing (0 if none or unreadable).
    pub async fn peek(&self) -> u64 {
        match self.storage.load_counter().await {
            Ok(counter) => counter.map(|c| c.value).unwrap_or(0),
            Err(e) => {
                warn!(error = %e, "sequence counter unreadable");
                0
            }
        }
    }

    async fn try_next(&self) -> Result<u64, StorageError> {
        let current = self
            .storage
            .load_counter()
            .await?
            .unwrap_or_else(|| SequenceCounter::at(0));
        let next = current.advanced();
        self.storage.save_counter(&next).await?;
        debug!(tick = next.value, "advanced sequence counter");
        Ok(next.value)
    }
}
