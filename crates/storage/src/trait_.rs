//! Storage trait abstraction.

use async_trait::async_trait;
use chronos_core::{AggregateStore, EventLogFile, SequenceCounter, SessionMarker};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Persistence for one working context.
///
/// Every document is read and written whole; `load_*` returns `None` when the
/// document does not exist yet. Implementations make each `save_*` atomic, so
/// a reader never observes a half-written document. Concurrent writers in the
/// same context are last-writer-wins.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Prepare the backing location (directories etc). Idempotent.
    async fn ensure(&self) -> Result<()>;

    // === Session marker ===

    /// Load the session marker.
    async fn load_session(&self) -> Result<Option<SessionMarker>>;

    /// Save the session marker.
    async fn save_session(&self, marker: &SessionMarker) -> Result<()>;

    // === Sequence counter ===

    /// Load the sequence counter.
    async fn load_counter(&self) -> Result<Option<SequenceCounter>>;

    /// Save the sequence counter.
    async fn save_counter(&self, counter: &SequenceCounter) -> Result<()>;

    // === Event log ===

    /// Load the event log.
    async fn load_log(&self) -> Result<Option<EventLogFile>>;

    /// Save the event log.
    async fn save_log(&self, log: &EventLogFile) -> Result<()>;
}

/// Persistence for the aggregator's store.
#[async_trait]
pub trait AggregateStorage: Send + Sync {
    /// Load the store, or an empty one if none was saved yet.
    async fn load(&self) -> Result<AggregateStore>;

    /// Replace the stored document.
    async fn save(&self, store: &AggregateStore) -> Result<()>;
}
