//! Tracker errors.

use chronos_storage::StorageError;

/// Result alias for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors surfaced by [`crate::EventLog`] operations.
///
/// Sequence and session acquisition never fail; they fall back instead.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The state directory could not be read or written
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Nothing recorded yet
    #[error("No states to export")]
    EmptyLog,
}
