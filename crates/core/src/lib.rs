//! CHRONOS core data models.
//!
//! This crate defines the event record, the stamp formatter and the
//! persisted documents shared by the tracker and the aggregator.

#![warn(missing_docs)]

// Identities
mod id;

// Stamping
pub mod stamp;
mod record;

// Persisted documents
mod session;
mod aggregate;

// Re-exports
pub use id::SessionId;
pub use stamp::{content_key, format_stamp, format_timestamp, StampFields};
pub use record::{ContentHash, EventRecord};
pub use session::{EventLogFile, SequenceCounter, SessionMarker};
pub use aggregate::{AggregateStore, AgentEntry, AgentSummary, MergeOutcome};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
