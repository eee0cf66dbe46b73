//! Local cognitive state tracking.
//!
//! An [`EventLog`] stamps events with a persisted tick and a stable session
//! id, deduplicates them by content hash and keeps them in the working
//! context's state directory.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod sequence;
pub mod session;
pub mod log;
pub mod stats;
pub mod export;

pub use config::TrackerConfig;
pub use error::{Result, TrackerError};
pub use sequence::SequenceStore;
pub use session::SessionStore;
pub use log::{EventLog, InitOutcome, QueryFilter, Recorded};
pub use stats::{LogStats, StateCount, TimeRange};
pub use export::{ExportOutcome, CSV_HEADER};

#[cfg(test)]
mod testing;
