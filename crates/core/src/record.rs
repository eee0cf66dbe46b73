//! Event record model - one stamped cognitive state.

use crate::id::SessionId;
use crate::stamp::{format_stamp, StampFields};
use crate::Time;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// SHA-256 digest (lowercase hex) used as the deduplication key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Digest arbitrary content.
    pub fn of(content: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Borrow the hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A recorded cognitive state event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Tick within the session
    pub sequence: u64,

    /// When it was recorded
    pub timestamp: Time,

    /// Cognitive/processing state label
    pub state: String,

    /// Category of the triggering action
    pub action: String,

    /// Human-readable detail
    pub description: String,

    /// Environment the event occurred in
    pub working_context: String,

    /// Producing session
    pub session_id: SessionId,

    /// Producing agent
    pub agent_name: String,

    /// Rendered descriptor
    pub stamp: String,

    /// Dedup key
    pub content_hash: ContentHash,
}

impl EventRecord {
    /// Stamp the given fields and build the record.
    pub fn from_fields(fields: &StampFields<'_>) -> Self {
        Self {
            sequence: fields.sequence,
            timestamp: fields.timestamp,
            state: fields.state.to_string(),
            action: fields.action.to_string(),
            description: fields.description.to_string(),
            working_context: fields.working_context.to_string(),
            session_id: fields.session_id.clone(),
            agent_name: fields.agent_name.to_string(),
            stamp: format_stamp(fields),
            content_hash: ContentHash::of(&fields.content_key()),
        }
    }

    /// Fields this record was stamped from.
    pub fn fields(&self) -> StampFields<'_> {
        StampFields {
            agent_name: &self.agent_name,
            state: &self.state,
            sequence: self.sequence,
            session_id: &self.session_id,
            working_context: &self.working_context,
            action: &self.action,
            description: &self.description,
            timestamp: self.timestamp,
        }
    }
}
