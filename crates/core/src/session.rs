//! Per-working-context persisted state: session marker, sequence counter and
//! the event log document.

use crate::id::SessionId;
use crate::record::{ContentHash, EventRecord};
use crate::Time;
use serde::{Deserialize, Serialize};

/// Marks a working context as owning a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMarker {
    /// Session identifier
    pub session_id: SessionId,

    /// When the session was created
    pub created_at: Time,

    /// Agent that created it
    pub agent_name: String,
}

impl SessionMarker {
    /// Create a marker for a freshly generated session.
    pub fn new(agent_name: impl Into<String>) -> Self {
        Self {
            session_id: SessionId::generate(),
            created_at: chrono::Utc::now(),
            agent_name: agent_name.into(),
        }
    }
}

/// Last issued tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceCounter {
    /// Last value handed out
    pub value: u64,

    /// When it was last advanced
    pub updated_at: Time,
}

impl SequenceCounter {
    /// Counter positioned at `value`.
    pub fn at(value: u64) -> Self {
        Self {
            value,
            updated_at: chrono::Utc::now(),
        }
    }

    /// The counter after handing out the next tick.
    pub fn advanced(&self) -> Self {
        Self::at(self.value.saturating_add(1))
    }
}

/// Append-only event log for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLogFile {
    /// Owning session
    pub session_id: SessionId,

    /// Agent name
    pub agent_name: String,

    /// When the log was created
    pub created_at: Time,

    /// Working directory the log belongs to
    pub working_context: String,

    /// Records in append order
    #[serde(default)]
    pub records: Vec<EventRecord>,
}

impl EventLogFile {
    /// Create an empty log.
    pub fn new(
        session_id: SessionId,
        agent_name: impl Into<String>,
        working_context: impl Into<String>,
    ) -> Self {
        Self {
            session_id,
            agent_name: agent_name.into(),
            created_at: chrono::Utc::now(),
            working_context: working_context.into(),
            records: Vec::new(),
        }
    }

    /// Find a record by its content hash.
    pub fn find_by_hash(&self, hash: &ContentHash) -> Option<&EventRecord> {
        // Linear scan; fine at agent-session scale.
        self.records.iter().find(|r| &r.content_hash == hash)
    }

    /// Append unless a record with the same hash exists.
    ///
    /// Returns `false` (and leaves the log untouched) on a duplicate.
    pub fn append(&mut self, record: EventRecord) -> bool {
        if self.find_by_hash(&record.content_hash).is_some() {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Most recently appended record.
    pub fn latest(&self) -> Option<&EventRecord> {
        self.records.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stamp::StampFields;

    fn record(log: &EventLogFile, sequence: u64, description: &str) -> EventRecord {
        EventRecord::from_fields(&StampFields {
            agent_name: &log.agent_name,
            state: "Thinking",
            sequence,
            session_id: &log.session_id,
            working_context: &log.working_context,
            action: "event",
            description,
            timestamp: chrono::Utc::now(),
        })
    }

    #[test]
    fn test_counter_advances() {
        let counter = SequenceCounter::at(41);
        assert_eq!(counter.advanced().value, 42);
        assert_eq!(SequenceCounter::at(u64::MAX).advanced().value, u64::MAX);
    }

    #[test]
    fn test_append_rejects_duplicate_hash() {
        let mut log = EventLogFile::new(SessionId::from("s"), "agent", "/w");
        let first = record(&log, 1, "a");
        assert!(log.append(first.clone()));
        assert!(!log.append(record(&log, 2, "a")));
        assert_eq!(log.records.len(), 1);
        assert_eq!(log.latest(), Some(&first));
        assert_eq!(log.find_by_hash(&first.content_hash).unwrap().sequence, 1);
    }

    #[test]
    fn test_log_without_records_field_deserializes() {
        let json = serde_json::json!({
            "sessionId": "s",
            "agentName": "agent",
            "createdAt": "2025-01-01T00:00:00Z",
            "workingContext": "/w",
        });
        let log: EventLogFile = serde_json::from_value(json).unwrap();
        assert!(log.records.is_empty());
        assert!(log.latest().is_none());
    }
}
