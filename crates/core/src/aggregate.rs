//! Aggregate store - event logs merged from many agents, keyed by session.

use crate::id::SessionId;
use crate::record::{ContentHash, EventRecord};
use crate::Time;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Everything one agent session has submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentEntry {
    /// Session the records belong to
    pub session_id: SessionId,

    /// Agent name from the first submission
    pub agent_name: String,

    /// First submission
    pub first_seen: Time,

    /// Latest submission
    pub last_seen: Time,

    /// Records in arrival order
    #[serde(default)]
    pub records: Vec<EventRecord>,
}

impl AgentEntry {
    /// Summary without record bodies.
    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            session_id: self.session_id.clone(),
            agent_name: self.agent_name.clone(),
            record_count: self.records.len(),
            first_seen: self.first_seen,
            last_seen: self.last_seen,
        }
    }
}

/// Per-agent summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    /// Session
    pub session_id: SessionId,
    /// Agent
    pub agent_name: String,
    /// Stored records
    pub record_count: usize,
    /// First submission
    pub first_seen: Time,
    /// Latest submission
    pub last_seen: Time,
}

/// Outcome of one merge.
///
/// `received == added + duplicates` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutcome {
    /// Records in the batch
    #[serde(rename = "receivedCount")]
    pub received: usize,
    /// Records appended
    #[serde(rename = "addedCount")]
    pub added: usize,
    /// Records skipped because their hash was already stored
    #[serde(rename = "duplicateCount")]
    pub duplicates: usize,
}

/// The aggregator's persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStore {
    /// When the store was created
    pub created_at: Time,

    /// Records across all agents
    #[serde(default)]
    pub total_record_count: usize,

    /// Entries keyed by session
    #[serde(default)]
    pub agents: BTreeMap<SessionId, AgentEntry>,
}

impl Default for AggregateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregateStore {
    /// Empty store.
    pub fn new() -> Self {
        Self {
            created_at: chrono::Utc::now(),
            total_record_count: 0,
            agents: BTreeMap::new(),
        }
    }

    /// Merge a batch into the entry for `session_id`, creating it if absent.
    ///
    /// Records whose hash is already stored for the session, or repeated
    /// within the batch, are skipped.
    pub fn merge(
        &mut self,
        session_id: &SessionId,
        agent_name: &str,
        records: Vec<EventRecord>,
        now: Time,
    ) -> MergeOutcome {
        let received = records.len();
        let entry = self
            .agents
            .entry(session_id.clone())
            .or_insert_with(|| AgentEntry {
                session_id: session_id.clone(),
                agent_name: agent_name.to_string(),
                first_seen: now,
                last_seen: now,
                records: Vec::new(),
            });

        let mut seen: HashSet<ContentHash> = entry
            .records
            .iter()
            .map(|r| r.content_hash.clone())
            .collect();

        let mut added = 0;
        for record in records {
            if seen.insert(record.content_hash.clone()) {
                entry.records.push(record);
                added += 1;
            }
        }
        entry.last_seen = now;
        self.total_record_count += added;

        MergeOutcome {
            received,
            added,
            duplicates: received - added,
        }
    }

    /// Records for one session, or every session concatenated (ordered by
    /// session id), keeping only the most recent `limit`.
    pub fn records(&self, session_id: Option<&SessionId>, limit: Option<usize>) -> Vec<EventRecord> {
        let mut records: Vec<EventRecord> = match session_id {
            Some(id) => self
                .agents
                .get(id)
                .map(|e| e.records.clone())
                .unwrap_or_default(),
            None => self
                .agents
                .values()
                .flat_map(|e| e.records.iter().cloned())
                .collect(),
        };
        if let Some(limit) = limit {
            let skip = records.len().saturating_sub(limit);
            records.drain(..skip);
        }
        records
    }

    /// One summary per agent entry.
    pub fn summaries(&self) -> Vec<AgentSummary> {
        self.agents.values().map(AgentEntry::summary).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stamp::StampFields;

    fn batch(session: &SessionId, descriptions: &[&str]) -> Vec<EventRecord> {
        descriptions
            .iter()
            .enumerate()
            .map(|(i, d)| {
                EventRecord::from_fields(&StampFields {
                    agent_name: "agent",
                    state: "Thinking",
                    sequence: i as u64 + 1,
                    session_id: session,
                    working_context: "/w",
                    action: "event",
                    description: d,
                    timestamp: chrono::Utc::now(),
                })
            })
            .collect()
    }

    #[test]
    fn test_merge_creates_entry() {
        let mut store = AggregateStore::new();
        let session = SessionId::from("s1");
        let now = chrono::Utc::now();
        let outcome = store.merge(&session, "agent", batch(&session, &["a", "b"]), now);

        assert_eq!(outcome, MergeOutcome { received: 2, added: 2, duplicates: 0 });
        assert_eq!(store.total_record_count, 2);
        let entry = &store.agents[&session];
        assert_eq!(entry.first_seen, now);
        assert_eq!(entry.records.len(), 2);
    }

    #[test]
    fn test_resubmission_is_all_duplicates() {
        let mut store = AggregateStore::new();
        let session = SessionId::from("s1");
        let records = batch(&session, &["a", "b", "c"]);
        store.merge(&session, "agent", records.clone(), chrono::Utc::now());
        let later = chrono::Utc::now() + chrono::Duration::seconds(1);
        let outcome = store.merge(&session, "renamed", records, later);

        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.duplicates, outcome.received);
        assert_eq!(store.total_record_count, 3);
        let entry = &store.agents[&session];
        assert_eq!(entry.last_seen, later);
        assert_eq!(entry.agent_name, "agent");
    }

    #[test]
    fn test_repeats_within_batch_are_duplicates() {
        let mut store = AggregateStore::new();
        let session = SessionId::from("s1");
        let mut records = batch(&session, &["a"]);
        records.push(records[0].clone());
        let outcome = store.merge(&session, "agent", records, chrono::Utc::now());
        assert_eq!(outcome, MergeOutcome { received: 2, added: 1, duplicates: 1 });
    }

    #[test]
    fn test_sessions_are_deduplicated_independently() {
        let mut store = AggregateStore::new();
        let s1 = SessionId::from("s1");
        let s2 = SessionId::from("s2");
        let records = batch(&s1, &["a"]);
        store.merge(&s1, "one", records.clone(), chrono::Utc::now());
        let outcome = store.merge(&s2, "two", records, chrono::Utc::now());
        assert_eq!(outcome.added, 1);
        assert_eq!(store.summaries().len(), 2);
    }

    #[test]
    fn test_records_limit_applies_after_merge() {
        let mut store = AggregateStore::new();
        let s1 = SessionId::from("s1");
        let s2 = SessionId::from("s2");
        store.merge(&s1, "one", batch(&s1, &["a", "b"]), chrono::Utc::now());
        store.merge(&s2, "two", batch(&s2, &["c", "d"]), chrono::Utc::now());

        let all = store.records(None, None);
        assert_eq!(all.len(), 4);
        let last = store.records(None, Some(3));
        let descriptions: Vec<_> = last.iter().map(|r| r.description.as_str()).collect();
        assert_eq!(descriptions, vec!["b", "c", "d"]);

        assert_eq!(store.records(Some(&s2), Some(1))[0].description, "d");
        assert!(store.records(Some(&SessionId::from("nope")), None).is_empty());
        assert!(store.records(None, Some(0)).is_empty());
    }
}
