//! Aggregation logic, independent of the HTTP layer.

use std::time::{Duration, Instant};
use chronos_core::{AgentSummary, EventRecord, MergeOutcome, SessionId, Time};
use chronos_storage::{AggregateStorage, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use crate::error::ValidationError;

/// A batch of records pushed by one agent session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    /// Submitting session
    pub session_id: SessionId,
    /// Submitting agent
    pub agent_name: String,
    /// Records to merge
    pub records: Vec<EventRecord>,
}

impl Submission {
    /// Parse and validate a request body.
    ///
    /// `sessionId` and `agentName` must be non-empty strings and `records` an
    /// array of event records.
    pub fn parse(body: &[u8]) -> std::result::Result<Self, ValidationError> {
        const REQUIRED: &str = "Invalid payload. Required: sessionId, agentName, records (array)";

        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| ValidationError(format!("Invalid JSON: {}", e)))?;

        let non_empty = |key: &str| {
            value
                .get(key)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let (Some(session_id), Some(agent_name)) = (non_empty("sessionId"), non_empty("agentName")) else {
            return Err(ValidationError(REQUIRED.to_string()));
        };
        let Some(items) = value.get("records").and_then(|v| v.as_array()) else {
            return Err(ValidationError(REQUIRED.to_string()));
        };

        let records = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                EventRecord::deserialize(item)
                    .map_err(|e| ValidationError(format!("Invalid record at index {}: {}", i, e)))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            session_id: SessionId::from(session_id),
            agent_name,
            records,
        })
    }
}

/// Store-wide statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    /// Records across all agents
    pub total_record_count: usize,
    /// Known agent sessions
    pub agent_count: usize,
    /// When the store was created
    pub created_at: Time,
    /// One entry per agent session
    pub per_agent_summary: Vec<AgentSummary>,
}

/// Merges submissions into an [`AggregateStorage`].
///
/// Each operation is a whole-document read (and for submissions, write).
/// Submissions are serialized within this process; separate processes
/// sharing a store are last-writer-wins.
pub struct Aggregator<S: AggregateStorage> {
    storage: S,
    write_lock: Mutex<()>,
    started: Instant,
}

impl<S: AggregateStorage> Aggregator<S> {
    /// Create an aggregator over `storage`.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
            started: Instant::now(),
        }
    }

    /// Time since the aggregator was created.
    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Merge a validated submission.
    pub async fn submit(&self, submission: Submission) -> Result<MergeOutcome> {
        let _guard = self.write_lock.lock().await;
        let mut store = self.storage.load().await?;
        let outcome = store.merge(
            &submission.session_id,
            &submission.agent_name,
            submission.records,
            chrono::Utc::now(),
        );
        // Saved even when everything was a duplicate: lastSeen moves.
        self.storage.save(&store).await?;
        info!(
            session = %submission.session_id,
            agent = %submission.agent_name,
            received = outcome.received,
            added = outcome.added,
            duplicates = outcome.duplicates,
            "merged submission"
        );
        Ok(outcome)
    }

    /// Records for one session or all sessions, most recent `limit` kept.
    pub async fn records(&self, session_id: Option<&SessionId>, limit: Option<usize>) -> Result<Vec<EventRecord>> {
        Ok(self.storage.load().await?.records(session_id, limit))
    }

    /// Store-wide statistics.
    pub async fn stats(&self) -> Result<AggregateStats> {
        let store = self.storage.load().await?;
        Ok(AggregateStats {
            total_record_count: store.total_record_count,
            agent_count: store.agents.len(),
            created_at: store.created_at,
            per_agent_summary: store.summaries(),
        })
    }

    /// Per-agent summaries without record bodies.
    pub async fn agents(&self) -> Result<Vec<AgentSummary>> {
        Ok(self.storage.load().await?.summaries())
    }
}
