//! The event log: record, read back, filter, summarize and export events.

use std::path::Path;
use std::sync::Arc;
use chronos_core::{content_key, ContentHash, EventLogFile, EventRecord, SessionId, StampFields};
use chronos_storage::{JsonStorage, Storage};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::export::{write_csv, ExportOutcome};
use crate::sequence::SequenceStore;
use crate::session::SessionStore;
use crate::stats::LogStats;

/// Result of [`EventLog::init`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitOutcome {
    /// Session the log belongs to
    pub session_id: SessionId,
}

/// Result of [`EventLog::record`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recorded {
    /// The appended record, or the original one on a duplicate
    pub record: EventRecord,
    /// Whether the content was already in the log
    pub duplicate: bool,
}

/// Optional, independently combinable filters for [`EventLog::query`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter {
    /// Case-insensitive substring of the state
    pub state: Option<String>,
    /// Exact action
    pub action: Option<String>,
    /// Keep only the most recent N
    pub limit: Option<usize>,
}

impl QueryFilter {
    /// Filter on state substring.
    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Filter on exact action.
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Keep the most recent `limit` records.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Apply to records in append order; the result keeps that order.
    pub fn apply(&self, records: Vec<EventRecord>) -> Vec<EventRecord> {
        let needle = self.state.as_ref().map(|s| s.to_lowercase());
        let mut matched: Vec<EventRecord> = records
            .into_iter()
            .filter(|r| {
                needle
                    .as_ref()
                    .map_or(true, |n| r.state.to_lowercase().contains(n.as_str()))
            })
            .filter(|r| self.action.as_ref().map_or(true, |a| &r.action == a))
            .collect();

        if let Some(limit) = self.limit {
            let skip = matched.len().saturating_sub(limit);
            matched.drain(..skip);
        }
        matched
    }
}

/// Append-only log of stamped events for one working context.
///
/// Owns its storage handle; the sequence and session stores share it.
pub struct EventLog<S: Storage> {
    storage: Arc<S>,
    config: TrackerConfig,
    sequence: SequenceStore<S>,
    sessions: SessionStore<S>,
    session_id: Option<SessionId>,
}

impl EventLog<JsonStorage> {
    /// Open the JSON-file log in `config.state_dir()`.
    pub fn open(config: TrackerConfig) -> Self {
        let storage = JsonStorage::new(config.state_dir());
        Self::new(storage, config)
    }
}

impl<S: Storage> EventLog<S> {
    /// Create a log over `storage`.
    pub fn new(storage: S, config: TrackerConfig) -> Self {
        Self::with_shared(Arc::new(storage), config)
    }

    /// Create a log over an already shared storage handle.
    pub fn with_shared(storage: Arc<S>, config: TrackerConfig) -> Self {
        Self {
            sequence: SequenceStore::new(storage.clone()),
            sessions: SessionStore::new(storage.clone(), config.agent_name.clone()),
            storage,
            config,
            session_id: None,
        }
    }

    /// Tracker configuration.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Session id, once initialized.
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// The sequence store sharing this log's storage.
    pub fn sequence(&self) -> &SequenceStore<S> {
        &self.sequence
    }

    /// Ensure the state directory, session and log document exist. Idempotent.
    pub async fn init(&mut self) -> Result<InitOutcome> {
        let session_id = self.ensure_session().await;
        self.storage.ensure().await?;

        if self.storage.load_log().await?.is_none() {
            let log = self.empty_log(session_id.clone());
            self.storage.save_log(&log).await?;
            info!(session = %session_id, dir = %self.config.state_dir().display(), "initialized event log");
        }
        Ok(InitOutcome { session_id })
    }

    /// Stamp and append an event.
    ///
    /// If the same content is already logged, the original record is returned
    /// with `duplicate = true`, nothing is written and no tick is consumed.
    pub async fn record(&mut self, state: &str, action: &str, description: &str) -> Result<Recorded> {
        let session_id = self.init().await?.session_id;
        let mut log = match self.storage.load_log().await? {
            Some(log) => log,
            None => self.empty_log(session_id.clone()),
        };

        let working_context = self.config.working_context();
        let hash = ContentHash::of(&content_key(
            &self.config.agent_name,
            state,
            &session_id,
            &working_context,
            action,
            description,
        ));
        if let Some(original) = log.find_by_hash(&hash) {
            debug!(hash = %hash, tick = original.sequence, "duplicate event");
            return Ok(Recorded {
                record: original.clone(),
                duplicate: true,
            });
        }

        let sequence = self.sequence.next().await;
        let record = EventRecord::from_fields(&StampFields {
            agent_name: &self.config.agent_name,
            state,
            sequence,
            session_id: &session_id,
            working_context: &working_context,
            action,
            description,
            timestamp: chrono::Utc::now(),
        });
        log.append(record.clone());
        self.storage.save_log(&log).await?;
        debug!(tick = sequence, state, action, "recorded event");

        Ok(Recorded {
            record,
            duplicate: false,
        })
    }

    /// Most recently appended record.
    pub async fn latest(&self) -> Result<Option<EventRecord>> {
        Ok(self
            .storage
            .load_log()
            .await?
            .and_then(|log| log.latest().cloned()))
    }

    /// All records in append order (empty if the log does not exist).
    pub async fn records(&self) -> Result<Vec<EventRecord>> {
        Ok(self
            .storage
            .load_log()
            .await?
            .map(|log| log.records)
            .unwrap_or_default())
    }

    /// Records matching `filter`, in append order.
    pub async fn query(&self, filter: &QueryFilter) -> Result<Vec<EventRecord>> {
        Ok(filter.apply(self.records().await?))
    }

    /// Summary statistics.
    pub async fn stats(&self) -> Result<LogStats> {
        let working_context = self.config.working_context();
        Ok(match self.storage.load_log().await? {
            Some(log) => LogStats::from_log(&log, working_context),
            None => LogStats::empty(working_context),
        })
    }

    /// Write all records to `path` as CSV.
    ///
    /// Fails with [`TrackerError::EmptyLog`] without touching `path` when
    /// there is nothing to export.
    pub async fn export_csv(&self, path: impl AsRef<Path>) -> Result<ExportOutcome> {
        let records = self.records().await?;
        if records.is_empty() {
            return Err(TrackerError::EmptyLog);
        }
        let outcome = write_csv(path.as_ref(), &records).await?;
        info!(file = %outcome.file.display(), count = outcome.count, "exported csv");
        Ok(outcome)
    }

    async fn ensure_session(&mut self) -> SessionId {
        if let Some(id) = &self.session_id {
            return id.clone();
        }
        let id = self.sessions.get_or_create().await;
        self.session_id = Some(id.clone());
        id
    }

    fn empty_log(&self, session_id: SessionId) -> EventLogFile {
        EventLogFile::new(
            session_id,
            self.config.agent_name.clone(),
            self.config.working_context(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::parse_csv;
    use crate::testing::FailingStorage;
    use chronos_core::format_stamp;
    use chronos_storage::MemoryStorage;
    use tempfile::TempDir;

    fn json_log(dir: &TempDir) -> EventLog<JsonStorage> {
        EventLog::open(TrackerConfig::new(dir.path()).with_agent("tester"))
    }

    #[tokio::test]
    async fn test_fresh_context_scenario() {
        let dir = TempDir::new().unwrap();
        let mut log = json_log(&dir);
        log.init().await.unwrap();
        log.record("Thinking", "tool-completion", "Read file: main.js")
            .await
            .unwrap();

        let latest = log.latest().await.unwrap().unwrap();
        assert_eq!(latest.state, "Thinking");
        assert_eq!(latest.sequence, 1);
        assert!(dir.path().join(".cognitive/states.json").exists());
        assert!(dir.path().join(".cognitive/session.json").exists());
        assert!(dir.path().join(".cognitive/tick.json").exists());
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut log = json_log(&dir);
        let first = log.init().await.unwrap();
        log.record("Thinking", "event", "x").await.unwrap();
        let second = log.init().await.unwrap();
        assert_eq!(first, second);

        let mut reopened = json_log(&dir);
        assert_eq!(reopened.init().await.unwrap(), first);
        assert_eq!(reopened.records().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_latest_stamp_matches_formatter() {
        let mut log = EventLog::new(MemoryStorage::new(), TrackerConfig::new("/work"));
        let recorded = log.record("Executing", "git-commit", "Add feature").await.unwrap();
        let latest = log.latest().await.unwrap().unwrap();

        assert_eq!(latest, recorded.record);
        assert_eq!(latest.stamp, format_stamp(&latest.fields()));
        assert_eq!(latest.working_context, "/work");
        assert_eq!(&latest.session_id, log.session_id().unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_returns_original() {
        let mut log = EventLog::new(MemoryStorage::new(), TrackerConfig::default());
        let first = log.record("Thinking", "tool-completion", "Read file: main.js").await.unwrap();
        let second = log.record("Thinking", "tool-completion", "Read file: main.js").await.unwrap();

        assert!(!first.duplicate);
        assert!(second.duplicate);
        assert_eq!(second.record, first.record);
        assert_eq!(log.records().await.unwrap().len(), 1);
        // No tick consumed by the duplicate.
        assert_eq!(log.sequence().peek().await, 1);
    }

    #[tokio::test]
    async fn test_multiline_description_gives_single_line_stamp() {
        let mut log = EventLog::new(MemoryStorage::new(), TrackerConfig::default());
        log.record("Thinking", "tool-completion", "line one\nline two").await.unwrap();

        let latest = log.latest().await.unwrap().unwrap();
        assert_eq!(latest.description, "line one\nline two");
        assert_eq!(latest.stamp.lines().count(), 1);
        assert_eq!(latest.stamp, format_stamp(&latest.fields()));
    }

    #[tokio::test]
    async fn test_sequences_increase_without_gaps() {
        let mut log = EventLog::new(MemoryStorage::new(), TrackerConfig::default());
        let mut ticks = Vec::new();
        for i in 0..5 {
            let recorded = log.record("Thinking", "event", &format!("step {}", i)).await.unwrap();
            ticks.push(recorded.record.sequence);
        }
        assert_eq!(ticks, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_latest_on_missing_log_is_none() {
        let dir = TempDir::new().unwrap();
        let log = json_log(&dir);
        assert!(log.latest().await.unwrap().is_none());
        assert!(log.query(&QueryFilter::default()).await.unwrap().is_empty());
        assert_eq!(log.stats().await.unwrap().total_count, 0);
    }

    #[tokio::test]
    async fn test_query_filters_combine() {
        let mut log = EventLog::new(MemoryStorage::new(), TrackerConfig::default());
        log.record("Thinking", "tool-completion", "a").await.unwrap();
        log.record("Deep thinking", "git-commit", "b").await.unwrap();
        log.record("Executing", "tool-completion", "c").await.unwrap();
        log.record("thinking again", "tool-completion", "d").await.unwrap();

        let all = log.query(&QueryFilter::default()).await.unwrap();
        assert_eq!(all.len(), 4);

        let thinking = log.query(&QueryFilter::default().state("THINK")).await.unwrap();
        let descriptions: Vec<_> = thinking.iter().map(|r| r.description.as_str()).collect();
        assert_eq!(descriptions, vec!["a", "b", "d"]);

        let both = log
            .query(&QueryFilter::default().state("think").action("tool-completion"))
            .await
            .unwrap();
        assert_eq!(both.len(), 2);

        let action_only = log.query(&QueryFilter::default().action("tool")).await.unwrap();
        assert!(action_only.is_empty());
    }

    #[tokio::test]
    async fn test_query_limit_keeps_most_recent_in_order() {
        let mut log = EventLog::new(MemoryStorage::new(), TrackerConfig::default());
        for i in 1..=5 {
            log.record("S", "event", &i.to_string()).await.unwrap();
        }
        let last_two = log.query(&QueryFilter::default().limit(2)).await.unwrap();
        let seqs: Vec<_> = last_two.iter().map(|r| r.sequence).collect();
        assert_eq!(seqs, vec![4, 5]);

        assert_eq!(log.query(&QueryFilter::default().limit(50)).await.unwrap().len(), 5);
        assert!(log.query(&QueryFilter::default().limit(0)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stats_after_two_records() {
        let mut log = EventLog::new(MemoryStorage::new(), TrackerConfig::default());
        log.record("Thinking", "tool-completion", "one").await.unwrap();
        log.record("Thinking", "tool-completion", "two").await.unwrap();

        let stats = log.stats().await.unwrap();
        assert_eq!(stats.total_count, 2);
        assert_eq!(stats.unique_state_count, 1);
        assert_eq!(stats.session_id.as_ref(), log.session_id());
        assert!(stats.time_range.is_some());
    }

    #[tokio::test]
    async fn test_export_csv_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut log = json_log(&dir);
        log.record("Thinking", "tool-completion", r#"say "hi", then leave"#).await.unwrap();
        log.record("Done", "event", "plain").await.unwrap();

        let out = dir.path().join("export.csv");
        let outcome = log.export_csv(&out).await.unwrap();
        assert_eq!(outcome.count, 2);

        let rows = parse_csv(&std::fs::read_to_string(&out).unwrap());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][4], r#"say "hi", then leave"#);
        assert_eq!(rows[2][0], "2");
    }

    #[tokio::test]
    async fn test_export_empty_log_fails_without_file() {
        let dir = TempDir::new().unwrap();
        let mut log = json_log(&dir);
        log.init().await.unwrap();

        let out = dir.path().join("export.csv");
        assert!(matches!(log.export_csv(&out).await, Err(TrackerError::EmptyLog)));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_storage_failure_is_reported() {
        let mut log = EventLog::new(FailingStorage, TrackerConfig::default());
        assert!(matches!(log.init().await, Err(TrackerError::Storage(_))));
        assert!(log.record("Thinking", "event", "x").await.is_err());
        assert!(log.latest().await.is_err());
    }
}
