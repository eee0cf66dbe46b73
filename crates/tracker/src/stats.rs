//! Aggregate statistics over an event log.

use std::collections::{BTreeMap, HashMap};
use chronos_core::{EventLogFile, EventRecord, SessionId, Time};
use serde::{Deserialize, Serialize};

/// How many states `top_states` keeps.
pub const TOP_STATES: usize = 10;

/// Frequency of one state label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCount {
    /// State label
    pub state: String,
    /// Occurrences
    pub count: usize,
}

/// First and last record timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Oldest record
    pub first: Time,
    /// Newest record
    pub last: Time,
}

/// Summary of a log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStats {
    /// Records in the log
    pub total_count: usize,
    /// Distinct state labels
    pub unique_state_count: usize,
    /// Records per action
    pub per_action_count: BTreeMap<String, usize>,
    /// Most frequent states, ties in first-seen order
    pub top_states: Vec<StateCount>,
    /// Absent when the log is empty
    pub time_range: Option<TimeRange>,
    /// Owning session, if the log exists
    pub session_id: Option<SessionId>,
    /// Working context of the tracker
    pub working_context: String,
    /// When the log was created, if it exists
    pub created_at: Option<Time>,
}

impl LogStats {
    /// Stats for a log that has not been created.
    pub fn empty(working_context: impl Into<String>) -> Self {
        Self::from_records(&[], working_context)
    }

    /// Stats for an existing log.
    pub fn from_log(log: &EventLogFile, working_context: impl Into<String>) -> Self {
        let mut stats = Self::from_records(&log.records, working_context);
        stats.session_id = Some(log.session_id.clone());
        stats.created_at = Some(log.created_at);
        stats
    }

    /// Stats over records in append order.
    pub fn from_records(records: &[EventRecord], working_context: impl Into<String>) -> Self {
        let mut per_action_count = BTreeMap::new();
        // (state, count) in first-seen order
        let mut states: Vec<StateCount> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for record in records {
            *per_action_count.entry(record.action.clone()).or_insert(0) += 1;
            match index.get(record.state.as_str()) {
                Some(&i) => states[i].count += 1,
                None => {
                    index.insert(&record.state, states.len());
                    states.push(StateCount {
                        state: record.state.clone(),
                        count: 1,
                    });
                }
            }
        }

        let unique_state_count = states.len();
        // Stable sort keeps first-seen order among equal counts.
        states.sort_by(|a, b| b.count.cmp(&a.count));
        states.truncate(TOP_STATES);

        let time_range = match (records.first(), records.last()) {
            (Some(first), Some(last)) => Some(TimeRange {
                first: first.timestamp,
                last: last.timestamp,
            }),
            _ => None,
        };

        Self {
            total_count: records.len(),
            unique_state_count,
            per_action_count,
            top_states: states,
            time_range,
            session_id: None,
            working_context: working_context.into(),
            created_at: None,
        }
    }
}
