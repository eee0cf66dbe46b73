//! Client agents use to push their logs to an aggregator.

use chronos_core::{EventRecord, MergeOutcome, SessionId};
use tracing::debug;

use crate::config::DEFAULT_MAX_BODY_BYTES;
use crate::error::SyncError;
use crate::http::HealthResponse;
use crate::service::Submission;

/// Default aggregator URL.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

/// Default request body budget: half the server's default limit.
pub const DEFAULT_MAX_BATCH_BYTES: usize = DEFAULT_MAX_BODY_BYTES / 2;

/// HTTP client for one aggregator.
#[derive(Debug, Clone)]
pub struct SyncClient {
    http: reqwest::Client,
    base_url: String,
    max_batch_bytes: usize,
}

impl SyncClient {
    /// Client for the aggregator at `base_url` (e.g. `http://localhost:3000`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            max_batch_bytes: DEFAULT_MAX_BATCH_BYTES,
        }
    }

    /// Cap the size of each `POST /records` body.
    pub fn with_max_batch_bytes(mut self, max_batch_bytes: usize) -> Self {
        self.max_batch_bytes = max_batch_bytes;
        self
    }

    /// Aggregator base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query `GET /health`.
    pub async fn health(&self) -> Result<HealthResponse, SyncError> {
        let response = self.http.get(format!("{}/health", self.base_url)).send().await?;
        decode(response).await
    }

    /// Submit records for a session via `POST /records`.
    ///
    /// Records are sent in as many requests as needed to keep each body
    /// within the batch budget; the returned counts cover all of them. A
    /// failed batch stops the push, and re-pushing is safe since the
    /// aggregator skips records it already has.
    pub async fn push(
        &self,
        session_id: &SessionId,
        agent_name: &str,
        records: Vec<EventRecord>,
    ) -> Result<MergeOutcome, SyncError> {
        let mut total = MergeOutcome {
            received: 0,
            added: 0,
            duplicates: 0,
        };
        let batches = batch_records(session_id, agent_name, records, self.max_batch_bytes)?;
        let count = batches.len();
        for (i, records) in batches.into_iter().enumerate() {
            let submission = Submission {
                session_id: session_id.clone(),
                agent_name: agent_name.to_string(),
                records,
            };
            debug!(url = %self.base_url, batch = i + 1, of = count, records = submission.records.len(), "pushing records");
            let response = self
                .http
                .post(format!("{}/records", self.base_url))
                .json(&submission)
                .send()
                .await?;
            let outcome: MergeOutcome = decode(response).await?;
            total.received += outcome.received;
            total.added += outcome.added;
            total.duplicates += outcome.duplicates;
        }
        Ok(total)
    }
}

/// Split records into batches whose serialized submission stays within
/// `max_bytes`. Always yields at least one batch, so an empty log still
/// registers the agent. A record too large on its own travels alone.
fn batch_records(
    session_id: &SessionId,
    agent_name: &str,
    records: Vec<EventRecord>,
    max_bytes: usize,
) -> Result<Vec<Vec<EventRecord>>, SyncError> {
    let envelope = serde_json::to_vec(&Submission {
        session_id: session_id.clone(),
        agent_name: agent_name.to_string(),
        records: Vec::new(),
    })?
    .len();

    let mut batches = Vec::new();
    let mut current = Vec::new();
    let mut size = envelope;
    for record in records {
        let len = serde_json::to_vec(&record)?.len();
        // +1 for the separating comma
        if !current.is_empty() && size + len + 1 > max_bytes {
            batches.push(std::mem::take(&mut current));
            size = envelope;
        }
        size += if current.is_empty() { len } else { len + 1 };
        current.push(record);
    }
    if !current.is_empty() || batches.is_empty() {
        batches.push(current);
    }
    Ok(batches)
}

async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, SyncError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or(text);
    Err(SyncError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::router;
    use crate::service::{tests::sample_records, Aggregator};
    use chronos_storage::JsonAggregateStorage;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn spawn_server(dir: &TempDir, max_body_bytes: usize) -> String {
        let storage = JsonAggregateStorage::new(dir.path()).await.unwrap();
        let app = router(Arc::new(Aggregator::new(storage)), max_body_bytes);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service()).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_base_url_trailing_slash() {
        assert_eq!(SyncClient::new("http://host:3000/").base_url(), "http://host:3000");
    }

    #[tokio::test]
    async fn test_push_end_to_end() {
        let dir = TempDir::new().unwrap();
        let client = SyncClient::new(spawn_server(&dir, 1024 * 1024).await);

        assert_eq!(client.health().await.unwrap().status, "ok");

        let session = SessionId::from("s1");
        let records = sample_records(&session, &["a", "b"]);
        let first = client.push(&session, "agent", records.clone()).await.unwrap();
        assert_eq!(first.added, 2);
        let second = client.push(&session, "agent", records).await.unwrap();
        assert_eq!(second.duplicates, 2);

        // Persisted to the data directory.
        let raw = std::fs::read_to_string(dir.path().join("aggregated-states.json")).unwrap();
        assert!(raw.contains("\"s1\""));
    }

    fn many_records(session: &SessionId, count: usize) -> Vec<EventRecord> {
        let descriptions: Vec<String> = (0..count).map(|i| format!("step {}", i)).collect();
        let refs: Vec<&str> = descriptions.iter().map(String::as_str).collect();
        sample_records(session, &refs)
    }

    #[test]
    fn test_batches_respect_budget_and_order() {
        let session = SessionId::from("s1");
        let records = many_records(&session, 50);
        let batches = batch_records(&session, "agent", records.clone(), 4 * 1024).unwrap();

        assert!(batches.len() > 1);
        for batch in &batches {
            let body = serde_json::to_vec(&Submission {
                session_id: session.clone(),
                agent_name: "agent".to_string(),
                records: batch.clone(),
            })
            .unwrap();
            assert!(body.len() <= 4 * 1024);
        }
        let flattened: Vec<EventRecord> = batches.into_iter().flatten().collect();
        assert_eq!(flattened, records);
    }

    #[test]
    fn test_empty_push_is_one_batch() {
        let batches = batch_records(&SessionId::from("s1"), "agent", Vec::new(), 1024).unwrap();
        assert_eq!(batches.len(), 1);
        assert!(batches[0].is_empty());
    }

    #[tokio::test]
    async fn test_push_larger_than_server_limit() {
        let dir = TempDir::new().unwrap();
        let limit = 64 * 1024;
        let client = SyncClient::new(spawn_server(&dir, limit).await).with_max_batch_bytes(limit);

        let session = SessionId::from("s1");
        let records = many_records(&session, 400);
        assert!(serde_json::to_vec(&records).unwrap().len() > limit);

        let first = client.push(&session, "agent", records.clone()).await.unwrap();
        assert_eq!(first, MergeOutcome { received: 400, added: 400, duplicates: 0 });
        let second = client.push(&session, "agent", records).await.unwrap();
        assert_eq!(second, MergeOutcome { received: 400, added: 0, duplicates: 400 });
    }

    #[tokio::test]
    async fn test_rejection_surfaces_server_message() {
        let dir = TempDir::new().unwrap();
        let client = SyncClient::new(spawn_server(&dir, 1024 * 1024).await);

        let err = client
            .push(&SessionId::from(""), "agent", Vec::new())
            .await
            .unwrap_err();
        match err {
            SyncError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("sessionId"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
