//! HTTP surface of the aggregator.

use std::collections::HashMap;
use std::sync::Arc;
use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Query, State},
    http::{header::CONTENT_TYPE, StatusCode},
    middleware::map_response,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chronos_core::{AgentSummary, EventRecord, MergeOutcome, SessionId};
use chronos_storage::AggregateStorage;
use serde::{Deserialize, Serialize};
use tokio::signal;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::error::{error_response, AppError};
use crate::service::{AggregateStats, Aggregator, Submission};

/// `GET /health` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `ok`
    pub status: String,
    /// Server version
    pub version: String,
    /// Seconds since start
    pub uptime_seconds: f64,
}

/// `GET /records` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordsResponse {
    /// Records returned
    pub count: usize,
    /// The records
    pub records: Vec<EventRecord>,
}

/// `GET /agents` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentsResponse {
    /// Agents returned
    pub count: usize,
    /// The agents
    pub agents: Vec<AgentSummary>,
}

type SharedAggregator<S> = Arc<Aggregator<S>>;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>CHRONOS Sync Server</title></head>
<body style="font-family: monospace; max-width: 800px; margin: 50px auto;">
  <h1>CHRONOS Sync Server</h1>
  <p>Cognitive telemetry aggregation</p>
  <ul>
    <li><b>GET</b> <code>/health</code> - liveness and uptime</li>
    <li><b>POST</b> <code>/records</code> - submit <code>{"sessionId", "agentName", "records": [...]}</code></li>
    <li><b>GET</b> <code>/records?sessionId=&amp;limit=</code> - stored records</li>
    <li><b>GET</b> <code>/stats</code> - totals and per-agent summary</li>
    <li><b>GET</b> <code>/agents</code> - known agents</li>
  </ul>
</body>
</html>
"#;

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health<S: AggregateStorage + 'static>(
    State(aggregator): State<SharedAggregator<S>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: aggregator.uptime().as_secs_f64(),
    })
}

async fn submit_records<S: AggregateStorage + 'static>(
    State(aggregator): State<SharedAggregator<S>>,
    body: Bytes,
) -> Result<Json<MergeOutcome>, AppError> {
    let submission = Submission::parse(&body)?;
    Ok(Json(aggregator.submit(submission).await?))
}

async fn get_records<S: AggregateStorage + 'static>(
    State(aggregator): State<SharedAggregator<S>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<RecordsResponse>, AppError> {
    let session_id = params
        .get("sessionId")
        .filter(|s| !s.is_empty())
        .map(|s| SessionId::from(s.as_str()));
    let limit = match params.get("limit").filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            raw.parse::<usize>()
                .map_err(|_| AppError::BadRequest(format!("Invalid limit: {}", raw)))?,
        ),
        None => None,
    };

    let records = aggregator.records(session_id.as_ref(), limit).await?;
    Ok(Json(RecordsResponse {
        count: records.len(),
        records,
    }))
}

async fn stats<S: AggregateStorage + 'static>(
    State(aggregator): State<SharedAggregator<S>>,
) -> Result<Json<AggregateStats>, AppError> {
    Ok(Json(aggregator.stats().await?))
}

async fn agents<S: AggregateStorage + 'static>(
    State(aggregator): State<SharedAggregator<S>>,
) -> Result<Json<AgentsResponse>, AppError> {
    let agents = aggregator.agents().await?;
    Ok(Json(AgentsResponse {
        count: agents.len(),
        agents,
    }))
}

async fn not_found() -> AppError {
    AppError::NotFound
}

/// Give every non-success response without a JSON body an `{"error"}` body
/// (method mismatches, oversized bodies, extractor rejections).
async fn json_error_bodies(response: Response) -> Response {
    let status = response.status();
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if status.is_success() || is_json {
        return response;
    }

    let text = match axum::body::to_bytes(response.into_body(), 64 * 1024).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).trim().to_string(),
        Err(_) => String::new(),
    };
    let message = if text.is_empty() {
        status.canonical_reason().unwrap_or("Request failed").to_string()
    } else {
        text
    };
    error_response(status, message)
}

fn panic_response(err: Box<dyn std::any::Any + Send + 'static>) -> Response<Body> {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    AppError::Internal(message).into_response()
}

/// Build the aggregator's router.
pub fn router<S: AggregateStorage + 'static>(aggregator: Arc<Aggregator<S>>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health::<S>))
        .route("/records", get(get_records::<S>).post(submit_records::<S>))
        .route("/stats", get(stats::<S>))
        .route("/agents", get(agents::<S>))
        .fallback(not_found)
        .layer(map_response(json_error_bodies))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(aggregator)
}

/// Serve the aggregator until Ctrl+C.
pub async fn serve<S: AggregateStorage + 'static>(config: &ServerConfig, storage: S) -> std::io::Result<()> {
    let aggregator = Arc::new(Aggregator::new(storage));
    let app = router(aggregator, config.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    tracing::info!(
        target: "chronos-sync",
        addr = %listener.local_addr()?,
        data_dir = %config.data_dir.display(),
        "listening"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!(target: "chronos-sync", error = %e, "Failed to install CTRL+C handler");
            }
            tracing::info!(target: "chronos-sync", "shutting down gracefully");
        })
        .await
}
