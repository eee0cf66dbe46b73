//! CHRONOS aggregation service.
//!
//! Merges event logs submitted by many agents into one store keyed by
//! session, and exposes it over a small JSON HTTP API. Also provides the
//! client agents use to push their logs.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod service;
pub mod http;
pub mod client;

pub use config::ServerConfig;
pub use error::{AppError, SyncError, ValidationError};
pub use service::{AggregateStats, Aggregator, Submission};
pub use http::{router, serve, AgentsResponse, HealthResponse, RecordsResponse};
pub use client::SyncClient;
