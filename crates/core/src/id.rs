//! Session identifiers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier scoping events to one working context.
///
/// Normally a random UUID v4 in canonical grouped form. Fallback identifiers
/// (`temp-<millis>`) are produced when the session marker cannot be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new random SessionId
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Time-derived identifier, unique within a run but not stable across restarts.
    pub fn fallback() -> Self {
        Self(format!("temp-{}", chrono::Utc::now().timestamp_millis()))
    }

    /// Whether this id came from [`SessionId::fallback`].
    pub fn is_fallback(&self) -> bool {
        self.0.starts_with("temp-")
    }

    /// Borrow as str.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for SessionId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
