//! Stable per-working-context session id.

use std::sync::Arc;
use chronos_core::{SessionId, SessionMarker};
use chronos_storage::{Storage, StorageError};
use tracing::{info, warn};

/// Hands out the session id owned by a working context.
pub struct SessionStore<S: Storage> {
    storage: Arc<S>,
    agent_name: String,
}

impl<S: Storage> SessionStore<S> {
    /// Create a session store; new markers are attributed to `agent_name`.
    pub fn new(storage: Arc<S>, agent_name: impl Into<String>) -> Self {
        Self {
            storage,
            agent_name: agent_name.into(),
        }
    }

    /// Return the existing session id, or create and persist a new one.
    ///
    /// Never fails: when the marker cannot be read or written a time-derived
    /// `temp-` id is returned, which is not stable across restarts.
    pub async fn get_or_create(&self) -> SessionId {
        match self.try_get_or_create().await {
            Ok(id) => id,
            Err(e) => {
                let fallback = SessionId::fallback();
                warn!(error = %e, session = %fallback, "session marker unavailable, using temporary session");
                fallback
            }
        }
    }

    async fn try_get_or_create(&self) -> Result<SessionId, StorageError> {
        if let Some(marker) = self.storage.load_session().await? {
            return Ok(marker.session_id);
        }

        let marker = SessionMarker::new(self.agent_name.clone());
        self.storage.save_session(&marker).await?;
        info!(session = %marker.session_id, agent = %marker.agent_name, "created session");
        Ok(marker.session_id)
    }
}
