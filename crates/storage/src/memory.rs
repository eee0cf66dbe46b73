//! In-memory storage, used by tests and embedders that do not want files.

use async_trait::async_trait;
use chronos_core::{AggregateStore, EventLogFile, SequenceCounter, SessionMarker};
use tokio::sync::Mutex;
use super::{AggregateStorage, Storage, Result};

#[derive(Debug, Default)]
struct Documents {
    session: Option<SessionMarker>,
    counter: Option<SequenceCounter>,
    log: Option<EventLogFile>,
    aggregate: Option<AggregateStore>,
}

/// Storage backed by process memory. Implements both storage traits.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    docs: Mutex<Documents>,
}

impl MemoryStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn ensure(&self) -> Result<()> {
        Ok(())
    }

    async fn load_session(&self) -> Result<Option<SessionMarker>> {
        Ok(self.docs.lock().await.session.clone())
    }

    async fn save_session(&self, marker: &SessionMarker) -> Result<()> {
        self.docs.lock().await.session = Some(marker.clone());
        Ok(())
    }

    async fn load_counter(&self) -> Result<Option<SequenceCounter>> {
        Ok(self.docs.lock().await.counter.clone())
    }

    async fn save_counter(&self, counter: &SequenceCounter) -> Result<()> {
        self.docs.lock().await.counter = Some(counter.clone());
        Ok(())
    }

    async fn load_log(&self) -> Result<Option<EventLogFile>> {
        Ok(self.docs.lock().await.log.clone())
    }

    async fn save_log(&self, log: &EventLogFile) -> Result<()> {
        self.docs.lock().await.log = Some(log.clone());
        Ok(())
    }
}

#[async_trait]
impl AggregateStorage for MemoryStorage {
    async fn load(&self) -> Result<AggregateStore> {
        Ok(self.docs.lock().await.aggregate.clone().unwrap_or_default())
    }

    async fn save(&self, store: &AggregateStore) -> Result<()> {
        self.docs.lock().await.aggregate = Some(store.clone());
        Ok(())
    }
}
