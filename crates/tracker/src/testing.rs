//! Storage doubles for tests.

use async_trait::async_trait;
use chronos_core::{EventLogFile, SequenceCounter, SessionMarker};
use chronos_storage::{Result, Storage, StorageError};

/// Storage whose every operation fails.
pub struct FailingStorage;

fn broken<T>() -> Result<T> {
    Err(StorageError::Other("disk unavailable".to_string()))
}

#[async_trait]
impl Storage for FailingStorage {
    async fn ensure(&self) -> Result<()> {
        broken()
    }
    async fn load_session(&self) -> Result<Option<SessionMarker>> {
        broken()
    }
    async fn save_session(&self, _marker: &SessionMarker) -> Result<()> {
        broken()
    }
    async fn load_counter(&self) -> Result<Option<SequenceCounter>> {
        broken()
    }
    async fn save_counter(&self, _counter: &SequenceCounter) -> Result<()> {
        broken()
    }
    async fn load_log(&self) -> Result<Option<EventLogFile>> {
        broken()
    }
    async fn save_log(&self, _log: &EventLogFile) -> Result<()> {
        broken()
    }
}
