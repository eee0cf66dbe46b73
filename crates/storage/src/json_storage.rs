//! JSON file storage implementation.
//!
//! Each document is one pretty-printed JSON file. Writes go to a temporary
//! sibling file which is then renamed over the target, so a crash never
//! leaves a half-written document behind.

use std::path::{Path, PathBuf};
use async_trait::async_trait;
use chronos_core::{AggregateStore, EventLogFile, SequenceCounter, SessionMarker};
use super::{AggregateStorage, Storage, Result};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Session marker file name.
pub const SESSION_FILE: &str = "session.json";
/// Sequence counter file name.
pub const COUNTER_FILE: &str = "tick.json";
/// Event log file name.
pub const LOG_FILE: &str = "states.json";
/// Aggregate store file name.
pub const AGGREGATE_FILE: &str = "aggregated-states.json";

/// File-based JSON storage for one working context.
///
/// Stores the session marker, the tick counter and the event log under a
/// state directory (conventionally `<working dir>/.cognitive`).
#[derive(Debug, Clone)]
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    /// Create storage rooted at `root`. Nothing is touched on disk until
    /// [`Storage::ensure`] or a save.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// State directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_path(&self) -> PathBuf {
        self.root.join(SESSION_FILE)
    }
    fn counter_path(&self) -> PathBuf {
        self.root.join(COUNTER_FILE)
    }
    fn log_path(&self) -> PathBuf {
        self.root.join(LOG_FILE)
    }
}

#[async_trait]
impl Storage for JsonStorage {
    async fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    async fn load_session(&self) -> Result<Option<SessionMarker>> {
        read_json(&self.session_path()).await
    }

    async fn save_session(&self, marker: &SessionMarker) -> Result<()> {
        write_json_atomic(&self.session_path(), marker).await
    }

    async fn load_counter(&self) -> Result<Option<SequenceCounter>> {
        read_json(&self.counter_path()).await
    }

    async fn save_counter(&self, counter: &SequenceCounter) -> Result<()> {
        write_json_atomic(&self.counter_path(), counter).await
    }

    async fn load_log(&self) -> Result<Option<EventLogFile>> {
        read_json(&self.log_path()).await
    }

    async fn save_log(&self, log: &EventLogFile) -> Result<()> {
        write_json_atomic(&self.log_path(), log).await
    }
}

/// File-based JSON storage for the aggregator.
#[derive(Debug, Clone)]
pub struct JsonAggregateStorage {
    path: PathBuf,
}

impl JsonAggregateStorage {
    /// Create storage in `data_dir`, initializing an empty store file if none exists.
    pub async fn new(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir).await?;

        let storage = Self {
            path: data_dir.join(AGGREGATE_FILE),
        };
        match fs::metadata(&storage.path).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                storage.save(&AggregateStore::new()).await?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(storage)
    }

    /// Path of the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AggregateStorage for JsonAggregateStorage {
    async fn load(&self) -> Result<AggregateStore> {
        Ok(read_json(&self.path).await?.unwrap_or_default())
    }

    async fn save(&self, store: &AggregateStore) -> Result<()> {
        write_json_atomic(&self.path, store).await
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write `value` as pretty JSON via temp file + rename.
pub(crate) async fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    write_atomic(path, json.as_bytes()).await
}

/// Write bytes to `path` via a temporary sibling and an atomic rename.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let tmp_path = temp_path(path);
    let mut file = fs::File::create(&tmp_path).await?;
    if let Err(e) = write_and_sync(&mut file, bytes).await {
        drop(file);
        let _ = fs::remove_file(&tmp_path).await;
        return Err(e.into());
    }
    drop(file);

    if let Err(e) = fs::rename(&tmp_path, path).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(e.into());
    }
    debug!(path = %path.display(), bytes = bytes.len(), "wrote file");
    Ok(())
}

async fn write_and_sync(file: &mut fs::File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.sync_all().await
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp-{}", name, std::process::id()))
}
