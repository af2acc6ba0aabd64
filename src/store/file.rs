//! JSON file store
//!
//! Each key maps to `<dir>/<key>.json`. Writes go to a sibling temp file that
//! is renamed over the target, so a crash mid-write leaves the old value.

use super::DailyStore;
use crate::error::StoreError;
use crate::types::DailyData;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Directory name used under the platform data directory
pub const STORE_NAME: &str = "tMobileCallTracker";

/// `<data dir>/tMobileCallTracker`, or a relative directory when the platform has none
pub fn default_store_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(STORE_NAME))
        .unwrap_or_else(|| PathBuf::from(STORE_NAME))
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the value for `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl DailyStore for JsonFileStore {
    async fn load(&self, key: &str) -> Result<Option<DailyData>, StoreError> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let data = serde_json::from_str(&content)?;
        debug!(path = %path.display(), "Loaded daily data");
        Ok(Some(data))
    }

    async fn save(&self, key: &str, value: &DailyData) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        let json = serde_json::to_vec_pretty(value)?;

        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &path).await?;
        debug!(path = %path.display(), calls = value.calls.len(), "Saved daily data");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
