//! Tracker configuration

use crate::catalog::BehaviorCatalog;
use crate::error::TrackerError;
use crate::store::{default_store_dir, DAILY_DATA_KEY};
use crate::timer::DEFAULT_CHECK_IN_AFTER_SECS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings for a tracker instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Directory of the JSON file store
    pub store_dir: PathBuf,
    /// Key the daily aggregate is stored under
    pub store_key: String,
    /// Seconds into a call at which the check-in advisory fires
    pub check_in_after_secs: u64,
    /// JSON file with behavior definitions; the built-in catalog when unset
    pub catalog_path: Option<PathBuf>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            store_key: DAILY_DATA_KEY.to_string(),
            check_in_after_secs: DEFAULT_CHECK_IN_AFTER_SECS,
            catalog_path: None,
        }
    }
}

impl TrackerConfig {
    pub fn with_store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.store_dir = dir.into();
        self
    }

    pub fn with_check_in_after(mut self, seconds: u64) -> Self {
        self.check_in_after_secs = seconds;
        self
    }

    pub fn with_catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = Some(path.into());
        self
    }

    /// Load the configured catalog, or the built-in one
    pub fn load_catalog(&self) -> Result<BehaviorCatalog, TrackerError> {
        match &self.catalog_path {
            Some(path) => BehaviorCatalog::from_file(path),
            None => Ok(BehaviorCatalog::default()),
        }
    }
}
