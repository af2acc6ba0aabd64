//! Persistence adapters
//!
//! A store is an asynchronous key-value boundary holding one [`DailyData`]
//! value per key. The tracker only ever uses [`DAILY_DATA_KEY`].

mod file;
mod memory;

pub use file::{default_store_dir, JsonFileStore, STORE_NAME};
pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::types::DailyData;
use async_trait::async_trait;

/// Key under which the daily aggregate is stored
pub const DAILY_DATA_KEY: &str = "dailyData";

#[async_trait]
pub trait DailyStore: Send + Sync {
    /// Load the value for `key`; `Ok(None)` when nothing has been stored
    async fn load(&self, key: &str) -> Result<Option<DailyData>, StoreError>;

    /// Replace the value for `key`
    async fn save(&self, key: &str, value: &DailyData) -> Result<(), StoreError>;

    /// Delete the value for `key`; deleting a missing key succeeds
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}
