//! In-process store

use super::DailyStore;
use crate::error::StoreError;
use crate::types::DailyData;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// Store backed by a map; contents live as long as the value
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, DailyData>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `value` under `key`
    pub fn with_entry(key: &str, value: DailyData) -> Self {
        Self {
            entries: Mutex::new(HashMap::from([(key.to_string(), value)])),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make subsequent saves and removes fail with an I/O error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current value for `key`, bypassing the async interface
    pub async fn get(&self, key: &str) -> Option<DailyData> {
        self.entries.lock().await.get(key).cloned()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "store is read-only",
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DailyStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<DailyData>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: &DailyData) -> Result<(), StoreError> {
        self.check_writable()?;
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DAILY_DATA_KEY;

    #[tokio::test]
    async fn test_save_load_remove() {
        let store = MemoryStore::new();
        assert!(store.load(DAILY_DATA_KEY).await.unwrap().is_none());

        let mut data = DailyData::default();
        data.behavior_tally.insert("fixFlow".to_string(), 2);
        store.save(DAILY_DATA_KEY, &data).await.unwrap();
        assert_eq!(store.load(DAILY_DATA_KEY).await.unwrap(), Some(data));

        store.remove(DAILY_DATA_KEY).await.unwrap();
        store.remove(DAILY_DATA_KEY).await.unwrap();
        assert!(store.load(DAILY_DATA_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failing_writes() {
        let store = MemoryStore::with_entry(DAILY_DATA_KEY, DailyData::default());
        store.set_fail_writes(true);

        assert!(store.save(DAILY_DATA_KEY, &DailyData::default()).await.is_err());
        assert!(store.remove(DAILY_DATA_KEY).await.is_err());
        assert!(store.load(DAILY_DATA_KEY).await.unwrap().is_some());
    }
}
