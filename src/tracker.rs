//! Tracker orchestration
//!
//! This module provides the public API for Call Tracker. A [`Tracker`] loads the
//! stored aggregate once, routes every operation through the
//! [`SessionManager`], and queues a save after each mutation.

use crate::catalog::BehaviorCatalog;
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::persistence::{PersistenceWorker, StoreOpKind};
use crate::picker::EncouragementPicker;
use crate::report;
use crate::session::SessionManager;
use crate::store::{DailyStore, JsonFileStore};
use crate::timer::CheckInAdvisory;
use crate::types::{CallRecord, CallSession, DailyData, Progress, Summary, ToggleResult};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Notifications for the UI layer that are not tied to a direct call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerEvent {
    /// The active call ran past the check-in threshold
    CheckIn {
        call_id: String,
        advisory: CheckInAdvisory,
    },
    /// Stored data could not be read at startup; defaults are in use
    LoadFailed { message: String },
    /// A queued store operation failed; memory state is unaffected
    PersistenceFailed { op: StoreOpKind, message: String },
}

/// Session tracker with asynchronous persistence.
///
/// Must be created and used inside a tokio runtime.
pub struct Tracker {
    manager: SessionManager,
    worker: PersistenceWorker,
    events: Option<mpsc::UnboundedSender<TrackerEvent>>,
    load_error: Option<String>,
}

impl Tracker {
    /// Load stored data from `store` and build a tracker around it.
    ///
    /// A load failure is logged and reported through `events`; the tracker then
    /// starts from empty defaults.
    pub async fn open(
        store: Arc<dyn DailyStore>,
        catalog: BehaviorCatalog,
        config: &TrackerConfig,
        events: Option<mpsc::UnboundedSender<TrackerEvent>>,
    ) -> Self {
        let (stored, load_error) = match store.load(&config.store_key).await {
            Ok(stored) => (stored, None),
            Err(e) => {
                let e = TrackerError::PersistenceLoad(e);
                warn!(error = %e, "Falling back to empty daily data");
                if let Some(tx) = &events {
                    let _ = tx.send(TrackerEvent::LoadFailed {
                        message: e.to_string(),
                    });
                }
                (None, Some(e.to_string()))
            }
        };

        if let Some(data) = &stored {
            info!(calls = data.calls.len(), "Loaded daily data");
        }

        let manager = SessionManager::new(catalog, stored)
            .with_check_in_after(config.check_in_after_secs);
        let worker = PersistenceWorker::spawn(store, config.store_key.clone(), events.clone());

        Self {
            manager,
            worker,
            events,
            load_error,
        }
    }

    /// Open a tracker over the JSON file store and catalog named in `config`
    pub async fn open_with_config(
        config: &TrackerConfig,
        events: Option<mpsc::UnboundedSender<TrackerEvent>>,
    ) -> Result<Self, TrackerError> {
        let catalog = config.load_catalog()?;
        let store = Arc::new(JsonFileStore::new(&config.store_dir));
        Ok(Self::open(store, catalog, config, events).await)
    }

    /// Replace the encouragement selection strategy
    pub fn with_picker(mut self, picker: Box<dyn EncouragementPicker>) -> Self {
        self.manager = self.manager.with_picker(picker);
        self
    }

    /// Error message from the startup load, if it failed
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn start_session(&mut self, raw_id: &str) -> Result<(), TrackerError> {
        self.manager.start_session(raw_id)
    }

    pub fn toggle_behavior(&mut self, behavior_id: &str) -> Result<ToggleResult, TrackerError> {
        let result = self.manager.toggle_behavior(behavior_id)?;
        self.persist();
        Ok(result)
    }

    pub fn end_session(&mut self) -> Result<CallRecord, TrackerError> {
        let record = self.manager.end_session()?;
        self.persist();
        Ok(record)
    }

    /// Reset history in memory and remove it from the store
    pub fn clear_history(&mut self) {
        self.manager.clear_history();
        if let Err(e) = self.worker.remove() {
            self.report_persist_error(StoreOpKind::Remove, e);
        }
    }

    /// Advance the active call's counter, emitting a check-in event on the threshold
    pub fn tick(&mut self, seconds: u64) -> Option<CheckInAdvisory> {
        let advisory = self.manager.tick(seconds)?;
        if let (Some(tx), Some(session)) = (&self.events, self.manager.active_session()) {
            let _ = tx.send(TrackerEvent::CheckIn {
                call_id: session.id.clone(),
                advisory,
            });
        }
        Some(advisory)
    }

    pub fn compute_summary(&self) -> Summary {
        self.manager.compute_summary()
    }

    pub fn export_report(&self) -> Result<String, TrackerError> {
        self.manager.export_report()
    }

    pub fn progress(&self) -> Progress {
        self.manager.progress()
    }

    /// Clipboard recap for a completed call
    pub fn recap(&self, record: &CallRecord) -> String {
        report::call_recap(record, self.manager.catalog())
    }

    pub fn active_session(&self) -> Option<&CallSession> {
        self.manager.active_session()
    }

    pub fn daily_data(&self) -> &DailyData {
        self.manager.daily_data()
    }

    pub fn catalog(&self) -> &BehaviorCatalog {
        self.manager.catalog()
    }

    /// Wait for every queued store operation; returns the first failure since the last flush
    pub async fn flush(&self) -> Result<(), TrackerError> {
        self.worker.flush().await
    }

    /// Teardown path: commit any active call as-is, persist, and stop the worker.
    ///
    /// Returns the salvaged record, if a call was active.
    pub async fn shutdown(mut self) -> Result<Option<CallRecord>, TrackerError> {
        let salvaged = self.manager.salvage_active();
        if salvaged.is_some() {
            self.persist();
        }
        self.worker.shutdown().await?;
        Ok(salvaged)
    }

    fn persist(&self) {
        if let Err(e) = self.worker.save(self.manager.committed_snapshot()) {
            self.report_persist_error(StoreOpKind::Save, e);
        }
    }

    fn report_persist_error(&self, op: StoreOpKind, error: TrackerError) {
        warn!(?op, error = %error, "Could not queue store operation");
        if let Some(tx) = &self.events {
            let _ = tx.send(TrackerEvent::PersistenceFailed {
                op,
                message: error.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picker::FirstPicker;
    use crate::store::{MemoryStore, DAILY_DATA_KEY};
    use crate::types::ToggleOutcome;
    use pretty_assertions::assert_eq;

    async fn open(store: Arc<MemoryStore>) -> Tracker {
        Tracker::open(store, BehaviorCatalog::default(), &TrackerConfig::default(), None)
            .await
            .with_picker(Box::new(FirstPicker))
    }

    #[tokio::test]
    async fn test_first_run_initializes_tally() {
        let tracker = open(Arc::new(MemoryStore::new())).await;
        assert_eq!(tracker.daily_data(), &DailyData::empty_for(&BehaviorCatalog::default()));
        assert!(tracker.load_error().is_none());
    }

    #[tokio::test]
    async fn test_end_session_persists() {
        let store = Arc::new(MemoryStore::new());
        let mut tracker = open(store.clone()).await;

        tracker.start_session("ACC123").unwrap();
        let result = tracker.toggle_behavior("fixFlow").unwrap();
        assert_eq!(
            result.outcome,
            ToggleOutcome::Activated {
                encouragement: "Nice work using the Fix Flow!".to_string()
            }
        );
        tracker.tick(75);
        let record = tracker.end_session().unwrap();
        tracker.flush().await.unwrap();

        let stored = store.get(DAILY_DATA_KEY).await.unwrap();
        assert_eq!(stored.calls, vec![record.clone()]);
        assert_eq!(stored.tally("fixFlow"), 1);
        assert!(tracker.recap(&record).contains("Use the Fix Flow\nDuration: 01:15"));
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let mut tracker = open(store.clone()).await;
        for (id, behavior) in [("a", "planBenefits"), ("b", "collectPastDue")] {
            tracker.start_session(id).unwrap();
            tracker.toggle_behavior(behavior).unwrap();
            tracker.end_session().unwrap();
        }
        let before = tracker.daily_data().clone();
        tracker.shutdown().await.unwrap();

        let reopened = open(store).await;
        assert_eq!(reopened.daily_data(), &before);
    }

    #[tokio::test]
    async fn test_abandoned_toggles_are_not_persisted() {
        let store = Arc::new(MemoryStore::new());
        let mut tracker = open(store.clone()).await;

        tracker.start_session("open-call").unwrap();
        tracker.toggle_behavior("tLifeAppLogin").unwrap();
        tracker.flush().await.unwrap();

        let stored = store.get(DAILY_DATA_KEY).await.unwrap();
        assert_eq!(stored.tally("tLifeAppLogin"), 0);
        assert!(stored.calls.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_salvages_active_call() {
        let store = Arc::new(MemoryStore::new());
        let mut tracker = open(store.clone()).await;

        tracker.start_session("closing").unwrap();
        tracker.toggle_behavior("personalGuarantee").unwrap();
        let salvaged = tracker.shutdown().await.unwrap().unwrap();
        assert_eq!(salvaged.id, "closing");

        let stored = store.get(DAILY_DATA_KEY).await.unwrap();
        assert_eq!(stored.calls, vec![salvaged]);
        assert_eq!(stored.tally("personalGuarantee"), 1);
    }

    #[tokio::test]
    async fn test_shutdown_without_active_call() {
        let tracker = open(Arc::new(MemoryStore::new())).await;
        assert!(tracker.shutdown().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_history_removes_stored_data() {
        let store = Arc::new(MemoryStore::new());
        let mut tracker = open(store.clone()).await;

        tracker.start_session("x").unwrap();
        tracker.end_session().unwrap();
        tracker.flush().await.unwrap();
        assert!(store.get(DAILY_DATA_KEY).await.is_some());

        tracker.clear_history();
        tracker.clear_history();
        tracker.flush().await.unwrap();

        assert!(store.get(DAILY_DATA_KEY).await.is_none());
        assert_eq!(tracker.daily_data().total_calls(), 0);
        assert!(matches!(tracker.export_report(), Err(TrackerError::NoHistory)));
    }

    #[tokio::test]
    async fn test_clear_during_call_then_end_persists_consistent_tally() {
        let store = Arc::new(MemoryStore::new());
        let mut tracker = open(store.clone()).await;

        tracker.start_session("earlier").unwrap();
        tracker.toggle_behavior("planBenefits").unwrap();
        tracker.end_session().unwrap();

        tracker.start_session("ongoing").unwrap();
        tracker.toggle_behavior("fixFlow").unwrap();
        tracker.clear_history();
        tracker.flush().await.unwrap();
        assert!(store.get(DAILY_DATA_KEY).await.is_none());

        let record = tracker.end_session().unwrap();
        tracker.flush().await.unwrap();

        let stored = store.get(DAILY_DATA_KEY).await.unwrap();
        assert_eq!(stored.calls, vec![record]);
        assert_eq!(stored.tally("fixFlow"), 1);
        assert_eq!(stored.tally("planBenefits"), 0);
    }

    #[tokio::test]
    async fn test_save_failure_keeps_memory_state() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_writes(true);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tracker = Tracker::open(
            store.clone(),
            BehaviorCatalog::default(),
            &TrackerConfig::default(),
            Some(tx),
        )
        .await;

        tracker.start_session("x").unwrap();
        tracker.end_session().unwrap();

        assert!(matches!(
            tracker.flush().await,
            Err(TrackerError::PersistenceSave(_))
        ));
        assert_eq!(tracker.daily_data().total_calls(), 1);
        assert!(matches!(
            rx.recv().await,
            Some(TrackerEvent::PersistenceFailed {
                op: StoreOpKind::Save,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_load_failure_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = TrackerConfig::default().with_store_dir(dir.path());
        std::fs::write(dir.path().join("dailyData.json"), "garbage").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let tracker = Tracker::open_with_config(&config, Some(tx)).await.unwrap();

        assert!(tracker.load_error().is_some());
        assert_eq!(tracker.daily_data().total_calls(), 0);
        assert!(matches!(rx.recv().await, Some(TrackerEvent::LoadFailed { .. })));
    }

    #[tokio::test]
    async fn test_check_in_event() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let config = TrackerConfig::default().with_check_in_after(3);
        let mut tracker = Tracker::open(
            Arc::new(MemoryStore::new()),
            BehaviorCatalog::default(),
            &config,
            Some(tx),
        )
        .await;

        tracker.start_session("long").unwrap();
        for _ in 0..10 {
            tracker.tick(1);
        }

        match rx.try_recv().unwrap() {
            TrackerEvent::CheckIn { call_id, advisory } => {
                assert_eq!(call_id, "long");
                assert_eq!(advisory.elapsed_seconds, 3);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_export_with_history() {
        let mut tracker = open(Arc::new(MemoryStore::new())).await;
        tracker.start_session("ACC1").unwrap();
        tracker.toggle_behavior("fixFlow").unwrap();
        tracker.end_session().unwrap();

        let report = tracker.export_report().unwrap();
        assert!(report.starts_with("T-Mobile Call Center Summary\n\nID: ACC1\n"));
        assert!(report.contains("Use the Fix Flow: 100.00%\n"));
        assert!(report.contains("Collect Past Due Amount: 0.00%\n"));
    }
}
