//! Background persistence
//!
//! Mutations enqueue store operations without waiting for them. A single task
//! applies the operations in submission order, so a later snapshot is never
//! overwritten by an earlier one. Failures are logged and reported as
//! [`TrackerEvent::PersistenceFailed`]; in-memory state is never rolled back.

use crate::error::TrackerError;
use crate::store::DailyStore;
use crate::tracker::TrackerEvent;
use crate::types::DailyData;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOpKind {
    Save,
    Remove,
}

enum StoreOp {
    Save(DailyData),
    Remove,
    Flush(oneshot::Sender<Result<(), TrackerError>>),
}

/// Handle to the task applying store operations
pub struct PersistenceWorker {
    tx: mpsc::UnboundedSender<StoreOp>,
    handle: JoinHandle<()>,
}

impl PersistenceWorker {
    /// Spawn the worker on the current tokio runtime
    pub fn spawn(
        store: Arc<dyn DailyStore>,
        key: String,
        events: Option<mpsc::UnboundedSender<TrackerEvent>>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_worker(store, key, rx, events));
        Self { tx, handle }
    }

    /// Queue a save of `data`
    pub fn save(&self, data: DailyData) -> Result<(), TrackerError> {
        self.tx
            .send(StoreOp::Save(data))
            .map_err(|_| TrackerError::PersistenceClosed)
    }

    /// Queue removal of the stored value
    pub fn remove(&self) -> Result<(), TrackerError> {
        self.tx
            .send(StoreOp::Remove)
            .map_err(|_| TrackerError::PersistenceClosed)
    }

    /// Wait until every operation queued so far has been applied.
    ///
    /// Returns the first failure since the previous flush.
    pub async fn flush(&self) -> Result<(), TrackerError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(StoreOp::Flush(done_tx))
            .map_err(|_| TrackerError::PersistenceClosed)?;
        done_rx.await.map_err(|_| TrackerError::PersistenceClosed)?
    }

    /// Flush, then stop the worker
    pub async fn shutdown(self) -> Result<(), TrackerError> {
        let result = self.flush().await;
        drop(self.tx);
        let _ = self.handle.await;
        result
    }
}

async fn run_worker(
    store: Arc<dyn DailyStore>,
    key: String,
    mut rx: mpsc::UnboundedReceiver<StoreOp>,
    events: Option<mpsc::UnboundedSender<TrackerEvent>>,
) {
    let mut first_failure: Option<TrackerError> = None;

    while let Some(op) = rx.recv().await {
        let (kind, result) = match op {
            StoreOp::Save(data) => (
                StoreOpKind::Save,
                store
                    .save(&key, &data)
                    .await
                    .map_err(TrackerError::PersistenceSave),
            ),
            StoreOp::Remove => (
                StoreOpKind::Remove,
                store
                    .remove(&key)
                    .await
                    .map_err(TrackerError::PersistenceClear),
            ),
            StoreOp::Flush(done) => {
                let _ = done.send(first_failure.take().map_or(Ok(()), Err));
                continue;
            }
        };

        match result {
            Ok(()) => debug!(?kind, "Store operation applied"),
            Err(e) => {
                warn!(?kind, error = %e, "Store operation failed");
                if let Some(events) = &events {
                    let _ = events.send(TrackerEvent::PersistenceFailed {
                        op: kind,
                        message: e.to_string(),
                    });
                }
                first_failure.get_or_insert(e);
            }
        }
    }
}
