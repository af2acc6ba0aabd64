//! Event loop for interactive front ends
//!
//! The driver processes one command or one tick at a time, so tracker
//! mutations never interleave. The one-second interval exists only while a call
//! is active and is dropped in the same step that ends the call.

use crate::error::TrackerError;
use crate::tracker::Tracker;
use crate::types::{CallRecord, Progress, Summary, ToggleResult};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::debug;

/// Requests a front end can send to the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start(String),
    Toggle(String),
    End,
    Summary,
    Progress,
    Export,
    Clear,
}

/// Successful outcome of a command
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Started { call_id: String },
    Toggled(ToggleResult),
    Ended { record: CallRecord, recap: String },
    Summary(Summary),
    Progress(Progress),
    Report(String),
    Cleared,
}

pub struct Driver {
    tracker: Tracker,
    tick_period: Duration,
}

impl Driver {
    pub fn new(tracker: Tracker) -> Self {
        Self {
            tracker,
            tick_period: Duration::from_secs(1),
        }
    }

    /// Run until the command channel closes, then shut the tracker down.
    /// Returns the call salvaged at shutdown, if any.
    pub async fn run<F>(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut respond: F,
    ) -> Result<Option<CallRecord>, TrackerError>
    where
        F: FnMut(Result<Reply, TrackerError>) + Send,
    {
        let mut ticker: Option<Interval> = None;

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    let reply = self.handle(command, &mut ticker);
                    respond(reply);
                }
                _ = next_tick(&mut ticker) => {
                    self.tracker.tick(1);
                }
            }
        }

        drop(ticker);
        self.tracker.shutdown().await
    }

    fn handle(
        &mut self,
        command: Command,
        ticker: &mut Option<Interval>,
    ) -> Result<Reply, TrackerError> {
        debug!(?command, "Handling command");
        match command {
            Command::Start(raw_id) => {
                self.tracker.start_session(&raw_id)?;
                let start = Instant::now() + self.tick_period;
                let mut interval = interval_at(start, self.tick_period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
                *ticker = Some(interval);

                let call_id = self
                    .tracker
                    .active_session()
                    .map(|s| s.id.clone())
                    .unwrap_or_default();
                Ok(Reply::Started { call_id })
            }
            Command::Toggle(behavior_id) => {
                self.tracker.toggle_behavior(&behavior_id).map(Reply::Toggled)
            }
            Command::End => {
                let record = self.tracker.end_session()?;
                *ticker = None;
                let recap = self.tracker.recap(&record);
                Ok(Reply::Ended { record, recap })
            }
            Command::Summary => Ok(Reply::Summary(self.tracker.compute_summary())),
            Command::Progress => Ok(Reply::Progress(self.tracker.progress())),
            Command::Export => self.tracker.export_report().map(Reply::Report),
            Command::Clear => {
                self.tracker.clear_history();
                Ok(Reply::Cleared)
            }
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
