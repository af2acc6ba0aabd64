//! Call Tracker - session tracker for call-handling coaching behaviors
//!
//! An agent starts a call, toggles the coaching behaviors performed during it,
//! and ends the call. Cumulative statistics survive across calls in a local
//! store and can be exported as a text report.
//!
//! ## Modules
//!
//! - **Session core**: [`session::SessionManager`] owns the active call and the
//!   daily aggregate; [`timer::ElapsedCounter`] times the call
//! - **Persistence**: [`store::DailyStore`] backends and the ordered
//!   [`persistence::PersistenceWorker`]
//! - **Front ends**: [`tracker::Tracker`] ties the two together and
//!   [`driver::Driver`] runs it as an event loop

pub mod catalog;
pub mod config;
pub mod driver;
pub mod error;
pub mod persistence;
pub mod picker;
pub mod report;
pub mod session;
pub mod store;
pub mod timer;
pub mod tracker;
pub mod types;

pub use catalog::BehaviorCatalog;
pub use config::TrackerConfig;
pub use driver::{Command, Driver, Reply};
pub use error::{StoreError, TrackerError};
pub use session::SessionManager;
pub use store::{DailyStore, JsonFileStore, MemoryStore, DAILY_DATA_KEY};
pub use tracker::{Tracker, TrackerEvent};
pub use types::{
    BehaviorDefinition, CallRecord, CallSession, DailyData, Progress, Summary, ToggleOutcome,
    ToggleResult,
};

/// Call Tracker version
pub const TRACKER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name used in JSON output
pub const PRODUCER_NAME: &str = "calltracker";
