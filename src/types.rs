//! Core data types
//!
//! This module defines the behavior configuration, the transient call session,
//! and the persisted daily aggregate that flow through the tracker.

use crate::catalog::BehaviorCatalog;
use crate::timer::ElapsedCounter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A coaching behavior an agent may report having performed during a call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorDefinition {
    /// Unique identifier used in toggles and in the persisted tally
    pub id: String,
    /// Display label
    pub name: String,
    /// Sample phrasings shown as hints
    pub examples: Vec<String>,
    /// Feedback lines shown when the behavior is marked as performed
    pub encouragements: Vec<String>,
}

/// A call that is currently being tracked
#[derive(Debug, Clone)]
pub struct CallSession {
    /// Caller-supplied identifier (account number or similar), already trimmed
    pub id: String,
    /// Behavior ids performed so far, in the order they were switched on
    pub behaviors: Vec<String>,
    /// Final duration, written when the session ends
    pub duration_seconds: u64,
    /// Elapsed-time counter owned by this session
    pub counter: ElapsedCounter,
}

impl CallSession {
    pub(crate) fn new(id: String, check_in_after_secs: u64) -> Self {
        let mut counter = ElapsedCounter::new(check_in_after_secs);
        counter.start();
        Self {
            id,
            behaviors: Vec::new(),
            duration_seconds: 0,
            counter,
        }
    }

    pub fn has_behavior(&self, behavior_id: &str) -> bool {
        self.behaviors.iter().any(|b| b == behavior_id)
    }

    /// Seconds elapsed on the running counter
    pub fn elapsed_seconds(&self) -> u64 {
        self.counter.elapsed()
    }

    pub(crate) fn to_record(&self) -> CallRecord {
        CallRecord {
            id: self.id.clone(),
            behaviors: self.behaviors.clone(),
            duration_seconds: self.duration_seconds,
        }
    }
}

/// Snapshot of a completed call as stored in the call log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    pub id: String,
    #[serde(default)]
    pub behaviors: Vec<String>,
    #[serde(rename = "duration", default)]
    pub duration_seconds: u64,
}

/// Persisted aggregate: the call log and the per-behavior tally
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyData {
    /// Completed calls, oldest first
    #[serde(default)]
    pub calls: Vec<CallRecord>,
    /// Behavior id -> number of calls the behavior was performed in
    #[serde(rename = "behaviors", default)]
    pub behavior_tally: BTreeMap<String, u32>,
}

impl DailyData {
    /// Empty data with a zero tally for every behavior in the catalog
    pub fn empty_for(catalog: &BehaviorCatalog) -> Self {
        Self {
            calls: Vec::new(),
            behavior_tally: catalog.ids().map(|id| (id.to_string(), 0)).collect(),
        }
    }

    /// Add a zero entry for every catalog id missing from the tally.
    ///
    /// Entries for ids the catalog no longer knows are kept untouched.
    /// Returns the number of entries added.
    pub fn reconcile(&mut self, catalog: &BehaviorCatalog) -> usize {
        let mut added = 0;
        for id in catalog.ids() {
            if !self.behavior_tally.contains_key(id) {
                self.behavior_tally.insert(id.to_string(), 0);
                added += 1;
            }
        }
        added
    }

    pub fn total_calls(&self) -> usize {
        self.calls.len()
    }

    pub fn tally(&self, behavior_id: &str) -> u32 {
        self.behavior_tally.get(behavior_id).copied().unwrap_or(0)
    }

    pub(crate) fn increment(&mut self, behavior_id: &str) {
        *self.behavior_tally.entry(behavior_id.to_string()).or_insert(0) += 1;
    }

    pub(crate) fn decrement(&mut self, behavior_id: &str) {
        if let Some(count) = self.behavior_tally.get_mut(behavior_id) {
            *count = count.saturating_sub(1);
        }
    }
}

/// What a toggle did to the active session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Behavior was switched on; carries one of its encouragements
    Activated { encouragement: String },
    /// Behavior was switched off
    Deactivated,
}

/// Result of toggling a behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleResult {
    pub behavior_id: String,
    pub outcome: ToggleOutcome,
    /// Behaviors now marked in the active session
    pub completed: usize,
    /// Behaviors defined in the catalog
    pub total: usize,
}

impl ToggleResult {
    pub fn progress(&self) -> Progress {
        Progress {
            completed: self.completed,
            total: self.total,
        }
    }
}

/// Completed versus defined behaviors for the active call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    /// Completion as a percentage in [0, 100]
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.completed as f64 / self.total as f64 * 100.0).min(100.0)
    }
}

/// Per-behavior line of the daily summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BehaviorStat {
    pub id: String,
    pub name: String,
    pub count: u32,
    /// Share of calls featuring the behavior, rounded to 2 decimals
    pub percentage: f64,
}

/// Aggregate statistics over the call log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_calls: usize,
    pub behaviors: Vec<BehaviorStat>,
}
