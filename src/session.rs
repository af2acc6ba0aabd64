//! Session state management
//!
//! `SessionManager` owns the in-progress call and the daily aggregate and is
//! the only place either is mutated. Every operation is synchronous and free of
//! I/O; persistence is layered on top by [`crate::tracker::Tracker`].

use crate::catalog::BehaviorCatalog;
use crate::error::TrackerError;
use crate::picker::{EncouragementPicker, RandomPicker};
use crate::report;
use crate::timer::{CheckInAdvisory, DEFAULT_CHECK_IN_AFTER_SECS};
use crate::types::{
    BehaviorStat, CallRecord, CallSession, DailyData, Progress, Summary, ToggleOutcome,
    ToggleResult,
};
use tracing::{debug, info, warn};

/// State machine for one agent's call sessions and their cumulative statistics
pub struct SessionManager {
    catalog: BehaviorCatalog,
    daily: DailyData,
    active: Option<CallSession>,
    picker: Box<dyn EncouragementPicker>,
    check_in_after_secs: u64,
}

impl SessionManager {
    /// Create a manager over previously stored data (or defaults when `None`)
    pub fn new(catalog: BehaviorCatalog, stored: Option<DailyData>) -> Self {
        let daily = match stored {
            Some(mut data) => {
                let added = data.reconcile(&catalog);
                if added > 0 {
                    debug!(added, "Added tally entries for new behaviors");
                }
                data
            }
            None => DailyData::empty_for(&catalog),
        };

        Self {
            catalog,
            daily,
            active: None,
            picker: Box::new(RandomPicker),
            check_in_after_secs: DEFAULT_CHECK_IN_AFTER_SECS,
        }
    }

    /// Replace the encouragement selection strategy
    pub fn with_picker(mut self, picker: Box<dyn EncouragementPicker>) -> Self {
        self.picker = picker;
        self
    }

    /// Change the check-in threshold for sessions started from now on
    pub fn with_check_in_after(mut self, seconds: u64) -> Self {
        self.check_in_after_secs = seconds;
        self
    }

    /// Begin tracking a call
    pub fn start_session(&mut self, raw_id: &str) -> Result<(), TrackerError> {
        let id = raw_id.trim();
        if id.is_empty() {
            return Err(TrackerError::EmptyId);
        }
        if self.active.is_some() {
            return Err(TrackerError::SessionAlreadyActive);
        }

        debug!(call_id = id, "Call session started");
        self.active = Some(CallSession::new(id.to_string(), self.check_in_after_secs));
        Ok(())
    }

    /// Mark a behavior as performed, or unmark it if it already was
    pub fn toggle_behavior(&mut self, behavior_id: &str) -> Result<ToggleResult, TrackerError> {
        let session = self.active.as_mut().ok_or(TrackerError::NoActiveSession)?;
        let definition = self
            .catalog
            .get(behavior_id)
            .ok_or_else(|| TrackerError::UnknownBehavior(behavior_id.to_string()))?;

        let outcome = if session.has_behavior(behavior_id) {
            session.behaviors.retain(|b| b != behavior_id);
            self.daily.decrement(behavior_id);
            ToggleOutcome::Deactivated
        } else {
            session.behaviors.push(behavior_id.to_string());
            self.daily.increment(behavior_id);
            let encouragement = self
                .picker
                .pick(&definition.encouragements)
                .unwrap_or_default()
                .to_string();
            ToggleOutcome::Activated { encouragement }
        };

        debug!(
            call_id = %session.id,
            behavior = behavior_id,
            activated = matches!(outcome, ToggleOutcome::Activated { .. }),
            "Behavior toggled"
        );

        Ok(ToggleResult {
            behavior_id: behavior_id.to_string(),
            outcome,
            completed: session.behaviors.len(),
            total: self.catalog.len(),
        })
    }

    /// Stop the active call's counter and append it to the call log
    pub fn end_session(&mut self) -> Result<CallRecord, TrackerError> {
        let mut session = self.active.take().ok_or(TrackerError::NoActiveSession)?;

        session.duration_seconds = session.counter.stop();
        let record = session.to_record();
        self.daily.calls.push(record.clone());

        info!(
            call_id = %record.id,
            behaviors = record.behaviors.len(),
            duration = record.duration_seconds,
            "Call session ended"
        );
        Ok(record)
    }

    /// Commit whatever call is active without the normal end-of-call steps.
    ///
    /// Used on teardown only: the counter is not read, so the record keeps the
    /// duration the session held.
    pub fn salvage_active(&mut self) -> Option<CallRecord> {
        let session = self.active.take()?;
        let record = session.to_record();
        self.daily.calls.push(record.clone());

        warn!(call_id = %record.id, "Active call committed during teardown");
        Some(record)
    }

    /// Reset the call log and tally. The active call, if any, is left running.
    ///
    /// Toggles already made during the active call stay counted in the live
    /// tally, so ending it afterwards still leaves one count per logged call.
    pub fn clear_history(&mut self) {
        self.daily = DailyData::empty_for(&self.catalog);
        if let Some(session) = &self.active {
            for behavior_id in &session.behaviors {
                self.daily.increment(behavior_id);
            }
        }
        info!("Call history cleared");
    }

    /// Advance the active call's counter; no-op when no call is active
    pub fn tick(&mut self, seconds: u64) -> Option<CheckInAdvisory> {
        let session = self.active.as_mut()?;
        let advisory = session.counter.advance(seconds);
        if advisory.is_some() {
            info!(call_id = %session.id, "Check-in threshold reached");
        }
        advisory
    }

    /// Per-behavior share of completed calls
    pub fn compute_summary(&self) -> Summary {
        let total_calls = self.daily.total_calls();
        let behaviors = self
            .catalog
            .iter()
            .map(|b| {
                let count = self.daily.tally(&b.id);
                BehaviorStat {
                    id: b.id.clone(),
                    name: b.name.clone(),
                    count,
                    percentage: percentage(count, total_calls),
                }
            })
            .collect();

        Summary {
            total_calls,
            behaviors,
        }
    }

    /// Render the downloadable text report; refuses when no call has been logged
    pub fn export_report(&self) -> Result<String, TrackerError> {
        if self.daily.total_calls() == 0 {
            return Err(TrackerError::NoHistory);
        }
        Ok(report::render_export(
            &self.daily.calls,
            &self.compute_summary(),
            &self.catalog,
        ))
    }

    /// Behaviors checked on the active call out of the catalog size
    pub fn progress(&self) -> Progress {
        Progress {
            completed: self.active.as_ref().map_or(0, |s| s.behaviors.len()),
            total: self.catalog.len(),
        }
    }

    /// Daily data with the active call's toggles removed from the tally.
    ///
    /// This is the state written to storage, so a call that is neither ended
    /// nor salvaged never shows up in persisted statistics.
    pub fn committed_snapshot(&self) -> DailyData {
        let mut snapshot = self.daily.clone();
        if let Some(session) = &self.active {
            for behavior_id in &session.behaviors {
                snapshot.decrement(behavior_id);
            }
        }
        snapshot
    }

    /// The call in progress, if any
    pub fn active_session(&self) -> Option<&CallSession> {
        self.active.as_ref()
    }

    /// Whether a call is in progress
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Live daily data, including toggles made during the active call
    pub fn daily_data(&self) -> &DailyData {
        &self.daily
    }

    /// Behaviors tracked on every call
    pub fn catalog(&self) -> &BehaviorCatalog {
        &self.catalog
    }
}

/// `count / total_calls` as a percentage clamped to [0, 100], 2 decimals
fn percentage(count: u32, total_calls: usize) -> f64 {
    if total_calls == 0 {
        return 0.0;
    }
    let pct = (count as f64 / total_calls as f64 * 100.0).clamp(0.0, 100.0);
    (pct * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picker::FirstPicker;
    use crate::types::BehaviorDefinition;
    use pretty_assertions::assert_eq;

    fn empathy_catalog() -> BehaviorCatalog {
        let def = |id: &str, name: &str| BehaviorDefinition {
            id: id.to_string(),
            name: name.to_string(),
            examples: vec![format!("{name} example")],
            encouragements: vec![format!("{name} done!"), "Keep going!".to_string()],
        };
        BehaviorCatalog::new(vec![
            def("empathy", "Empathy Statement"),
            def("audit", "Account Audit"),
            def("recap", "Call Recap"),
        ])
        .unwrap()
    }

    fn manager() -> SessionManager {
        SessionManager::new(empathy_catalog(), None).with_picker(Box::new(FirstPicker))
    }

    #[test]
    fn test_start_trims_and_validates() {
        let mut m = manager();

        assert!(matches!(m.start_session("   "), Err(TrackerError::EmptyId)));
        assert!(!m.is_active());

        m.start_session("  ACC123 ").unwrap();
        assert_eq!(m.active_session().unwrap().id, "ACC123");

        assert!(matches!(
            m.start_session("OTHER"),
            Err(TrackerError::SessionAlreadyActive)
        ));
        assert_eq!(m.active_session().unwrap().id, "ACC123");
    }

    #[test]
    fn test_empathy_toggle_scenario() {
        let mut m = manager();
        m.start_session("ACC123").unwrap();

        let on = m.toggle_behavior("empathy").unwrap();
        assert_eq!(
            on.outcome,
            ToggleOutcome::Activated {
                encouragement: "Empathy Statement done!".to_string()
            }
        );
        assert_eq!(m.daily_data().tally("empathy"), 1);
        assert_eq!(m.active_session().unwrap().behaviors, vec!["empathy"]);

        let off = m.toggle_behavior("empathy").unwrap();
        assert_eq!(off.outcome, ToggleOutcome::Deactivated);
        assert_eq!(m.daily_data().tally("empathy"), 0);
        assert!(m.active_session().unwrap().behaviors.is_empty());

        m.tick(42);
        let record = m.end_session().unwrap();

        assert_eq!(
            m.daily_data().calls,
            vec![CallRecord {
                id: "ACC123".to_string(),
                behaviors: vec![],
                duration_seconds: 42,
            }]
        );
        assert_eq!(record.duration_seconds, 42);
        assert_eq!(m.daily_data().tally("empathy"), 0);
        assert!(!m.is_active());
    }

    #[test]
    fn test_toggle_errors_leave_state_unchanged() {
        let mut m = manager();
        assert!(matches!(
            m.toggle_behavior("empathy"),
            Err(TrackerError::NoActiveSession)
        ));

        m.start_session("A").unwrap();
        assert!(matches!(
            m.toggle_behavior("bogus"),
            Err(TrackerError::UnknownBehavior(id)) if id == "bogus"
        ));
        assert!(m.active_session().unwrap().behaviors.is_empty());
        assert!(!m.daily_data().behavior_tally.contains_key("bogus"));
    }

    #[test]
    fn test_odd_toggles_remain_active() {
        let mut m = manager();
        m.start_session("A").unwrap();

        let toggles = ["empathy", "audit", "recap", "audit", "empathy", "empathy"];
        for id in toggles {
            m.toggle_behavior(id).unwrap();
        }

        let mut active = m.active_session().unwrap().behaviors.clone();
        active.sort();
        // empathy x3, audit x2, recap x1
        assert_eq!(active, vec!["empathy", "recap"]);
        assert_eq!(m.progress(), Progress { completed: 2, total: 3 });
    }

    #[test]
    fn test_toggle_reports_progress() {
        let mut m = manager();
        m.start_session("A").unwrap();
        let result = m.toggle_behavior("audit").unwrap();
        assert_eq!(result.completed, 1);
        assert_eq!(result.total, 3);
        assert!((result.progress().percent() - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_end_without_session() {
        let mut m = manager();
        assert!(matches!(m.end_session(), Err(TrackerError::NoActiveSession)));
        assert!(m.daily_data().calls.is_empty());
    }

    #[test]
    fn test_tally_counts_ended_sessions() {
        let mut m = manager();

        for (id, behaviors) in [
            ("c1", vec!["empathy", "audit"]),
            ("c2", vec!["empathy"]),
            ("c3", vec![]),
        ] {
            m.start_session(id).unwrap();
            for b in behaviors {
                m.toggle_behavior(b).unwrap();
            }
            m.end_session().unwrap();
        }

        let data = m.daily_data();
        assert_eq!(data.total_calls(), 3);
        for behavior in ["empathy", "audit", "recap"] {
            let expected = data
                .calls
                .iter()
                .filter(|c| c.behaviors.iter().any(|b| b == behavior))
                .count() as u32;
            assert_eq!(data.tally(behavior), expected, "{behavior}");
        }
    }

    #[test]
    fn test_committed_snapshot_excludes_active_toggles() {
        let mut m = manager();
        m.start_session("done").unwrap();
        m.toggle_behavior("audit").unwrap();
        m.end_session().unwrap();

        m.start_session("in-progress").unwrap();
        m.toggle_behavior("audit").unwrap();
        m.toggle_behavior("empathy").unwrap();

        assert_eq!(m.daily_data().tally("audit"), 2);

        let snapshot = m.committed_snapshot();
        assert_eq!(snapshot.tally("audit"), 1);
        assert_eq!(snapshot.tally("empathy"), 0);
        assert_eq!(snapshot.total_calls(), 1);
    }

    #[test]
    fn test_salvage_commits_active_call_as_is() {
        let mut m = manager();
        assert!(m.salvage_active().is_none());

        m.start_session("late").unwrap();
        m.toggle_behavior("recap").unwrap();
        m.tick(120);

        let record = m.salvage_active().unwrap();
        assert_eq!(record.id, "late");
        assert_eq!(record.behaviors, vec!["recap"]);
        assert_eq!(record.duration_seconds, 0);

        assert!(!m.is_active());
        assert_eq!(m.committed_snapshot().tally("recap"), 1);
        assert_eq!(m.committed_snapshot().total_calls(), 1);
    }

    #[test]
    fn test_clear_history_is_idempotent_and_keeps_active() {
        let mut m = manager();
        m.start_session("one").unwrap();
        m.toggle_behavior("empathy").unwrap();
        m.end_session().unwrap();
        m.start_session("two").unwrap();

        m.clear_history();
        let once = m.daily_data().clone();
        m.clear_history();

        assert_eq!(m.daily_data(), &once);
        assert_eq!(once, DailyData::empty_for(&empathy_catalog()));
        assert_eq!(m.active_session().unwrap().id, "two");
    }

    #[test]
    fn test_clear_during_call_keeps_tally_consistent() {
        let mut m = manager();
        m.start_session("before").unwrap();
        m.toggle_behavior("audit").unwrap();
        m.end_session().unwrap();

        m.start_session("A").unwrap();
        m.toggle_behavior("empathy").unwrap();
        m.clear_history();

        assert_eq!(m.daily_data().tally("empathy"), 1);
        assert_eq!(m.daily_data().tally("audit"), 0);
        assert_eq!(m.committed_snapshot(), DailyData::empty_for(&empathy_catalog()));

        let record = m.end_session().unwrap();
        assert_eq!(record.behaviors, vec!["empathy"]);

        let daily = m.daily_data();
        assert_eq!(daily.total_calls(), 1);
        for id in ["empathy", "audit", "recap"] {
            let containing = daily
                .calls
                .iter()
                .filter(|c| c.behaviors.iter().any(|b| b == id))
                .count() as u32;
            assert_eq!(daily.tally(id), containing, "tally for {id}");
        }
    }

    #[test]
    fn test_summary_percentages() {
        let mut m = manager();
        for (id, behaviors) in [("a", vec!["empathy"]), ("b", vec!["empathy", "audit"]), ("c", vec![])] {
            m.start_session(id).unwrap();
            for b in behaviors {
                m.toggle_behavior(b).unwrap();
            }
            m.end_session().unwrap();
        }

        let summary = m.compute_summary();
        assert_eq!(summary.total_calls, 3);
        assert_eq!(summary.behaviors[0].percentage, 66.67);
        assert_eq!(summary.behaviors[1].percentage, 33.33);
        assert_eq!(summary.behaviors[2].percentage, 0.0);
    }

    #[test]
    fn test_summary_with_no_calls_is_zero() {
        let mut stored = DailyData::default();
        stored.behavior_tally.insert("empathy".to_string(), 7);
        let m = SessionManager::new(empathy_catalog(), Some(stored));

        let summary = m.compute_summary();
        assert_eq!(summary.total_calls, 0);
        assert!(summary.behaviors.iter().all(|b| b.percentage == 0.0));
    }

    #[test]
    fn test_summary_clamps_inconsistent_tally() {
        let stored = DailyData {
            calls: vec![CallRecord {
                id: "x".to_string(),
                behaviors: vec![],
                duration_seconds: 0,
            }],
            behavior_tally: [("empathy".to_string(), 5)].into_iter().collect(),
        };
        let m = SessionManager::new(empathy_catalog(), Some(stored));
        let summary = m.compute_summary();
        assert_eq!(summary.behaviors[0].percentage, 100.0);
    }

    #[test]
    fn test_export_refuses_empty_history() {
        let m = manager();
        assert!(matches!(m.export_report(), Err(TrackerError::NoHistory)));
    }

    #[test]
    fn test_tick_without_session_is_noop() {
        let mut m = manager();
        assert!(m.tick(1000).is_none());
    }

    #[test]
    fn test_check_in_threshold_per_session() {
        let mut m = manager().with_check_in_after(10);

        m.start_session("long").unwrap();
        let fired: Vec<_> = (0..30).filter_map(|_| m.tick(1)).collect();
        assert_eq!(fired.len(), 1);
        assert_eq!(m.end_session().unwrap().duration_seconds, 30);

        m.start_session("short").unwrap();
        let fired: Vec<_> = (0..9).filter_map(|_| m.tick(1)).collect();
        assert!(fired.is_empty());
        m.end_session().unwrap();
    }

    #[test]
    fn test_new_reconciles_stored_tally() {
        let stored = DailyData {
            calls: vec![],
            behavior_tally: [("legacy".to_string(), 3)].into_iter().collect(),
        };
        let m = SessionManager::new(empathy_catalog(), Some(stored));
        assert_eq!(m.daily_data().tally("legacy"), 3);
        assert!(m.daily_data().behavior_tally.contains_key("empathy"));
        assert!(m.compute_summary().behaviors.iter().all(|b| b.id != "legacy"));
    }
}
