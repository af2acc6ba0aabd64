//! Text rendering for recaps and the daily report

use crate::catalog::BehaviorCatalog;
use crate::types::{CallRecord, Summary};
use std::fmt::Write;

/// First line of the exported report
pub const REPORT_HEADER: &str = "T-Mobile Call Center Summary";

/// Default file name for the exported report
pub const REPORT_FILE_NAME: &str = "call_summary.txt";

/// Link printed under the recap banner
pub const RECAP_URL: &str = "https://micah4thewin.github.io/calltracker/";

const RECAP_BANNER: &str = "\n(｡◕‿◕｡)\n";

/// Format seconds as `MM:SS`; minutes are not wrapped at the hour
pub fn format_duration(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Display names for a call's behaviors joined by ", ", or "None"
pub fn behavior_names(behaviors: &[String], catalog: &BehaviorCatalog) -> String {
    if behaviors.is_empty() {
        return "None".to_string();
    }
    behaviors
        .iter()
        .map(|id| catalog.display_name(id))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Clipboard text for one completed call
pub fn call_recap(record: &CallRecord, catalog: &BehaviorCatalog) -> String {
    format!(
        "{}\n{}\nCall Recap:\n{}\nDuration: {}\n\n",
        RECAP_BANNER,
        RECAP_URL,
        behavior_names(&record.behaviors, catalog),
        format_duration(record.duration_seconds)
    )
}

/// `<name>: <pct>%` lines, one per behavior in catalog order
pub fn render_summary_lines(summary: &Summary) -> String {
    let mut out = String::new();
    for stat in &summary.behaviors {
        let _ = writeln!(out, "{}: {:.2}%", stat.name, stat.percentage);
    }
    out
}

/// Full export: header, one block per call, then the daily summary
pub fn render_export(calls: &[CallRecord], summary: &Summary, catalog: &BehaviorCatalog) -> String {
    let mut out = format!("{REPORT_HEADER}\n\n");

    for call in calls {
        let _ = writeln!(out, "ID: {}", call.id);
        let _ = writeln!(
            out,
            "Behaviors Completed: {}",
            behavior_names(&call.behaviors, catalog)
        );
        let _ = writeln!(out, "Duration: {}\n", format_duration(call.duration_seconds));
    }

    out.push_str("Daily Summary:\n");
    let _ = writeln!(out, "Total Calls: {}", summary.total_calls);
    out.push_str(&render_summary_lines(summary));
    out
}
