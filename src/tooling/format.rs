//! Format cycle outcomes, status, and history as text.

use crate::diff::ChangeSet;
use crate::history::Snapshot;
use crate::monitor::report::group_digits;
use crate::monitor::CycleOutcome;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;

/// Format a section heading with bold/underline. Respects NO_COLOR and TTY.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

/// Status data shared by the text and JSON renderings.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub server: String,
    pub target_path: String,
    pub interval_secs: u64,
    pub channels: Vec<String>,
    pub config_path: Option<String>,
    pub history_path: String,
    pub history_exists: bool,
    pub tracked_files: usize,
    pub last_updated: Option<String>,
}

/// Format unified status as human-readable text.
pub fn format_status_text(data: &StatusReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Monitor Status")));
    out.push_str(&format!("{}\n", format_section_heading("Target")));
    out.push_str(&format!("  Server: {}\n", data.server));
    out.push_str(&format!("  Path: {}\n", data.target_path));
    out.push_str(&format!("  Interval: {}s\n", data.interval_secs));
    if data.channels.is_empty() {
        out.push_str("  Channels: none\n");
    } else {
        out.push_str(&format!("  Channels: {}\n", data.channels.join(", ")));
    }
    if let Some(config) = &data.config_path {
        out.push_str(&format!("  Config: {}\n", config));
    }
    out.push('\n');
    out.push_str(&format!("{}\n", format_section_heading("History")));
    out.push_str(&format!("  File: {}\n", data.history_path));
    if data.history_exists {
        out.push_str(&format!("  Tracked files: {}\n", data.tracked_files));
        match &data.last_updated {
            Some(when) => out.push_str(&format!("  Last updated: {}\n", when)),
            None => out.push_str("  Last updated: unknown\n"),
        }
    } else {
        out.push_str("  Tracked files: none (no cycle recorded yet)\n");
    }
    out
}

/// Format one cycle outcome as human-readable text.
pub fn format_cycle_text(outcome: &CycleOutcome, dry_run: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Monitor Cycle")));
    out.push_str(&format!("  Scanned: {} files\n", outcome.scanned));
    out.push_str(&format!(
        "  Added: {}  Modified: {}  Deleted: {}  Unchanged: {}\n",
        outcome.changes.added.len(),
        outcome.changes.modified.len(),
        outcome.changes.deleted.len(),
        outcome.changes.unchanged
    ));
    if dry_run {
        out.push_str("  Dry run: nothing notified, snapshot unchanged\n");
    } else {
        out.push_str(&format!("  Notified: {} channel(s)\n", outcome.notified));
    }
    out.push_str(&format!("  Duration: {} ms\n", outcome.duration_ms));
    out.push_str(&format_change_lists(&outcome.changes));
    out
}

fn format_change_lists(changes: &ChangeSet) -> String {
    let mut out = String::new();
    if !changes.added.is_empty() {
        out.push_str(&format!("\n{}\n", format_section_heading("New files")));
        for file in &changes.added {
            out.push_str(&format!(
                "  + {} ({} bytes)\n",
                file.path,
                group_digits(file.size)
            ));
        }
    }
    if !changes.modified.is_empty() {
        out.push_str(&format!("\n{}\n", format_section_heading("Modified files")));
        for file in &changes.modified {
            out.push_str(&format!(
                "  * {} ({} bytes)\n",
                file.path,
                group_digits(file.size)
            ));
        }
    }
    if !changes.deleted.is_empty() {
        out.push_str(&format!("\n{}\n", format_section_heading("Deleted files")));
        for path in &changes.deleted {
            out.push_str(&format!("  - {}\n", path));
        }
    }
    out
}

/// Format tracked files as a table, truncated to `limit` rows (0 = all).
pub fn format_history_text(snapshot: &Snapshot, path: &str, limit: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n\n",
        format_section_heading("Tracked Files")
    ));
    out.push_str(&format!("  File: {}\n", path));
    out.push_str(&format!("  Tracked: {}\n", snapshot.len()));
    if let Some(when) = &snapshot.last_updated {
        out.push_str(&format!("  Last updated: {}\n", when.to_rfc3339()));
    }
    if snapshot.is_empty() {
        return out;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Path", "Size", "Digest"]);
    let shown = if limit == 0 {
        snapshot.len()
    } else {
        limit.min(snapshot.len())
    };
    for (path, record) in snapshot.files.iter().take(shown) {
        let digest = record.digest.get(..12).unwrap_or(&record.digest);
        table.add_row(vec![
            path.clone(),
            group_digits(record.size),
            digest.to_string(),
        ]);
    }
    out.push_str(&format!("\n{}\n", table));
    if shown < snapshot.len() {
        out.push_str(&format!("  ... and {} more\n", snapshot.len() - shown));
    }
    out
}
