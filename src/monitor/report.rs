//! Change report rendering.
//!
//! One plain-text report per cycle, shared by every notification channel.
//! Sections appear only when they have entries.

use crate::diff::ChangeSet;
use crate::notify::Report;
use chrono::{DateTime, Local};

/// Render a change report for delivery.
pub fn change_report(
    host: &str,
    target_path: &str,
    changes: &ChangeSet,
    detected_at: DateTime<Local>,
) -> Report {
    let total = changes.total_changes();
    let noun = if total == 1 { "change" } else { "changes" };
    let subject = format!("[driftwatch] {} {} on {}", total, noun, host);

    let mut body = String::new();
    body.push_str(&format!(
        "File changes detected on {}:{}\n",
        host, target_path
    ));
    body.push_str(&format!(
        "Detected at: {}\n",
        detected_at.format("%Y-%m-%d %H:%M:%S")
    ));

    if !changes.added.is_empty() {
        body.push_str(&format!("\nNew files ({}):\n", changes.added.len()));
        for file in &changes.added {
            body.push_str(&format!(
                "  + {} ({} bytes)\n",
                file.path,
                group_digits(file.size)
            ));
        }
    }
    if !changes.modified.is_empty() {
        body.push_str(&format!("\nModified files ({}):\n", changes.modified.len()));
        for file in &changes.modified {
            body.push_str(&format!(
                "  * {} ({} bytes)\n",
                file.path,
                group_digits(file.size)
            ));
        }
    }
    if !changes.deleted.is_empty() {
        body.push_str(&format!("\nDeleted files ({}):\n", changes.deleted.len()));
        for path in &changes.deleted {
            body.push_str(&format!("  - {}\n", path));
        }
    }

    Report { subject, body }
}

/// Insert thousands separators: 1234567 -> "1,234,567".
pub fn group_digits(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
