//! Text extraction helpers for scanned documents.
//!
//! Monitored servers mostly receive scanned receipts and invoices, so the
//! reporting side needs to pull dates and amounts out of OCR text and to
//! normalize filenames before they are used on the local filesystem.
//! Japanese date and amount notation is the primary input.

use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

static DATE_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
static AMOUNT_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
static FORBIDDEN_CHARS: OnceLock<Regex> = OnceLock::new();
static WHITESPACE_RUN: OnceLock<Regex> = OnceLock::new();
static UNDERSCORE_RUN: OnceLock<Regex> = OnceLock::new();

fn date_patterns() -> &'static [Regex] {
    DATE_PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"(\d{4})[年\-/](\d{1,2})[月\-/](\d{1,2})日?").expect("date pattern"),
            Regex::new(r"(\d{1,2})[月/](\d{1,2})日?").expect("month-day pattern"),
        ]
    })
}

fn amount_patterns() -> &'static [Regex] {
    AMOUNT_PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"合計[：:]\s*([0-9,]+)").expect("total pattern"),
            Regex::new(r"合計\s*([0-9,]+)").expect("total pattern"),
            Regex::new(r"税込[：:]\s*([0-9,]+)").expect("tax-inclusive pattern"),
            Regex::new(r"税込\s*([0-9,]+)").expect("tax-inclusive pattern"),
            Regex::new(r"([0-9,]+)\s*円").expect("yen suffix pattern"),
            Regex::new(r"[¥￥]\s*([0-9,]+)").expect("yen prefix pattern"),
            Regex::new(r"([0-9,]+)").expect("bare digits pattern"),
        ]
    })
}

/// Extract the first date mentioned in `text`.
///
/// Tries full `YYYY年MM月DD日` style notation first (also accepting `-` and
/// `/` separators), then month-day notation resolved against
/// `reference_year`. A match that is not a valid calendar date is skipped
/// and the next notation is tried. Returns `None` when nothing matches.
pub fn extract_date_with_reference(text: &str, reference_year: i32) -> Option<NaiveDate> {
    for pattern in date_patterns() {
        let Some(caps) = pattern.captures(text) else {
            continue;
        };
        let candidate = if caps.len() == 4 {
            let year = caps[1].parse::<i32>().ok();
            let month = caps[2].parse::<u32>().ok();
            let day = caps[3].parse::<u32>().ok();
            match (year, month, day) {
                (Some(y), Some(m), Some(d)) => NaiveDate::from_ymd_opt(y, m, d),
                _ => None,
            }
        } else {
            let month = caps[1].parse::<u32>().ok();
            let day = caps[2].parse::<u32>().ok();
            match (month, day) {
                (Some(m), Some(d)) => NaiveDate::from_ymd_opt(reference_year, m, d),
                _ => None,
            }
        };
        if let Some(date) = candidate {
            return Some(date);
        }
    }
    None
}

/// Extract the first date mentioned in `text`, resolving year-less
/// notation against the current local year.
pub fn extract_date(text: &str) -> Option<NaiveDate> {
    extract_date_with_reference(text, Local::now().year())
}

/// Extract the most likely amount mentioned in `text`.
///
/// Labelled totals (`合計`, `税込`, with ASCII or full-width colons) win
/// over yen-annotated numbers, which win over bare digit runs. Grouping
/// commas are stripped. Returns `None` when no digits appear at all.
pub fn extract_amount(text: &str) -> Option<f64> {
    for pattern in amount_patterns() {
        let Some(caps) = pattern.captures(text) else {
            continue;
        };
        let digits = caps[1].replace(',', "");
        if let Ok(amount) = digits.parse::<f64>() {
            return Some(amount);
        }
    }
    None
}

/// Normalize a filename for safe use on the local filesystem.
///
/// Characters that are reserved on common filesystems and whitespace runs
/// both become underscores, repeated underscores collapse to one, and
/// leading/trailing underscores and dots are trimmed.
pub fn sanitize_filename(name: &str) -> String {
    let forbidden = FORBIDDEN_CHARS
        .get_or_init(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("forbidden chars pattern"));
    let whitespace = WHITESPACE_RUN.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern"));
    let underscores =
        UNDERSCORE_RUN.get_or_init(|| Regex::new(r"_+").expect("underscore pattern"));

    let replaced = forbidden.replace_all(name, "_");
    let collapsed = whitespace.replace_all(&replaced, "_");
    let collapsed = underscores.replace_all(&collapsed, "_");
    collapsed
        .trim_matches(|c| c == '_' || c == '.')
        .to_string()
}
