//! Snapshot persistence for the monitor.
//!
//! The snapshot maps absolute remote paths to the digest and size last
//! observed for them. It is read at the start of a cycle and rewritten in
//! full at the end; there is no incremental update and no lock, matching
//! the single-writer deployment model.

use crate::error::MonitorError;
use crate::textscan::sanitize_filename;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Last observed state of a single remote file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Hex-encoded content digest.
    pub digest: String,
    /// Size in bytes at the time the digest was computed.
    pub size: u64,
}

/// Full monitor state as persisted between cycles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Absolute remote path to last observed record, ordered by path.
    #[serde(default)]
    pub files: BTreeMap<String, FileRecord>,
    /// When the snapshot was last written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Load/save access to the on-disk history file.
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the snapshot from disk.
    ///
    /// A missing file is a first run and yields an empty snapshot; an
    /// unreadable or unparsable file is an error the caller decides how
    /// to survive.
    pub fn load(&self) -> Result<Snapshot, MonitorError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No history file yet, starting empty");
            return Ok(Snapshot::default());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| {
            MonitorError::HistoryError(format!(
                "Failed to read history file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            MonitorError::HistoryError(format!(
                "Failed to parse history file {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Persist the snapshot, replacing the previous file entirely.
    ///
    /// Written to a sibling temp file first and renamed into place so a
    /// crash mid-write never leaves a half-written snapshot behind.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), MonitorError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    MonitorError::HistoryError(format!(
                        "Failed to create history directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        let json = serde_json::to_string_pretty(snapshot).map_err(|e| {
            MonitorError::HistoryError(format!("Failed to serialize history: {}", e))
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| {
            MonitorError::HistoryError(format!(
                "Failed to write history file {}: {}",
                tmp.display(),
                e
            ))
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            MonitorError::HistoryError(format!(
                "Failed to replace history file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        debug!(path = %self.path.display(), files = snapshot.len(), "History saved");
        Ok(())
    }

    /// Back up the current history file and replace it with an empty one.
    ///
    /// Returns the backup path when a file existed. The next cycle will
    /// report every remote file as added.
    pub fn reset(&self) -> Result<Option<PathBuf>, MonitorError> {
        let backup = if self.path.exists() {
            let backup = self.backup_path(Local::now());
            fs::rename(&self.path, &backup).map_err(|e| {
                MonitorError::HistoryError(format!(
                    "Failed to back up history file to {}: {}",
                    backup.display(),
                    e
                ))
            })?;
            info!(backup = %backup.display(), "History backed up");
            Some(backup)
        } else {
            None
        };
        self.save(&Snapshot {
            files: BTreeMap::new(),
            last_updated: Some(Utc::now()),
        })?;
        Ok(backup)
    }

    fn backup_path(&self, now: DateTime<Local>) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "history".to_string());
        let name = format!(
            "{}_backup_{}.json",
            sanitize_filename(&stem),
            now.format("%Y%m%d_%H%M%S")
        );
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.join(name),
            _ => PathBuf::from(name),
        }
    }
}
