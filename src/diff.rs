//! Change detection between the stored snapshot and a fresh listing.
//!
//! Pure set arithmetic over path-keyed maps. A path present only in the
//! current listing is added, present only in the snapshot is deleted, and
//! present in both with a different digest is modified.

use crate::history::FileRecord;
use serde::Serialize;
use std::collections::BTreeMap;

/// A file reported as added or modified, with its current size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangedFile {
    pub path: String,
    pub size: u64,
}

/// Partition of the current listing against the previous snapshot.
///
/// The three change lists are sorted by path. `unchanged` only counts:
/// untouched files are never reported individually.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChangeSet {
    pub added: Vec<ChangedFile>,
    pub modified: Vec<ChangedFile>,
    pub deleted: Vec<String>,
    pub unchanged: usize,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    pub fn total_changes(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }
}

/// Diff the previous snapshot against the current listing.
pub fn diff(
    previous: &BTreeMap<String, FileRecord>,
    current: &BTreeMap<String, FileRecord>,
) -> ChangeSet {
    let mut changes = ChangeSet::default();

    for (path, record) in current {
        match previous.get(path) {
            None => changes.added.push(ChangedFile {
                path: path.clone(),
                size: record.size,
            }),
            Some(prev) if prev.digest != record.digest => changes.modified.push(ChangedFile {
                path: path.clone(),
                size: record.size,
            }),
            Some(_) => changes.unchanged += 1,
        }
    }

    for path in previous.keys() {
        if !current.contains_key(path) {
            changes.deleted.push(path.clone());
        }
    }

    changes
}
