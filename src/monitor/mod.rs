//! Monitor cycle orchestration.
//!
//! One cycle: list the remote tree, hash every listed file, diff against
//! the stored snapshot, notify on changes, persist the new snapshot.
//! Watch mode repeats cycles on a fixed interval until interrupted, and a
//! failed cycle never stops the loop.

pub mod report;

use crate::config::DriftwatchConfig;
use crate::diff::{diff, ChangeSet};
use crate::error::MonitorError;
use crate::hasher::content_digest;
use crate::history::{FileRecord, HistoryStore, Snapshot};
use crate::notify::NotificationHub;
use crate::remote::{RemoteFile, RemoteSource, ScanFilter, SftpSource};
use chrono::{Local, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Counts and change lists from one completed cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    /// Files in the remote listing after filtering.
    pub scanned: usize,
    pub changes: ChangeSet,
    /// Channels that accepted the notification.
    pub notified: usize,
    pub duration_ms: u64,
}

/// Drives monitor cycles against a configured server.
pub struct MonitorService {
    config: DriftwatchConfig,
    filter: ScanFilter,
    history: HistoryStore,
    hub: NotificationHub,
    dry_run: bool,
}

impl MonitorService {
    /// Build a service from validated configuration.
    ///
    /// Fails fast on anything a cycle would need: invalid settings,
    /// uncompilable globs, or half-configured notification channels.
    pub fn new(config: DriftwatchConfig) -> Result<Self, MonitorError> {
        config.validate()?;
        let filter = config.monitor.filter()?;
        let history = HistoryStore::new(config.history.resolve_path()?);
        let hub = NotificationHub::from_config(&config.notify)?;
        Ok(Self {
            config,
            filter,
            history,
            hub,
            dry_run: false,
        })
    }

    /// Replace the notification hub.
    pub fn with_hub(mut self, hub: NotificationHub) -> Self {
        self.hub = hub;
        self
    }

    /// Detect and report changes without notifying or saving.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    /// Run one cycle over a fresh SFTP connection.
    pub fn run_once(&self) -> Result<CycleOutcome, MonitorError> {
        let source = SftpSource::connect(&self.config.server)?;
        self.run_cycle_with(&source)
    }

    /// Run one cycle against an already connected source.
    pub fn run_cycle_with(&self, source: &dyn RemoteSource) -> Result<CycleOutcome, MonitorError> {
        let started = Instant::now();
        let target = &self.config.monitor.target_path;
        info!(path = %target, "Monitor cycle started");

        let previous = self.history.load().unwrap_or_else(|e| {
            warn!(error = %e, "History unreadable, treating as empty");
            Snapshot::default()
        });
        let listing = source.list(target, &self.filter)?;
        let current = self.hash_listing(source, &listing, &previous);
        let changes = diff(&previous.files, &current);

        let notified = if changes.is_empty() {
            info!(files = current.len(), "No changes detected");
            0
        } else {
            info!(
                added = changes.added.len(),
                modified = changes.modified.len(),
                deleted = changes.deleted.len(),
                unchanged = changes.unchanged,
                "Changes detected"
            );
            if self.dry_run || self.hub.is_empty() {
                0
            } else {
                let report = report::change_report(
                    &self.config.server.host,
                    target,
                    &changes,
                    Local::now(),
                );
                self.hub.broadcast(&report).delivered_count()
            }
        };

        if self.dry_run {
            info!("Dry run, snapshot left untouched");
        } else {
            self.history.save(&Snapshot {
                files: current,
                last_updated: Some(Utc::now()),
            })?;
        }

        Ok(CycleOutcome {
            scanned: listing.len(),
            changes,
            notified,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Hash every listed file into path-keyed records.
    ///
    /// A file that disappears or turns unreadable between listing and
    /// read keeps its previous record, so it shows up as deleted only
    /// once it is really gone from the listing.
    fn hash_listing(
        &self,
        source: &dyn RemoteSource,
        listing: &[RemoteFile],
        previous: &Snapshot,
    ) -> BTreeMap<String, FileRecord> {
        let mut current = BTreeMap::new();
        for file in listing {
            match source.read(&file.path) {
                Ok(content) => {
                    current.insert(
                        file.path.clone(),
                        FileRecord {
                            digest: content_digest(&content),
                            size: content.len() as u64,
                        },
                    );
                }
                Err(e) => match previous.files.get(&file.path) {
                    Some(record) => {
                        warn!(path = %file.path, error = %e, "Failed to read file, keeping previous record");
                        current.insert(file.path.clone(), record.clone());
                    }
                    None => {
                        warn!(path = %file.path, error = %e, "Failed to read new file, skipping");
                    }
                },
            }
        }
        current
    }

    /// Repeat cycles every `interval` until `stop` is set.
    ///
    /// Each cycle gets its own connection. Cycle failures are logged and
    /// the loop keeps its schedule; only the caller's stop flag ends it.
    /// Returns the number of cycles attempted.
    pub fn run_loop(&self, interval: Duration, stop: Arc<AtomicBool>) -> u64 {
        info!(
            interval_secs = interval.as_secs(),
            "Watch mode started"
        );
        let mut cycles = 0u64;
        loop {
            cycles += 1;
            match self.run_once() {
                Ok(outcome) => {
                    info!(
                        cycle = cycles,
                        scanned = outcome.scanned,
                        changed = outcome.changes.total_changes(),
                        duration_ms = outcome.duration_ms,
                        "Cycle complete"
                    );
                }
                Err(e) => {
                    error!(cycle = cycles, error = %e, "Cycle failed, continuing");
                }
            }
            if !sleep_until_next_cycle(interval, &stop) {
                break;
            }
        }
        info!(cycles, "Watch mode stopped");
        cycles
    }
}

/// Sleep for `interval` in short slices, returning false once `stop` is
/// set so shutdown does not wait out the full interval.
fn sleep_until_next_cycle(interval: Duration, stop: &AtomicBool) -> bool {
    const SLICE: Duration = Duration::from_millis(500);
    let deadline = Instant::now() + interval;
    while Instant::now() < deadline {
        if stop.load(Ordering::SeqCst) {
            return false;
        }
        std::thread::sleep(SLICE.min(deadline.saturating_duration_since(Instant::now())));
    }
    !stop.load(Ordering::SeqCst)
}
