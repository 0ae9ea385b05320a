//! Shared fixtures: an in-memory remote source, a recording notification
//! channel, and environment isolation for CLI tests.

use driftwatch::config::DriftwatchConfig;
use driftwatch::error::MonitorError;
use driftwatch::notify::{Notifier, NotifyError, Report};
use driftwatch::remote::{RemoteFile, RemoteSource, ScanFilter};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::rc::Rc;
use std::sync::{Mutex, MutexGuard, OnceLock};
use tempfile::TempDir;

/// In-memory stand-in for the SFTP server.
///
/// Directories exist implicitly through path prefixes, and the listing
/// applies the same per-component filter rules the real walk does.
pub struct MemorySource {
    files: RefCell<BTreeMap<String, Vec<u8>>>,
    unreadable: RefCell<BTreeSet<String>>,
    fail_listing: Cell<bool>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            files: RefCell::new(BTreeMap::new()),
            unreadable: RefCell::new(BTreeSet::new()),
            fail_listing: Cell::new(false),
        }
    }

    pub fn put(&self, path: &str, content: &[u8]) {
        self.files
            .borrow_mut()
            .insert(path.to_string(), content.to_vec());
    }

    pub fn remove(&self, path: &str) {
        self.files.borrow_mut().remove(path);
    }

    /// Keep `path` in listings but make reads of it fail.
    pub fn poison_read(&self, path: &str) {
        self.unreadable.borrow_mut().insert(path.to_string());
    }

    pub fn refuse_listings(&self) {
        self.fail_listing.set(true);
    }
}

impl RemoteSource for MemorySource {
    fn list(&self, root: &str, filter: &ScanFilter) -> Result<Vec<RemoteFile>, MonitorError> {
        if self.fail_listing.get() {
            return Err(MonitorError::TransportError(
                "listing refused".to_string(),
            ));
        }
        let prefix = format!("{}/", root.trim_end_matches('/'));
        let mut listing = Vec::new();
        for (path, content) in self.files.borrow().iter() {
            let relative = match path.strip_prefix(&prefix) {
                Some(relative) => relative,
                None => continue,
            };
            let mut components = relative.split('/').collect::<Vec<_>>();
            let name = match components.pop() {
                Some(name) => name,
                None => continue,
            };
            if components.iter().any(|dir| !filter.allows_dir(dir)) {
                continue;
            }
            if !filter.allows_file(name) {
                continue;
            }
            listing.push(RemoteFile {
                path: path.clone(),
                size: content.len() as u64,
                mtime: None,
            });
        }
        Ok(listing)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, MonitorError> {
        if self.unreadable.borrow().contains(path) {
            return Err(MonitorError::TransportError(format!(
                "read refused: {}",
                path
            )));
        }
        self.files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| MonitorError::TransportError(format!("no such file: {}", path)))
    }

    fn is_dir(&self, path: &str) -> Result<bool, MonitorError> {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let files = self.files.borrow();
        if files.contains_key(path) {
            return Ok(false);
        }
        Ok(files.keys().any(|key| key.starts_with(&prefix)))
    }
}

/// Channel that records what it was asked to deliver.
pub struct RecordingNotifier {
    sent: Rc<RefCell<Vec<Report>>>,
}

impl RecordingNotifier {
    pub fn boxed() -> (Box<Self>, Rc<RefCell<Vec<Report>>>) {
        let sent = Rc::new(RefCell::new(Vec::new()));
        let channel = Box::new(Self {
            sent: Rc::clone(&sent),
        });
        (channel, sent)
    }
}

impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recorder"
    }

    fn send(&self, report: &Report) -> Result<(), NotifyError> {
        self.sent.borrow_mut().push(report.clone());
        Ok(())
    }
}

/// Valid configuration pointed at a temp history file. The server block
/// passes validation but is never dialed; cycle tests inject a source.
pub fn test_config(target_path: &str, history_file: &Path) -> DriftwatchConfig {
    let mut config = DriftwatchConfig::default();
    config.server.host = "sftp.test.invalid".to_string();
    config.server.username = "monitor".to_string();
    config.server.password = Some("secret".to_string());
    config.monitor.target_path = target_path.to_string();
    config.monitor.interval_secs = 60;
    config.history.file = Some(history_file.to_path_buf());
    config
}

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

const XDG_KEYS: [&str; 3] = ["XDG_CONFIG_HOME", "XDG_DATA_HOME", "XDG_STATE_HOME"];

/// Run `f` with every XDG base directory pointed into `temp_dir`, so CLI
/// tests never touch (or see) the real user configuration.
pub fn with_xdg_env<T>(temp_dir: &TempDir, f: impl FnOnce() -> T) -> T {
    let _guard = env_lock();
    let saved: Vec<(&str, Option<String>)> = XDG_KEYS
        .iter()
        .map(|key| (*key, std::env::var(key).ok()))
        .collect();
    for key in XDG_KEYS {
        std::env::set_var(key, temp_dir.path());
    }

    let result = f();

    for (key, value) in saved {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }
    result
}
