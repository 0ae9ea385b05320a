//! Remote file access.
//!
//! The monitor needs a recursive listing and file contents, nothing more.
//! [`RemoteSource`] is that seam; [`sftp::SftpSource`] is the production
//! implementation, and tests substitute an in-memory source.

pub mod sftp;

pub use sftp::SftpSource;

use crate::error::MonitorError;
use glob::Pattern;
use serde::Serialize;

/// One file from a remote listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteFile {
    /// Absolute remote path with POSIX separators.
    pub path: String,
    /// Size in bytes as reported by the server.
    pub size: u64,
    /// Modification time in seconds since the epoch, when reported.
    pub mtime: Option<u64>,
}

/// Name-level filtering applied while walking the remote tree.
///
/// Excludes and the hidden-name rule prune directories as well as files;
/// the include pattern only narrows which files are reported.
#[derive(Debug, Clone)]
pub struct ScanFilter {
    include: Option<Pattern>,
    exclude: Vec<Pattern>,
    skip_hidden: bool,
}

impl Default for ScanFilter {
    fn default() -> Self {
        Self {
            include: None,
            exclude: Vec::new(),
            skip_hidden: true,
        }
    }
}

impl ScanFilter {
    /// Compile a filter from glob sources. An empty or `*` include matches
    /// every file.
    pub fn new(
        include: &str,
        exclude: &[String],
        skip_hidden: bool,
    ) -> Result<Self, MonitorError> {
        let include = match include {
            "" | "*" => None,
            pattern => Some(Pattern::new(pattern).map_err(|e| {
                MonitorError::ConfigError(format!("Invalid include pattern '{}': {}", pattern, e))
            })?),
        };
        let exclude = exclude
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|e| {
                    MonitorError::ConfigError(format!(
                        "Invalid exclude pattern '{}': {}",
                        pattern, e
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            include,
            exclude,
            skip_hidden,
        })
    }

    /// Whether a directory with this name should be descended into.
    pub fn allows_dir(&self, name: &str) -> bool {
        if self.skip_hidden && name.starts_with('.') {
            return false;
        }
        !self.exclude.iter().any(|pattern| pattern.matches(name))
    }

    /// Whether a file with this name should be reported.
    pub fn allows_file(&self, name: &str) -> bool {
        if !self.allows_dir(name) {
            return false;
        }
        match &self.include {
            Some(pattern) => pattern.matches(name),
            None => true,
        }
    }
}

/// Read access to the monitored server.
pub trait RemoteSource {
    /// Recursively list files under `root`, applying `filter` to every
    /// path component below it.
    fn list(&self, root: &str, filter: &ScanFilter) -> Result<Vec<RemoteFile>, MonitorError>;

    /// Read a file's full contents.
    fn read(&self, path: &str) -> Result<Vec<u8>, MonitorError>;

    /// Whether `path` exists and is a directory.
    fn is_dir(&self, path: &str) -> Result<bool, MonitorError>;
}

/// Join a remote directory and entry name without doubling separators.
pub(crate) fn join_remote(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name)
}
