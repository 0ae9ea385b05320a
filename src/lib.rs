//! Driftwatch: Remote File-Change Monitoring
//!
//! Lists a directory tree on a remote server over SFTP, diffs the listing
//! against a persisted snapshot, and fans out notifications when files are
//! added, modified, or deleted.

pub mod config;
pub mod diff;
pub mod error;
pub mod hasher;
pub mod history;
pub mod logging;
pub mod monitor;
pub mod notify;
pub mod remote;
pub mod retry;
pub mod textscan;
pub mod tooling;
