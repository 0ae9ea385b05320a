//! SFTP-backed remote source.
//!
//! One connection per monitor cycle: connect, authenticate, walk, read,
//! drop. libssh2 sessions do not survive long idle periods on shared
//! hosting, so nothing here tries to keep a session alive between cycles.

use super::{join_remote, RemoteFile, RemoteSource, ScanFilter};
use crate::config::ServerConfig;
use crate::error::MonitorError;
use ssh2::{DisconnectCode, Session, Sftp};
use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Live SFTP session against the monitored server.
pub struct SftpSource {
    session: Session,
    sftp: Sftp,
}

impl SftpSource {
    /// Connect and authenticate.
    ///
    /// Password auth is tried when a password is configured, key auth
    /// otherwise. Both missing is a configuration error.
    pub fn connect(config: &ServerConfig) -> Result<Self, MonitorError> {
        let addr = (config.host.as_str(), config.port)
            .to_socket_addrs()
            .map_err(|e| {
                MonitorError::TransportError(format!(
                    "Failed to resolve {}:{}: {}",
                    config.host, config.port, e
                ))
            })?
            .next()
            .ok_or_else(|| {
                MonitorError::TransportError(format!(
                    "No address found for {}:{}",
                    config.host, config.port
                ))
            })?;
        let timeout = Duration::from_secs(config.timeout_secs);
        let tcp = TcpStream::connect_timeout(&addr, timeout).map_err(|e| {
            MonitorError::TransportError(format!(
                "Failed to connect to {}:{}: {}",
                config.host, config.port, e
            ))
        })?;

        let mut session = Session::new().map_err(|e| {
            MonitorError::TransportError(format!("Failed to create SSH session: {}", e))
        })?;
        session.set_tcp_stream(tcp);
        session.set_timeout(timeout.as_millis() as u32);
        session.handshake().map_err(|e| {
            MonitorError::TransportError(format!(
                "SSH handshake with {} failed: {}",
                config.host, e
            ))
        })?;

        if let Some(password) = &config.password {
            session
                .userauth_password(&config.username, password)
                .map_err(|e| {
                    MonitorError::TransportError(format!(
                        "Password authentication for {} failed: {}",
                        config.username, e
                    ))
                })?;
        } else if let Some(key_file) = &config.key_file {
            session
                .userauth_pubkey_file(&config.username, None, key_file, None)
                .map_err(|e| {
                    MonitorError::TransportError(format!(
                        "Key authentication with {} failed: {}",
                        key_file.display(),
                        e
                    ))
                })?;
        } else {
            return Err(MonitorError::ConfigError(
                "No password or key file configured for the remote server".to_string(),
            ));
        }
        if !session.authenticated() {
            return Err(MonitorError::TransportError(format!(
                "Authentication for {}@{} did not complete",
                config.username, config.host
            )));
        }

        let sftp = session.sftp().map_err(|e| {
            MonitorError::TransportError(format!("Failed to open SFTP channel: {}", e))
        })?;

        info!(host = %config.host, port = config.port, user = %config.username, "Connected to remote server");
        Ok(Self { session, sftp })
    }

    /// Walk a directory, descending into allowed subdirectories.
    ///
    /// Listing failures below the root are logged and the subtree skipped;
    /// a dead subdirectory must not take the whole cycle down.
    fn walk(&self, dir: &str, filter: &ScanFilter, out: &mut Vec<RemoteFile>) {
        match self.sftp.readdir(Path::new(dir)) {
            Ok(entries) => self.collect_entries(dir, entries, filter, out),
            Err(e) => {
                warn!(path = %dir, error = %e, "Failed to list remote directory, skipping");
            }
        }
    }

    fn collect_entries(
        &self,
        dir: &str,
        entries: Vec<(std::path::PathBuf, ssh2::FileStat)>,
        filter: &ScanFilter,
        out: &mut Vec<RemoteFile>,
    ) {
        for (entry_path, stat) in entries {
            let Some(name) = entry_path.file_name().and_then(|n| n.to_str()) else {
                warn!(path = %entry_path.display(), "Skipping entry with non-UTF-8 name");
                continue;
            };
            let full = join_remote(dir, name);
            if stat.is_dir() {
                if filter.allows_dir(name) {
                    self.walk(&full, filter, out);
                }
            } else if filter.allows_file(name) {
                out.push(RemoteFile {
                    path: full,
                    size: stat.size.unwrap_or(0),
                    mtime: stat.mtime,
                });
            }
        }
    }
}

impl RemoteSource for SftpSource {
    fn list(&self, root: &str, filter: &ScanFilter) -> Result<Vec<RemoteFile>, MonitorError> {
        // An unlistable root means a wrong path or dead connection; an
        // empty result must never be mistaken for "everything deleted".
        let entries = self.sftp.readdir(Path::new(root)).map_err(|e| {
            MonitorError::TransportError(format!("Failed to list {}: {}", root, e))
        })?;

        let mut files = Vec::new();
        self.collect_entries(root, entries, filter, &mut files);
        files.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(root = %root, files = files.len(), "Remote listing complete");
        Ok(files)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, MonitorError> {
        let mut file = self.sftp.open(Path::new(path)).map_err(|e| {
            MonitorError::TransportError(format!("Failed to open {}: {}", path, e))
        })?;
        let mut content = Vec::new();
        file.read_to_end(&mut content).map_err(|e| {
            MonitorError::TransportError(format!("Failed to read {}: {}", path, e))
        })?;
        Ok(content)
    }

    fn is_dir(&self, path: &str) -> Result<bool, MonitorError> {
        let stat = self.sftp.stat(Path::new(path)).map_err(|e| {
            MonitorError::TransportError(format!("Failed to stat {}: {}", path, e))
        })?;
        Ok(stat.is_dir())
    }
}

impl Drop for SftpSource {
    fn drop(&mut self) {
        let _ = self
            .session
            .disconnect(Some(DisconnectCode::ByApplication), "cycle complete", None);
        debug!("Remote session closed");
    }
}
