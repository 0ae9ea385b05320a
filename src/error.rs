//! Error types for monitoring, persistence, and CLI operations.

use thiserror::Error;

/// Top-level error for monitor operations.
///
/// Configuration problems are fatal at startup; transport and history
/// failures are fatal for the cycle that hit them. Watch mode logs cycle
/// failures and keeps going.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Missing or invalid configuration detected before any remote work.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// SSH/SFTP failure while connecting to or reading from the server.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Snapshot history could not be read or written.
    #[error("History error: {0}")]
    HistoryError(String),

    /// A notification channel could not be built or reached.
    #[error("Notification error: {0}")]
    NotifyError(String),

    /// Local filesystem failure outside the history file.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON output could not be produced.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
