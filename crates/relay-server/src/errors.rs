//! Server error type.

use std::path::PathBuf;

/// Errors raised while configuring or starting the relay.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Socket or other I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        /// File that was being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid JSON for `ServerConfig`.
    #[error("failed to parse config {}: {source}", path.display())]
    ConfigParse {
        /// File that was being parsed.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// The metrics recorder could not be installed.
    #[error("metrics: {0}")]
    Metrics(String),
}
