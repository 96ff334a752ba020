//! Startup error taxonomy
//!
//! Only structural failures end up here. Per-file and per-request failures
//! are logged and turned into skipped cache entries or 404 responses.

use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DevServeError {
    /// The document root is missing, not a directory, or unreadable
    #[error("document root '{}' is not readable: {source}", path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid address '{0}'")]
    Address(String),

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DevServeError>;
