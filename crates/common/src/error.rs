//! Unified error type for the surf-lamp service.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Provider answered with a non-2xx status or a body we cannot read.
    #[error("Upstream error from {source_name}: {message}")]
    Upstream { source_name: String, message: String },

    /// Provider did not answer within the configured bound.
    #[error("Upstream timeout from {source_name} after {after_ms}ms")]
    Timeout { source_name: String, after_ms: u64 },

    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn upstream(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Upstream {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}
