use std::path::PathBuf;

use thiserror::Error;

/// Failure of the backing store underneath a [`Mailbox`](crate::mailbox::Mailbox).
///
/// The mailbox never surfaces these to its callers; they are logged and the
/// operation degrades to a no-op or an empty read.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on slot file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode slot: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to decode slot: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Fault reported by a registered listener while handling a delivery.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("listener rejected action: {0}")]
pub struct ListenerError(pub String);

impl ListenerError {
    /// Wraps a listener-specific message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
