//! Error types for the Bad Bot agent.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-time failure. Any of these keeps the block list from being built.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid CIDR '{entry}': {reason}")]
    InvalidCidr { entry: String, reason: String },

    #[error("Invalid signature '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON list in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}: {source}", .path.display())]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<ConfigError>,
    },
}

impl ConfigError {
    pub(crate) fn cidr(entry: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidCidr {
            entry: entry.to_string(),
            reason: reason.into(),
        }
    }

    /// Attach the list file an entry came from.
    pub(crate) fn in_file(self, path: &std::path::Path) -> Self {
        ConfigError::InFile {
            path: path.to_path_buf(),
            source: Box::new(self),
        }
    }
}
