//! Error types
//!
//! Only [`ConfigError`] is ever fatal, and only at startup. Transport and
//! platform errors are recovered where they occur and folded into a status.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no config file found (searched: {0})")]
    NotFound(String),

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("missing required config field: {0}")]
    MissingField(&'static str),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to write config {path}: {reason}")]
    Write { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{op} request to {url} failed: {source}")]
    Request {
        op: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("invalid header value for {0}")]
    InvalidHeader(&'static str),
}

impl TransportError {
    pub fn request(op: &'static str, url: &str, source: reqwest::Error) -> Self {
        Self::Request {
            op,
            url: url.to_string(),
            source,
        }
    }

    /// Short form for the status line, without the URL or the error chain.
    pub fn short(&self) -> String {
        match self {
            Self::Request { op, source, .. } if source.is_timeout() => format!("{op} timed out"),
            Self::Request { op, source, .. } if source.is_connect() => {
                format!("{op}: cannot reach portal")
            }
            Self::Request { op, .. } => format!("{op} failed"),
            Self::Build(_) | Self::InvalidHeader(_) => "HTTP client unavailable".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PlatformQueryError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} did not answer within {timeout:?}")]
    Timeout {
        command: &'static str,
        timeout: std::time::Duration,
    },

    #[error("network identity lookup is not supported on this platform")]
    Unsupported,
}
