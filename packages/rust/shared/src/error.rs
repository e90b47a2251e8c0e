//! Error types for RosterLens.
//!
//! Library crates use [`RosterLensError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all RosterLens operations.
#[derive(Debug, thiserror::Error)]
pub enum RosterLensError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A request exceeded its time bound and was cancelled.
    #[error("timeout fetching {url}")]
    Timeout { url: String },

    /// A non-2xx HTTP response.
    #[error("{url}: HTTP {status}")]
    Status { url: String, status: u16 },

    /// Transport-level network failure (DNS, connection, body read).
    #[error("network error: {0}")]
    Network(String),

    /// HTML parsing or content extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A response parsed cleanly but contained no extractable records.
    #[error("no roster records found at {url}")]
    ParseEmpty { url: String },

    /// Discovery produced nothing to fetch, or every fetch failed.
    #[error("no candidates: {message}")]
    NoCandidates { message: String },

    /// Cache database error. Callers treat cache writes as best-effort.
    #[error("storage error: {0}")]
    Storage(String),

    /// A cached value failed to deserialize; the key has been evicted.
    #[error("corrupt cache entry for key {key}")]
    CacheCorrupt { key: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RosterLensError>;

impl RosterLensError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a no-candidates error from any displayable message.
    pub fn no_candidates(msg: impl Into<String>) -> Self {
        Self::NoCandidates {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for per-identifier failures the aggregator recovers from locally.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::Status { .. }
                | Self::Network(_)
                | Self::ParseEmpty { .. }
        )
    }
}
