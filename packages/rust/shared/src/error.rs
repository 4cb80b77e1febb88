//! Error types for AutoNiche.
//!
//! Library crates use [`AutoNicheError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all AutoNiche operations.
#[derive(Debug, thiserror::Error)]
pub enum AutoNicheError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to the knowledge graph or a social API.
    #[error("network error: {0}")]
    Network(String),

    /// Response body or content file could not be parsed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Persisted run state could not be read or written.
    #[error("state error: {0}")]
    State(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad template, invalid timezone, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The niche query returned nothing at all; the run cannot proceed.
    #[error("knowledge-graph query returned no candidates; refine the niche query")]
    NoCandidates,
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, AutoNicheError>;

impl AutoNicheError {
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

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = AutoNicheError::config("site.base_url is empty");
        assert_eq!(err.to_string(), "config error: site.base_url is empty");

        let err = AutoNicheError::validation("unknown timezone 'Mars/Base'");
        assert!(err.to_string().contains("Mars/Base"));
    }

    #[test]
    fn no_candidates_is_descriptive() {
        let err = AutoNicheError::NoCandidates;
        assert!(err.to_string().contains("no candidates"));
    }
}
