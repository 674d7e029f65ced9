//! Core error taxonomy.
//!
//! `ConfigError` is fatal at startup: the process must not serve traffic
//! with a broken configuration. `CoreError` covers the recoverable,
//! per-request failures surfaced to clients by the web adapter.

use thiserror::Error;

/// Configuration failures. All of these abort startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid YAML or has the wrong shape.
    #[error("malformed config file {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// Two sources share the same identifier.
    #[error("duplicate source id: {0}")]
    DuplicateSource(String),

    /// A per-source or global field failed validation.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Recoverable errors surfaced to clients.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The requested source id is not configured.
    #[error("unknown source: {0}")]
    SourceNotFound(String),

    /// The session has been shut down and will not serve again.
    #[error("source {0} is stopped")]
    SessionStopped(String),
}
