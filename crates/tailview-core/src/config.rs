//! YAML configuration loading and validation.
//!
//! The config file is loaded once at startup and validated before the
//! server binds. There is deliberately no fallback config: the shared
//! password has no safe default value, so a missing file is fatal.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::source::SourceDescriptor;

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Listen address for the HTTP server.
    #[serde(default)]
    pub server: ServerConfig,
    /// Configured log sources.
    pub sources: Vec<SourceDescriptor>,
    /// Per-source buffer bounds.
    #[serde(default)]
    pub logging: BufferConfig,
    /// Shared password and token expiry.
    pub security: SecurityConfig,
}

/// HTTP listen configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Bounds for each source's in-memory line buffer.
///
/// When an append would push the buffer past `max_lines_per_source`, it is
/// trimmed down to exactly `cleanup_threshold` most-recent lines. The gap
/// between the two values controls how often trimming runs.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BufferConfig {
    #[serde(default = "default_max_lines")]
    pub max_lines_per_source: usize,
    #[serde(default = "default_cleanup_threshold")]
    pub cleanup_threshold: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            max_lines_per_source: default_max_lines(),
            cleanup_threshold: default_cleanup_threshold(),
        }
    }
}

/// Shared-secret gate configuration. One password for all clients; no
/// per-user identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecurityConfig {
    pub password: String,
    #[serde(default = "default_expire_hours")]
    pub session_expire_hours: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

const fn default_max_lines() -> usize {
    10_000
}

const fn default_cleanup_threshold() -> usize {
    5_000
}

const fn default_expire_hours() -> u64 {
    24
}

impl AppConfig {
    /// Load and validate the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self =
            serde_yaml::from_str(&text).map_err(|source| ConfigError::Malformed {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field invariants the type system cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.id.is_empty() {
                return Err(ConfigError::Invalid("source with empty id".to_string()));
            }
            if !seen.insert(source.id.as_str()) {
                return Err(ConfigError::DuplicateSource(source.id.clone()));
            }
            if source.name.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "source {}: empty name",
                    source.id
                )));
            }
            if source.command.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "source {}: empty command",
                    source.id
                )));
            }
        }

        if self.logging.cleanup_threshold == 0 {
            return Err(ConfigError::Invalid(
                "logging.cleanup_threshold must be at least 1".to_string(),
            ));
        }
        if self.logging.cleanup_threshold > self.logging.max_lines_per_source {
            return Err(ConfigError::Invalid(format!(
                "logging.cleanup_threshold ({}) exceeds max_lines_per_source ({})",
                self.logging.cleanup_threshold, self.logging.max_lines_per_source
            )));
        }

        if self.security.password.is_empty() {
            return Err(ConfigError::Invalid(
                "security.password must not be empty".to_string(),
            ));
        }
        if self.security.session_expire_hours == 0 {
            return Err(ConfigError::Invalid(
                "security.session_expire_hours must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
