//! Domain types for tailview: configuration, source descriptors, and the
//! core error taxonomy.
//!
//! This crate performs no IO beyond reading the configuration file. The
//! streaming engine lives in `tailview-runtime`; the web adapter in
//! `tailview-axum`.

pub mod config;
pub mod error;
pub mod source;

pub use config::{AppConfig, BufferConfig, SecurityConfig, ServerConfig};
pub use error::{ConfigError, CoreError};
pub use source::{SourceDescriptor, SourceKind, SourceRegistry, SourceSummary};
