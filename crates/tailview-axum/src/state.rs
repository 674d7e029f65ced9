//! Shared application state type.

use crate::bootstrap::AppContext;
use std::sync::Arc;

/// Application state shared across all handlers: the source registry,
/// the live sessions, and the auth gate.
pub type AppState = Arc<AppContext>;
