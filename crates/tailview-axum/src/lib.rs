//! Axum web adapter: the HTTP API, the WebSocket stream gateway, and the
//! session-token gate in front of both.

pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

// Re-export primary types
pub use auth::{AuthGate, SESSION_COOKIE, TokenStatus};
pub use bootstrap::{AppContext, CorsConfig, bootstrap, start_server};
pub use error::HttpError;
pub use routes::{create_router, create_spa_router};
pub use state::AppState;
