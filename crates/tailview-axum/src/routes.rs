//! Route definitions and router construction.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};

use crate::auth::require_auth;
use crate::bootstrap::{AppContext, CorsConfig};
use crate::handlers;
use crate::state::AppState;

/// Build CORS layer from configuration.
fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    match config {
        CorsConfig::AllowAll => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        CorsConfig::AllowOrigins(origins) => {
            use axum::http::HeaderValue;
            let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}

/// All API routes without the `/api` prefix (for nesting under `/api`).
///
/// Everything except login and logout sits behind the session-token
/// middleware. The caller applies `.with_state()`.
pub(crate) fn api_routes(state: AppState) -> Router<AppState> {
    let auth_layer = middleware::from_fn_with_state(state, require_auth);
    Router::new()
        .route("/sources", get(handlers::sources::list))
        .route("/sources/{id}", get(handlers::sources::detail))
        .route("/sources/{id}/recent", get(handlers::sources::recent))
        .route_layer(auth_layer)
        // Open endpoints: you cannot authenticate through a gate that
        // requires authentication.
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout))
}

/// Create the main router: `/health`, `/ws/{source_id}`, and the `/api`
/// surface.
///
/// # Path Parameter Syntax
/// Axum 0.8 uses brace syntax for path parameters: `{source_id}`
pub fn create_router(ctx: AppContext, cors_config: &CorsConfig) -> Router {
    let state: AppState = Arc::new(ctx);
    let cors = build_cors_layer(cors_config);

    Router::new()
        .route("/health", get(health_check))
        .route("/ws/{source_id}", get(handlers::stream::stream))
        .nest("/api", api_routes(state.clone()).layer(cors))
        .with_state(state)
}

/// Create a router that also serves a built frontend.
///
/// Unmatched paths fall back to static assets from `static_dir`, and
/// missing files fall back to `index.html` for client-side routing. API
/// routes keep priority and still 404 on unknown API paths.
pub fn create_spa_router<P: AsRef<Path>>(
    ctx: AppContext,
    static_dir: P,
    cors_config: &CorsConfig,
) -> Router {
    let static_path = static_dir.as_ref();
    let index_path = static_path.join("index.html");
    let serve_dir = ServeDir::new(static_path).fallback(ServeFile::new(&index_path));

    create_router(ctx, cors_config).fallback_service(serve_dir)
}

/// Health check endpoint.
pub(crate) async fn health_check() -> &'static str {
    "OK"
}
