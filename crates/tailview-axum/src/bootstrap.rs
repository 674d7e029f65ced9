//! Server bootstrap - the composition root.
//!
//! This is the only place where the registry, sessions, and auth gate
//! are wired together. Handlers reach everything through [`AppContext`].

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tailview_core::{AppConfig, SourceRegistry};
use tailview_runtime::SessionRegistry;

use crate::auth::AuthGate;

/// CORS configuration for the web server.
#[derive(Debug, Clone, Default)]
pub enum CorsConfig {
    /// Allow all origins (development mode).
    #[default]
    AllowAll,
    /// Allow specific origins (production mode).
    AllowOrigins(Vec<String>),
}

/// Application context shared by all handlers.
pub struct AppContext {
    /// Configured sources, immutable after load.
    pub sources: Arc<SourceRegistry>,
    /// Live sessions, one per active source.
    pub sessions: Arc<SessionRegistry>,
    /// Shared-password session gate.
    pub auth: Arc<AuthGate>,
}

/// Wire up the application context from validated configuration and
/// start any eagerly-configured sources.
///
/// Must run inside a tokio runtime: eager sources spawn their supervisor
/// tasks here.
pub fn bootstrap(config: &AppConfig) -> AppContext {
    let sources = Arc::new(SourceRegistry::new(config.sources.clone()));
    let sessions = Arc::new(SessionRegistry::new(Arc::clone(&sources), config.logging));
    sessions.start_eager();
    let auth = Arc::new(AuthGate::new(&config.security));

    tracing::info!(
        sources = sources.len(),
        max_lines = config.logging.max_lines_per_source,
        cleanup_threshold = config.logging.cleanup_threshold,
        "tailview context initialized"
    );

    AppContext {
        sources,
        sessions,
        auth,
    }
}

/// Start the web server and run until ctrl-c.
///
/// On shutdown every source session is terminated first (subscribers
/// receive a close notification and their connections drain), then the
/// listener finishes its in-flight requests.
pub async fn start_server(
    config: AppConfig,
    static_dir: Option<PathBuf>,
    cors: &CorsConfig,
) -> Result<()> {
    use tokio::net::TcpListener;
    use tracing::info;

    let ctx = bootstrap(&config);
    let sessions = Arc::clone(&ctx.sessions);

    let app = if let Some(ref static_dir) = static_dir {
        info!("Serving static assets from: {}", static_dir.display());
        crate::routes::create_spa_router(ctx, static_dir, cors)
    } else {
        crate::routes::create_router(ctx, cors)
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("tailview listening on http://{}", addr);

    let shutdown = async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown requested; draining source sessions");
        sessions.shutdown_all().await;
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
