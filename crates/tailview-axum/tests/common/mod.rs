//! Shared test harness: an ephemeral-port server over a synthetic config.

use tailview_axum::bootstrap::{CorsConfig, bootstrap};
use tailview_axum::routes::create_router;
use tailview_core::{
    AppConfig, BufferConfig, SecurityConfig, ServerConfig, SourceDescriptor, SourceKind,
};

pub const PASSWORD: &str = "hunter2";

fn source(id: &str, command: &str) -> SourceDescriptor {
    SourceDescriptor {
        id: id.to_string(),
        name: format!("Source {id}"),
        kind: SourceKind::ProcessGroupLogs,
        command: command.to_string(),
        working_dir: "/".to_string(),
        description: format!("test source {id}"),
        eager: false,
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        sources: vec![
            // Finite output: exercises backlog/live handoff.
            source("demo", "seq 1 3"),
            // No output: exercises empty backlog and ping/pong.
            source("quiet", "sleep 30"),
        ],
        logging: BufferConfig {
            max_lines_per_source: 100,
            cleanup_threshold: 50,
        },
        security: SecurityConfig {
            password: PASSWORD.to_string(),
            session_expire_hours: 1,
        },
    }
}

/// Spawn a server on an ephemeral port; returns its authority
/// (`host:port`).
pub async fn spawn_server() -> String {
    let ctx = bootstrap(&test_config());
    let app = create_router(ctx, &CorsConfig::AllowAll);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server runs");
    });
    format!("127.0.0.1:{}", addr.port())
}

/// Log in with the shared password and return the raw session token.
pub async fn login(authority: &str) -> String {
    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{authority}/api/login"))
        .json(&serde_json::json!({ "password": PASSWORD }))
        .send()
        .await
        .expect("login request");
    assert!(response.status().is_success());

    let set_cookie = response
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .expect("login sets session cookie")
        .to_str()
        .expect("cookie is ascii");
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix("session_token="))
        .expect("session_token cookie")
        .to_string()
}
