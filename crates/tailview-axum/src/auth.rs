//! Shared-password session gate.
//!
//! One configured password for all clients; a successful login mints an
//! opaque session token with an absolute expiry, stored server-side.
//! Tokens travel in the `session_token` cookie — usable by the browser's
//! WebSocket handshake, where custom headers are not available — or in an
//! `Authorization: Bearer` header for non-browser clients.

use std::collections::HashMap;
use std::sync::Mutex;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Duration, Utc};
use tailview_core::SecurityConfig;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::HttpError;
use crate::state::AppState;

/// Name of the session cookie set by login.
pub const SESSION_COOKIE: &str = "session_token";

/// Login failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
}

/// Verdict for a presented token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Valid,
    /// Was issued here, but its expiry has passed.
    Expired,
    /// Never issued, or already logged out.
    Unknown,
}

/// Validates the shared password and tracks issued session tokens.
pub struct AuthGate {
    password: String,
    ttl: Duration,
    tokens: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl AuthGate {
    pub fn new(config: &SecurityConfig) -> Self {
        let hours = i64::try_from(config.session_expire_hours).unwrap_or(i64::MAX);
        Self {
            password: config.password.clone(),
            ttl: Duration::try_hours(hours).unwrap_or(Duration::MAX),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Check the password and mint a session token valid for the
    /// configured number of hours. Expired tokens are purged here so the
    /// store cannot grow without bound.
    pub fn login(&self, password: &str) -> Result<String, AuthError> {
        if password != self.password {
            warn!("login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        let token = uuid::Uuid::new_v4().to_string();
        let mut tokens = self.tokens.lock().unwrap();
        tokens.retain(|_, expires_at| *expires_at > now);
        tokens.insert(token.clone(), now + self.ttl);
        debug!(active_tokens = tokens.len(), "session token issued");
        Ok(token)
    }

    /// Validate a presented token. An expired token is removed on
    /// observation and reported as such, distinct from a token that was
    /// never issued.
    pub fn validate(&self, token: &str) -> TokenStatus {
        let mut tokens = self.tokens.lock().unwrap();
        match tokens.get(token) {
            None => TokenStatus::Unknown,
            Some(expires_at) if *expires_at <= Utc::now() => {
                tokens.remove(token);
                TokenStatus::Expired
            }
            Some(_) => TokenStatus::Valid,
        }
    }

    /// Invalidate a token immediately, regardless of remaining expiry.
    /// Idempotent.
    pub fn logout(&self, token: &str) {
        self.tokens.lock().unwrap().remove(token);
    }

    /// Remaining lifetime granted to new tokens.
    pub fn session_ttl(&self) -> Duration {
        self.ttl
    }

    #[cfg(test)]
    fn insert_with_expiry(&self, token: &str, expires_at: DateTime<Utc>) {
        self.tokens
            .lock()
            .unwrap()
            .insert(token.to_string(), expires_at);
    }
}

/// Extract the session token from a request: `Authorization: Bearer`
/// first (non-browser clients), then the session cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(auth) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        if let Some(token) = auth.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }

    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

/// `Set-Cookie` value for a freshly issued token.
pub fn session_cookie(token: &str, ttl: Duration) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        ttl.num_seconds()
    )
}

/// `Set-Cookie` value that clears the session cookie.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Middleware guarding the `/api` routes (login and logout excepted).
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, HttpError> {
    let status = token_from_headers(request.headers()).map(|token| state.auth.validate(&token));
    match status {
        Some(TokenStatus::Valid) => Ok(next.run(request).await),
        Some(TokenStatus::Expired) => {
            Err(HttpError::Unauthorized("session expired".to_string()))
        }
        Some(TokenStatus::Unknown) | None => {
            debug!(path = %request.uri().path(), "unauthorized request");
            Err(HttpError::Unauthorized("authentication required".to_string()))
        }
    }
}
