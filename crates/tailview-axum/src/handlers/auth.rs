//! Login and logout handlers.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::auth::{clear_session_cookie, session_cookie, token_from_headers};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `POST /api/login` — check the shared password; on success set the
/// session cookie.
pub async fn login(State(state): State<AppState>, Json(body): Json<LoginRequest>) -> Response {
    match state.auth.login(&body.password) {
        Ok(token) => {
            let cookie = session_cookie(&token, state.auth.session_ttl());
            (
                [(header::SET_COOKIE, cookie)],
                Json(LoginResponse {
                    success: true,
                    message: None,
                }),
            )
                .into_response()
        }
        Err(e) => (
            StatusCode::UNAUTHORIZED,
            Json(LoginResponse {
                success: false,
                message: Some(e.to_string()),
            }),
        )
            .into_response(),
    }
}

/// `POST /api/logout` — invalidate the presented token (best effort; a
/// missing or already-dead token still gets a 200) and clear the cookie.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = token_from_headers(&headers) {
        state.auth.logout(&token);
    }
    (
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(serde_json::json!({ "success": true })),
    )
}
