//! WebSocket stream gateway.
//!
//! `GET /ws/{source_id}` upgrades to a WebSocket that first delivers the
//! buffered backlog as one `initial_logs` batch, then every live line as
//! an individual `new_log` message, until the client disconnects or the
//! server shuts down.
//!
//! ## Close codes (client contract)
//!
//! | Code | Meaning | Client policy |
//! |---|---|---|
//! | 4401 | authentication failed or expired | re-authenticate, reconnect |
//! | 4404 | unknown source id | do not retry |
//! | 1001 | server shutting down | reconnect with backoff |

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tailview_runtime::{ClientMessage, SessionEvent, StreamMessage};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use crate::auth::{TokenStatus, token_from_headers};
use crate::state::AppState;

/// Authentication failure; distinct from every other close so clients
/// can trigger a re-login instead of a blind reconnect.
pub const CLOSE_AUTH_FAILURE: u16 = 4401;
/// The requested source id is not configured.
pub const CLOSE_UNKNOWN_SOURCE: u16 = 4404;
/// Server shutdown (standard "going away").
pub const CLOSE_GOING_AWAY: u16 = 1001;

/// `GET /ws/{source_id}` — WebSocket upgrade endpoint.
///
/// The token is read from the upgrade request (cookie or bearer header),
/// but the verdict is delivered *after* the upgrade: a custom close code
/// is the only vehicle the browser WebSocket API exposes to scripts.
pub async fn stream(
    ws: WebSocketUpgrade,
    Path(source_id): Path<String>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    let authenticated = token_from_headers(&headers)
        .is_some_and(|token| state.auth.validate(&token) == TokenStatus::Valid);
    ws.on_upgrade(move |socket| handle_stream(socket, source_id, state, authenticated))
}

async fn handle_stream(socket: WebSocket, source_id: String, state: AppState, authenticated: bool) {
    let (mut sender, mut receiver) = socket.split();

    if !authenticated {
        debug!(source = %source_id, "stream rejected: not authenticated");
        close(&mut sender, CLOSE_AUTH_FAILURE, "authentication required").await;
        return;
    }

    let session = match state.sessions.get_or_start(&source_id) {
        Ok(session) => session,
        Err(e) => {
            let _ = sender
                .send(text(StreamMessage::Error {
                    message: e.to_string(),
                }))
                .await;
            let (code, reason) = match e {
                tailview_core::CoreError::SourceNotFound(_) => {
                    (CLOSE_UNKNOWN_SOURCE, "unknown source")
                }
                tailview_core::CoreError::SessionStopped(_) => {
                    (CLOSE_GOING_AWAY, "server shutting down")
                }
            };
            close(&mut sender, code, reason).await;
            return;
        }
    };

    // Backlog snapshot and live handle are taken atomically: nothing can
    // be appended between them, so the batch plus the per-line stream is
    // gapless and duplicate-free.
    let (backlog, mut events) = session.subscribe();
    info!(source = %source_id, backlog = backlog.len(), "stream subscriber connected");

    if sender
        .send(text(StreamMessage::InitialLogs { logs: backlog }))
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(SessionEvent::Line(log)) => {
                    if sender.send(text(StreamMessage::NewLog { log })).await.is_err() {
                        break;
                    }
                }
                Ok(SessionEvent::Error(message)) => {
                    // Crash notification; the session will relaunch, so
                    // the connection stays open.
                    if sender.send(text(StreamMessage::Error { message })).await.is_err() {
                        break;
                    }
                }
                Ok(SessionEvent::Closed) => {
                    close(&mut sender, CLOSE_GOING_AWAY, "server shutting down").await;
                    break;
                }
                Err(RecvError::Lagged(missed)) => {
                    // This subscriber fell behind and lost its oldest
                    // undelivered lines; tell it about the gap and move on.
                    let message = format!("client too slow: {missed} lines dropped");
                    if sender.send(text(StreamMessage::Error { message })).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(raw))) => {
                    if let Ok(ClientMessage::Ping) = serde_json::from_str(&raw) {
                        if sender.send(text(StreamMessage::Pong)).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
    }

    debug!(source = %source_id, "stream subscriber disconnected");
    // Dropping `events` is the unsubscribe.
}

fn text(message: StreamMessage) -> Message {
    Message::Text(message.to_json().into())
}

async fn close(sender: &mut SplitSink<WebSocket, Message>, code: u16, reason: &'static str) {
    let _ = sender
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await;
}
