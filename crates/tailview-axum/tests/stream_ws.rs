//! Integration tests for the WebSocket stream gateway.

mod common;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

const RECV_TIMEOUT: Duration = Duration::from_secs(10);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(authority: &str, source: &str, token: Option<&str>) -> Socket {
    let mut request = format!("ws://{authority}/ws/{source}")
        .into_client_request()
        .unwrap();
    if let Some(token) = token {
        request.headers_mut().insert(
            "Cookie",
            format!("session_token={token}").parse().unwrap(),
        );
    }
    let (socket, _) = connect_async(request).await.expect("websocket connect");
    socket
}

async fn next_message(socket: &mut Socket) -> Message {
    tokio::time::timeout(RECV_TIMEOUT, socket.next())
        .await
        .expect("timed out waiting for websocket message")
        .expect("stream ended unexpectedly")
        .expect("websocket error")
}

fn parse(message: &Message) -> serde_json::Value {
    serde_json::from_str(message.to_text().expect("text frame")).expect("json payload")
}

#[tokio::test]
async fn unauthenticated_upgrade_closes_with_auth_code() {
    let authority = common::spawn_server().await;
    let mut socket = connect(&authority, "demo", None).await;

    match next_message(&mut socket).await {
        Message::Close(Some(frame)) => {
            let code: u16 = frame.code.into();
            assert_eq!(code, 4401);
        }
        other => panic!("expected auth close, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_source_gets_error_then_close() {
    let authority = common::spawn_server().await;
    let token = common::login(&authority).await;
    let mut socket = connect(&authority, "missing", Some(&token)).await;

    let first = next_message(&mut socket).await;
    let payload = parse(&first);
    assert_eq!(payload["type"], "error");
    assert!(
        payload["message"]
            .as_str()
            .unwrap()
            .contains("unknown source")
    );

    match next_message(&mut socket).await {
        Message::Close(Some(frame)) => {
            let code: u16 = frame.code.into();
            assert_eq!(code, 4404);
        }
        other => panic!("expected close, got {other:?}"),
    }
}

#[tokio::test]
async fn backlog_then_live_lines_without_gap_or_duplicate() {
    let authority = common::spawn_server().await;
    let token = common::login(&authority).await;
    let mut socket = connect(&authority, "demo", Some(&token)).await;

    // The first frame is always the backlog batch; depending on timing it
    // holds zero or more of the three lines, the rest arrive live. The
    // concatenation must be exact either way.
    let first = parse(&next_message(&mut socket).await);
    assert_eq!(first["type"], "initial_logs");
    let mut lines: Vec<String> = first["logs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();

    while lines.len() < 3 {
        let payload = parse(&next_message(&mut socket).await);
        match payload["type"].as_str().unwrap() {
            "new_log" => lines.push(payload["log"].as_str().unwrap().to_string()),
            // Crash notice once `seq` exits; not a line.
            "error" => {}
            other => panic!("unexpected message type {other}"),
        }
    }

    assert_eq!(lines, ["1", "2", "3"]);
}

#[tokio::test]
async fn ping_gets_pong() {
    let authority = common::spawn_server().await;
    let token = common::login(&authority).await;
    let mut socket = connect(&authority, "quiet", Some(&token)).await;

    let first = parse(&next_message(&mut socket).await);
    assert_eq!(first["type"], "initial_logs");
    assert_eq!(first["logs"], serde_json::json!([]));

    socket
        .send(Message::Text(r#"{"type":"ping"}"#.to_string()))
        .await
        .unwrap();

    let payload = parse(&next_message(&mut socket).await);
    assert_eq!(payload["type"], "pong");
}

#[tokio::test]
async fn second_subscriber_sees_buffered_backlog() {
    let authority = common::spawn_server().await;
    let token = common::login(&authority).await;

    // First subscriber starts the session and consumes all three lines.
    let mut first = connect(&authority, "demo", Some(&token)).await;
    let mut seen = parse(&next_message(&mut first).await)["logs"]
        .as_array()
        .unwrap()
        .len();
    while seen < 3 {
        let payload = parse(&next_message(&mut first).await);
        if payload["type"] == "new_log" {
            seen += 1;
        }
    }

    // A late subscriber gets those lines as backlog, not live. The
    // session may already be relaunching (seq exits immediately), so
    // assert on the prefix rather than the exact length.
    let mut second = connect(&authority, "demo", Some(&token)).await;
    let backlog = parse(&next_message(&mut second).await);
    assert_eq!(backlog["type"], "initial_logs");
    let logs = backlog["logs"].as_array().unwrap();
    assert!(logs.len() >= 3);
    assert_eq!(logs[0], "1");
    assert_eq!(logs[1], "2");
    assert_eq!(logs[2], "3");
}
