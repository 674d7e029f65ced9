//! Per-session fan-out of log lines to subscribers.

use std::sync::Mutex;

use tailview_core::BufferConfig;
use tokio::sync::broadcast;

use crate::buffer::LineBuffer;

/// Bounded per-subscriber queue. A subscriber that falls further behind
/// than this loses its oldest undelivered events (and only its own).
const SUBSCRIBER_QUEUE: usize = 1000;

/// One event fanned out to every subscriber of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A line produced by the source process.
    Line(String),
    /// The source process crashed or could not be launched. The session
    /// stays subscribed; the process will be relaunched.
    Error(String),
    /// The session is shutting down; no further events follow.
    Closed,
}

struct HubInner {
    buffer: LineBuffer,
    tx: broadcast::Sender<SessionEvent>,
}

/// Fan-out hub owning a session's buffer and its subscriber channel.
///
/// Buffer and sender sit behind one mutex: a subscriber's backlog
/// snapshot and its live-handle registration happen under the same lock
/// acquisition that `publish` needs to append, so no line can fall
/// between snapshot and live stream, and none is delivered twice across
/// that boundary.
pub struct BroadcastHub {
    inner: Mutex<HubInner>,
}

impl BroadcastHub {
    pub fn new(config: BufferConfig) -> Self {
        let (tx, _) = broadcast::channel(SUBSCRIBER_QUEUE);
        Self {
            inner: Mutex::new(HubInner {
                buffer: LineBuffer::new(config),
                tx,
            }),
        }
    }

    /// Append a line to the buffer and deliver it to every subscriber.
    ///
    /// Called only by the owning session's reader task. Never blocks: a
    /// send into the broadcast ring returns immediately whether or not
    /// any receiver keeps up, and a missing receiver is not an error.
    pub fn publish(&self, line: String) {
        let mut inner = self.inner.lock().unwrap();
        inner.buffer.push(line.clone());
        let _ = inner.tx.send(SessionEvent::Line(line));
    }

    /// Register a subscriber: the exact lines buffered at this moment
    /// plus a receiver that observes every event published afterwards.
    ///
    /// Unsubscribing is dropping the receiver; doing so repeatedly or
    /// concurrently with `publish` is harmless.
    pub fn subscribe(&self) -> (Vec<String>, broadcast::Receiver<SessionEvent>) {
        let inner = self.inner.lock().unwrap();
        (inner.buffer.snapshot(), inner.tx.subscribe())
    }

    /// Notify subscribers of a crash without touching the buffer.
    pub fn notify_error(&self, message: String) {
        let inner = self.inner.lock().unwrap();
        let _ = inner.tx.send(SessionEvent::Error(message));
    }

    /// Notify subscribers the session is gone for good.
    pub fn notify_closed(&self) {
        let inner = self.inner.lock().unwrap();
        let _ = inner.tx.send(SessionEvent::Closed);
    }

    /// The most recent `count` buffered lines.
    pub fn recent(&self, count: usize) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.buffer.recent(count)
    }

    pub fn subscriber_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.tx.receiver_count()
    }
}
