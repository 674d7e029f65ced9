//! The set of live source sessions.
//!
//! Owned by the server context and passed explicitly to the handlers —
//! not a process-wide singleton — so tests can build isolated instances.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tailview_core::{BufferConfig, CoreError, SourceRegistry};
use tracing::info;

use crate::session::SourceSession;

/// Maps source ids to their live sessions. At most one session exists
/// per id; sessions are created on first demand and persist until server
/// shutdown (the backing process keeps running across zero-subscriber
/// periods so the buffer stays continuous).
pub struct SessionRegistry {
    sources: Arc<SourceRegistry>,
    buffer: BufferConfig,
    sessions: Mutex<HashMap<String, Arc<SourceSession>>>,
    /// Set by `shutdown_all`; a closed registry spawns nothing.
    closed: AtomicBool,
}

impl SessionRegistry {
    pub fn new(sources: Arc<SourceRegistry>, buffer: BufferConfig) -> Self {
        Self {
            sources,
            buffer,
            sessions: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// The configured sources backing this registry.
    pub fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    /// Resolve the session for a source id, creating and starting it if
    /// this is the first demand. A request that races server shutdown is
    /// refused rather than allowed to respawn a process.
    pub fn get_or_start(&self, id: &str) -> Result<Arc<SourceSession>, CoreError> {
        let descriptor = self.sources.lookup(id)?.clone();
        if self.closed.load(Ordering::SeqCst) {
            return Err(CoreError::SessionStopped(descriptor.id));
        }
        let session = {
            let mut sessions = self.sessions.lock().unwrap();
            Arc::clone(
                sessions
                    .entry(descriptor.id.clone())
                    .or_insert_with(|| SourceSession::new(descriptor, self.buffer)),
            )
        };
        Arc::clone(&session).ensure_started();
        Ok(session)
    }

    /// The existing session for an id, if any. No side effects.
    pub fn get(&self, id: &str) -> Option<Arc<SourceSession>> {
        self.sessions.lock().unwrap().get(id).cloned()
    }

    /// Start every source configured as eager.
    pub fn start_eager(&self) {
        for descriptor in self.sources.iter().filter(|d| d.eager) {
            info!(source = %descriptor.id, "eager-starting source");
            // The id came from the registry itself, so this cannot fail.
            let _ = self.get_or_start(&descriptor.id);
        }
    }

    /// Terminate every session and wait for the child processes to be
    /// reaped. After this the registry is closed and no orphans remain.
    pub async fn shutdown_all(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let sessions: Vec<Arc<SourceSession>> = {
            let mut map = self.sessions.lock().unwrap();
            map.drain().map(|(_, session)| session).collect()
        };
        for session in sessions {
            session.shutdown().await;
        }
    }
}
