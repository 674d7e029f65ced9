//! Source discovery and recent-log handlers.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use tailview_core::{SourceKind, SourceSummary};
use tailview_runtime::SessionState;

use crate::error::HttpError;
use crate::state::AppState;

/// `GET /api/sources` — discovery mapping of every configured source.
pub async fn list(State(state): State<AppState>) -> Json<BTreeMap<String, SourceSummary>> {
    Json(state.sources.list())
}

/// Full descriptor plus runtime information for one source.
#[derive(Debug, Serialize)]
pub struct SourceDetail {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub command: String,
    pub working_dir: String,
    pub description: String,
    /// Subscribers currently attached to the stream.
    pub active_connections: usize,
    pub state: SessionState,
}

/// `GET /api/sources/{id}` — descriptor and runtime state.
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SourceDetail>, HttpError> {
    let descriptor = state.sources.lookup(&id)?.clone();
    let (active_connections, session_state) = state
        .sessions
        .get(&id)
        .map_or((0, SessionState::Idle), |session| {
            (session.subscriber_count(), session.state())
        });

    Ok(Json(SourceDetail {
        id: descriptor.id,
        name: descriptor.name,
        kind: descriptor.kind,
        command: descriptor.command,
        working_dir: descriptor.working_dir,
        description: descriptor.description,
        active_connections,
        state: session_state,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_count")]
    pub count: usize,
}

const fn default_count() -> usize {
    100
}

#[derive(Debug, Serialize)]
pub struct RecentLogs {
    pub source_id: String,
    pub logs: Vec<String>,
    pub count: usize,
}

/// `GET /api/sources/{id}/recent?count=N` — the most recent buffered
/// lines, in production order. A configured source with no running
/// session yields an empty list; starting the process is the stream
/// endpoint's job.
pub async fn recent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<RecentLogs>, HttpError> {
    state.sources.lookup(&id)?;
    let logs = state
        .sessions
        .get(&id)
        .map(|session| session.recent(query.count))
        .unwrap_or_default();

    Ok(Json(RecentLogs {
        source_id: id,
        count: logs.len(),
        logs,
    }))
}
