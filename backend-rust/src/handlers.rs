//! Shared state and HTTP read handlers.
//!
//! The snapshot store: single writer (the analyzer task), many readers
//! (the dashboard poll, monitoring). Publishing replaces the whole value
//! under the write lock, so a reader either sees the previous snapshot or
//! the new one — never a partial update.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::State;
use axum::Json;
use rssi_types::snapshot::Snapshot;
use serde_json::json;
use tokio::sync::RwLock;

pub type SharedSnapshot = Arc<RwLock<Snapshot>>;

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// `GET /snapshot` — the latest completed-window result. Never blocks on
/// an in-flight window; before the first window completes this serves the
/// sentinel snapshot.
pub async fn get_snapshot(State(published): State<SharedSnapshot>) -> Json<Snapshot> {
    Json(published.read().await.clone())
}

/// `GET /health` — liveness + wall clock for the dashboard.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "serverTime": now_ms() }))
}
