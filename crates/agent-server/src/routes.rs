use crate::error::ApiError;
use crate::state::AppState;
use agent_analytics::{Fleet, FleetStats};
use agent_core::scanner::ListOptions;
use agent_core::types::SessionSummary;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Run a synchronous store operation off the async workers.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> agent_core::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}

// ── Health ──────────────────────────────────────────────────────────────

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ── Sessions ────────────────────────────────────────────────────────────

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/{id}", get(get_session))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    /// Recency window in minutes.
    minutes: Option<u64>,
    include_deleted: Option<bool>,
}

#[derive(Debug, Serialize)]
struct SessionListResponse {
    count: usize,
    sessions: Vec<SessionSummary>,
}

async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<SessionListResponse>, ApiError> {
    let logs = &state.config.logs;
    let options = ListOptions::new(
        query.minutes.unwrap_or(logs.window_minutes),
        query.include_deleted.unwrap_or(logs.include_deleted),
    );

    let store = state.store.clone();
    let listing = blocking(move || store.list(&options)).await?;

    Ok(Json(SessionListResponse {
        count: listing.sessions.len(),
        sessions: listing.sessions,
    }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSummary>, ApiError> {
    let store = state.store.clone();
    let summary = blocking(move || store.get(&id)).await?;
    Ok(Json(summary))
}

// ── Stats ───────────────────────────────────────────────────────────────

pub fn stats_routes() -> Router<AppState> {
    Router::new().route("/api/stats", get(get_stats))
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    #[serde(flatten)]
    stats: FleetStats,
    timestamp: DateTime<Utc>,
}

async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let store = state.store.clone();
    let stats = blocking(move || Fleet::from_store(&store).map(|f| f.stats())).await?;
    Ok(Json(StatsResponse {
        stats,
        timestamp: Utc::now(),
    }))
}
