//! Read-only HTTP snapshot routes

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use super::AppState;

/// `GET /api/polls`: every poll, oldest first
pub async fn list_polls(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.coordinator.polls())
}

/// `GET /api/students`: current roster
pub async fn list_students(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.coordinator.students())
}

/// `GET /api/chat`: chat transcript
pub async fn chat_history(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.coordinator.chat())
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.coordinator.stats();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptimeSeconds": state.started_at.elapsed().as_secs(),
        "connections": stats.connections,
        "participants": stats.participants,
        "students": stats.students,
        "polls": stats.polls,
        "activePollId": stats.active_poll,
    }))
}
