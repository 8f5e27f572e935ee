//! Session Query Handler

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::infrastructure::http::dto::{ApiResponse, SessionSummary};
use crate::infrastructure::http::state::AppState;

/// 列出所有活跃会话
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Vec<SessionSummary>>> {
    let mut sessions = Vec::new();
    for guild_id in state.registry.active_guilds().await {
        if let Some(session) = state.registry.snapshot(guild_id).await {
            sessions.push(SessionSummary::from(&session));
        }
    }
    Json(ApiResponse::success(sessions))
}
