//! Audio Node Event Handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use std::sync::Arc;

use crate::application::ports::NodeEvent;
use crate::infrastructure::http::dto::{AcceptedResponse, ApiResponse};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;
use crate::infrastructure::worker::InboundEvent;

/// 节点回调：`{"type": "track_started" | "track_ended" | "queue_ended", "guild_id": ...}`
///
/// `track_ended` 携带结束的曲目与原因（`finished` / `load_failed` / `stopped` / `replaced` / `cleanup`）
pub async fn node_event(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NodeEvent>, JsonRejection>,
) -> Result<Json<ApiResponse<AcceptedResponse>>, ApiError> {
    let Json(event) = payload?;
    let event_id = state.enqueue(InboundEvent::Node(event))?;
    Ok(Json(ApiResponse::success(AcceptedResponse { event_id })))
}
