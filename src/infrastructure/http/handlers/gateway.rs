//! Gateway Ingress Handlers
//!
//! 网关中继投递的聊天消息与语音成员变化

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use std::sync::Arc;

use crate::application::ports::{InboundMessage, MembershipChange};
use crate::infrastructure::http::dto::{AcceptedResponse, ApiResponse};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;
use crate::infrastructure::worker::InboundEvent;

pub async fn gateway_message(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<InboundMessage>, JsonRejection>,
) -> Result<Json<ApiResponse<AcceptedResponse>>, ApiError> {
    let Json(message) = payload?;
    let event_id = state.enqueue(InboundEvent::Message(message))?;
    Ok(Json(ApiResponse::success(AcceptedResponse { event_id })))
}

pub async fn gateway_voice(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MembershipChange>, JsonRejection>,
) -> Result<Json<ApiResponse<AcceptedResponse>>, ApiError> {
    let Json(change) = payload?;
    let event_id = state.enqueue(InboundEvent::Membership(change))?;
    Ok(Json(ApiResponse::success(AcceptedResponse { event_id })))
}
