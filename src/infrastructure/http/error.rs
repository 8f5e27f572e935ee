//! HTTP Error Handling

use axum::{
    extract::rejection::JsonRejection,
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde::Serialize;

/// 统一错误响应格式
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errno: i32,
    pub error: String,
    pub data: Option<()>,
}

impl ErrorResponse {
    pub fn new(errno: i32, error: impl Into<String>) -> Self {
        Self {
            errno,
            error: error.into(),
            data: None,
        }
    }
}

/// 错误码定义
pub mod errno {
    pub const BAD_REQUEST: i32 = 400;
    pub const UNAUTHORIZED: i32 = 401;
    pub const SERVICE_UNAVAILABLE: i32 = 503;
}

/// API 错误
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    ServiceUnavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let response = match &self {
            ApiError::BadRequest(msg) => {
                tracing::warn!(errno = errno::BAD_REQUEST, error = %msg, "Bad request");
                ErrorResponse::new(errno::BAD_REQUEST, msg.clone())
            }
            ApiError::Unauthorized(msg) => {
                tracing::warn!(errno = errno::UNAUTHORIZED, error = %msg, "Unauthorized");
                ErrorResponse::new(errno::UNAUTHORIZED, msg.clone())
            }
            ApiError::ServiceUnavailable(msg) => {
                tracing::error!(errno = errno::SERVICE_UNAVAILABLE, error = %msg, "Service unavailable");
                ErrorResponse::new(errno::SERVICE_UNAVAILABLE, msg.clone())
            }
        };

        // 业务错误通过 errno 区分，HTTP 状态始终为 200
        (StatusCode::OK, Json(response)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
