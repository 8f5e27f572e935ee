//! HTTP Middleware
//!
//! - 按状态码记录异常请求
//! - 入口共享密钥校验

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use http::header::AUTHORIZATION;
use std::sync::Arc;
use std::time::Instant;

use super::error::ApiError;
use super::state::AppState;

/// 4xx 记 warn，5xx 记 error
///
/// 业务错误（errno != 0）在 ApiError::into_response() 中记录
pub async fn error_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    if status.is_server_error() {
        tracing::error!(method = %method, uri = %uri, status = status.as_u16(), elapsed_ms = elapsed_ms, "HTTP server error");
    } else if status.is_client_error() {
        tracing::warn!(method = %method, uri = %uri, status = status.as_u16(), elapsed_ms = elapsed_ms, "HTTP client error");
    }

    response
}

/// 要求 `Authorization: Bearer <ingress_token>`
pub async fn require_ingress_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .unwrap_or_default();

    if !state.accepts_token(presented.trim()) {
        return Err(ApiError::Unauthorized(format!(
            "Missing or invalid ingress token for {}",
            request.uri().path()
        )));
    }

    Ok(next.run(request).await)
}
