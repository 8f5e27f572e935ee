//! Ping Handler
//!
//! 存活检查

use axum::Json;
use serde::Serialize;

/// Ping 响应
#[derive(Serialize)]
pub struct PingResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// 根路径存活检查（纯文本）
pub async fn liveness() -> &'static str {
    "Bot is running."
}

/// Ping endpoint - 健康检查
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
