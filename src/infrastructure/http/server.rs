//! HTTP Server
//!
//! Axum HTTP 服务器启动和配置

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::middleware::error_logging_middleware;
use super::routes::create_routes;
use super::state::AppState;

/// 入站事件都是小 JSON
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// 服务器配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// HTTP 服务器
pub struct HttpServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl HttpServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    fn build_router(&self) -> Router {
        create_routes(self.state.clone())
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .layer(middleware::from_fn(error_logging_middleware))
            .layer(TraceLayer::new_for_http())
    }

    /// 启动服务器（带优雅关闭）
    pub async fn run_with_shutdown<F>(self, shutdown_signal: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();
        let addr = self.config.addr();

        let listener = TcpListener::bind(&addr).await?;
        info!(addr = %addr, "HTTP ingress listening (graceful shutdown enabled)");
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
    }
}
