//! HTTP Layer - 事件入口
//!
//! 网关中继与音频节点通过 HTTP 投递事件；处理在 EventWorker 中异步完成

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use routes::create_routes;
pub use server::{HttpServer, ServerConfig};
pub use state::AppState;
