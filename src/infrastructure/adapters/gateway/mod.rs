//! Chat Gateway Adapter - 聊天网关客户端实现

mod http_chat_gateway;
mod recording_gateway;

pub use http_chat_gateway::{HttpChatGateway, HttpChatGatewayConfig};
pub use recording_gateway::{RecordingGateway, SentMessage};
