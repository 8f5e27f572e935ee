//! Command Handlers 实现
//!
//! 聊天命令、成员变化与节点事件的处理器

mod node_event_handler;
mod playback_handlers;
mod presence_handler;

pub use node_event_handler::NodeEventHandler;
pub use playback_handlers::*;
pub use presence_handler::PresenceHandler;
