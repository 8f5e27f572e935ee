//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（AudioNode、ChatGateway、SessionRegistry、SelectionCache）
//! - commands: 命令及处理器
//! - dispatcher: 聊天消息分发
//! - error: 应用层错误定义

pub mod commands;
pub mod dispatcher;
pub mod error;
pub mod ports;
pub mod replies;

// Re-exports
pub use commands::handlers::{
    NodeEventHandler, PauseHandler, PlayHandler, PresenceHandler, QueueHandler, SearchHandler,
    SelectHandler, SkipHandler, StopHandler,
};
pub use dispatcher::{CommandDispatcher, DispatcherConfig};
pub use error::CommandError;
pub use ports::{
    AudioNodeError, AudioNodePort, ChatGatewayPort, EndReason, GatewayError, GuildLane, InboundMessage,
    MembershipChange, NodeEvent, PendingSelection, SelectionCachePort, SessionRegistryPort,
    VoiceMember,
};
