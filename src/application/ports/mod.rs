//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_node;
mod chat_gateway;
mod selection_cache;
mod session_registry;

pub use audio_node::{AudioNodeError, AudioNodePort, EndReason, NodeEvent};
pub use chat_gateway::{ChatGatewayPort, GatewayError, InboundMessage, MembershipChange, VoiceMember};
pub use selection_cache::{PendingSelection, SelectionCachePort};
pub use session_registry::{GuildLane, GuildSlot, SessionRegistryPort};
