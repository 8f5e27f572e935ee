//! Worker Layer - Background Event Processing
//!
//! 实现 EventWorker，处理聊天消息、成员变化和节点事件

mod event_worker;

pub use event_worker::{EventEnvelope, EventHandlers, EventWorker, EventWorkerConfig, InboundEvent};
