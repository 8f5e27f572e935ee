//! GuildTune - 多 guild 音乐播放会话服务
//!
//! 架构设计: DDD + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Playback Context: 会话状态机、FIFO 队列、曲目
//! - 聊天命令解析
//!
//! 应用层 (application/):
//! - Ports: AudioNode, ChatGateway, SessionRegistry, SelectionCache
//! - Commands: 播放命令处理器、成员变化与节点事件处理器
//! - Dispatcher: 聊天消息到命令的分发与回复
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: 事件入口（网关中继、节点回调）与会话查询
//! - Memory: SessionRegistry, SelectionCache 内存实现
//! - Worker: EventWorker 后台事件处理
//! - Adapters: 音频节点与聊天网关客户端

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
