//! Configuration Module
//!
//! 提供应用配置管理功能，支持多层级配置来源：
//! - 兼容环境变量（DISCORD_TOKEN 等，最高优先级）
//! - 环境变量（GUILDTUNE_ 前缀）
//! - 配置文件（TOML 格式）
//! - 默认值（最低优先级）

mod loader;
mod types;

pub use loader::{load_config, print_config, BareEnv, ConfigError};
pub use types::{
    AppConfig, AudioNodeConfig, BotConfig, DiscordConfig, LogConfig, SelectionConfig, ServerConfig,
    WorkerConfig,
};
