//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 兼容变量 `DISCORD_TOKEN` / `LAVALINK_PASSWORD` / `PREFIX` / `PORT`
//! 2. 环境变量（前缀 `GUILDTUNE_`）
//! 3. 配置文件（config.toml）
//! 4. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 不带前缀的兼容环境变量
#[derive(Debug, Clone, Default)]
pub struct BareEnv {
    pub discord_token: Option<String>,
    pub lavalink_password: Option<String>,
    pub prefix: Option<String>,
    pub port: Option<String>,
}

impl BareEnv {
    /// 从进程环境读取，空值视为未设置
    pub fn from_process() -> Self {
        let read = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            discord_token: read("DISCORD_TOKEN"),
            lavalink_password: read("LAVALINK_PASSWORD"),
            prefix: read("PREFIX"),
            port: read("PORT"),
        }
    }
}

/// 加载应用配置
///
/// # 环境变量示例
/// - `GUILDTUNE_SERVER__PORT=8080`
/// - `GUILDTUNE_AUDIO_NODE__URL=http://lavalink:2333`
/// - `GUILDTUNE_SELECTION__TTL_SECS=120`
/// - `DISCORD_TOKEN=...`（等价于 `GUILDTUNE_DISCORD__TOKEN`）
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_with(None, BareEnv::from_process())
}

fn load_config_with(config_path: Option<&Path>, bare: BareEnv) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 3000)?
        .set_default("server.ingress_token", "")?
        .set_default("bot.prefix", "!")?
        .set_default("discord.token", "")?
        .set_default("discord.api_base", "https://discord.com/api/v10")?
        .set_default("audio_node.url", "http://localhost:2333")?
        .set_default("audio_node.password", "")?
        .set_default("audio_node.timeout_secs", 10)?
        .set_default("audio_node.search_prefix", "ytsearch")?
        .set_default("selection.ttl_secs", 300)?
        .set_default("selection.sweep_interval_secs", 60)?
        .set_default("selection.max_candidates", 10)?
        .set_default("worker.queue_capacity", 1024)?
        .set_default("worker.max_concurrent", 64)?
        .set_default("worker.lane_capacity", 256)?
        .set_default("worker.lane_idle_secs", 60)?
        .set_default("log.level", "info")?;

    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 层级分隔符为 __，例如 GUILDTUNE_AUDIO_NODE__PASSWORD
    builder = builder
        .add_source(
            Environment::with_prefix("GUILDTUNE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .set_override_option("discord.token", bare.discord_token)?
        .set_override_option("audio_node.password", bare.lavalink_password)?
        .set_override_option("bot.prefix", bare.prefix)?
        .set_override_option("server.port", bare.port)?;

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    let invalid = |msg: &str| Err(ConfigError::ValidationError(msg.to_string()));

    if config.server.port == 0 {
        return invalid("Server port cannot be 0");
    }
    if config.server.ingress_token.trim().is_empty() {
        return invalid("Ingress token is required (GUILDTUNE_SERVER__INGRESS_TOKEN)");
    }
    if config.discord.token.trim().is_empty() {
        return invalid("Discord token is required (DISCORD_TOKEN)");
    }
    if config.audio_node.password.trim().is_empty() {
        return invalid("Audio node password is required (LAVALINK_PASSWORD)");
    }
    if config.audio_node.url.trim().is_empty() {
        return invalid("Audio node URL cannot be empty");
    }
    if config.audio_node.timeout_secs == 0 {
        return invalid("Audio node timeout cannot be 0");
    }
    if config.bot.prefix.trim().is_empty() {
        return invalid("Command prefix cannot be empty");
    }
    if config.selection.ttl_secs == 0 {
        return invalid("Selection TTL cannot be 0");
    }
    if config.selection.max_candidates == 0 {
        return invalid("Selection max_candidates cannot be 0");
    }
    if config.worker.queue_capacity == 0 {
        return invalid("Worker queue capacity cannot be 0");
    }
    if config.worker.lane_capacity == 0 {
        return invalid("Worker lane capacity cannot be 0");
    }

    Ok(())
}

/// 只保留首尾字符
fn mask(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let first: String = secret.chars().take(2).collect();
    let last: String = secret.chars().skip(count - 2).collect();
    format!("{}***{}", first, last)
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}", config.server.addr());
    tracing::info!("Ingress Token: {}", mask(&config.server.ingress_token));
    tracing::info!("Command Prefix: {}", config.bot.prefix);
    tracing::info!("Discord API: {}", config.discord.api_base);
    tracing::info!("Discord Token: {}", mask(&config.discord.token));
    tracing::info!("Audio Node URL: {}", config.audio_node.url);
    tracing::info!("Audio Node Password: {}", mask(&config.audio_node.password));
    tracing::info!("Audio Node Timeout: {}s", config.audio_node.timeout_secs);
    tracing::info!("Search Prefix: {}", config.audio_node.search_prefix);
    tracing::info!(
        "Selection TTL: {}s (sweep every {}s, max {} candidates)",
        config.selection.ttl_secs,
        config.selection.sweep_interval_secs,
        config.selection.max_candidates
    );
    tracing::info!(
        "Worker: queue {} / concurrency {} / per-guild backlog {}",
        config.worker.queue_capacity,
        config.worker.max_concurrent,
        config.worker.lane_capacity
    );
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}
