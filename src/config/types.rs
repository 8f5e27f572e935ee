//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::time::Duration;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// HTTP 入口配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 命令配置
    #[serde(default)]
    pub bot: BotConfig,

    /// 聊天网关配置
    #[serde(default)]
    pub discord: DiscordConfig,

    /// 音频节点配置
    #[serde(default)]
    pub audio_node: AudioNodeConfig,

    /// 搜索候选配置
    #[serde(default)]
    pub selection: SelectionConfig,

    /// 事件 Worker 配置
    #[serde(default)]
    pub worker: WorkerConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// 入口共享密钥，网关中继与音频节点以 `Authorization: Bearer <token>` 携带（必填）
    #[serde(default)]
    pub ingress_token: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            ingress_token: String::new(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 命令配置
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// 命令前缀
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

fn default_prefix() -> String {
    "!".to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
        }
    }
}

/// 聊天网关配置
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    /// Bot token（必填）
    #[serde(default)]
    pub token: String,

    /// REST API 基础 URL
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base: default_api_base(),
        }
    }
}

/// 音频节点配置
#[derive(Debug, Clone, Deserialize)]
pub struct AudioNodeConfig {
    /// 节点 REST 基础 URL
    #[serde(default = "default_node_url")]
    pub url: String,

    /// 节点密码（必填）
    #[serde(default)]
    pub password: String,

    /// 单次调用超时（秒）
    #[serde(default = "default_node_timeout")]
    pub timeout_secs: u64,

    /// 非 URL 查询使用的搜索前缀
    #[serde(default = "default_search_prefix")]
    pub search_prefix: String,
}

fn default_node_url() -> String {
    "http://localhost:2333".to_string()
}

fn default_node_timeout() -> u64 {
    10
}

fn default_search_prefix() -> String {
    "ytsearch".to_string()
}

impl Default for AudioNodeConfig {
    fn default() -> Self {
        Self {
            url: default_node_url(),
            password: String::new(),
            timeout_secs: default_node_timeout(),
            search_prefix: default_search_prefix(),
        }
    }
}

impl AudioNodeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 搜索候选配置
#[derive(Debug, Clone, Deserialize)]
pub struct SelectionConfig {
    /// 候选有效期（秒）
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,

    /// 过期清理间隔（秒）
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// 最多展示的候选数
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
}

fn default_ttl() -> u64 {
    300
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_max_candidates() -> usize {
    10
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
            sweep_interval_secs: default_sweep_interval(),
            max_candidates: default_max_candidates(),
        }
    }
}

impl SelectionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// 事件 Worker 配置
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// 事件队列容量，满时入口返回 503
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// 同时处理的最大事件数
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// 单个 guild 可积压的事件数
    #[serde(default = "default_lane_capacity")]
    pub lane_capacity: usize,

    /// guild 执行通道空闲退出时间（秒）
    #[serde(default = "default_lane_idle")]
    pub lane_idle_secs: u64,
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_max_concurrent() -> usize {
    64
}

fn default_lane_capacity() -> usize {
    256
}

fn default_lane_idle() -> u64 {
    60
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            max_concurrent: default_max_concurrent(),
            lane_capacity: default_lane_capacity(),
            lane_idle_secs: default_lane_idle(),
        }
    }
}

impl WorkerConfig {
    pub fn lane_idle(&self) -> Duration {
        Duration::from_secs(self.lane_idle_secs.max(1))
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
