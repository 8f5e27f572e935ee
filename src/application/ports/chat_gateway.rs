//! Chat Gateway Port - 聊天网关抽象
//!
//! 入站事件（消息、语音成员变更）由网关中继投递；
//! 出站只有两个操作：发送消息、查询成员所在语音频道

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::playback::{ChannelId, GuildId, MessageId, UserId};

/// 聊天网关错误
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Gateway rejected request: {0}")]
    Rejected(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// 入站聊天消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// 私信没有 guild
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub author_id: UserId,
    pub text: String,
    /// 机器人等自动化账号
    #[serde(default)]
    pub is_automated: bool,
    #[serde(default = "Utc::now")]
    pub sent_at: DateTime<Utc>,
}

/// 语音频道中的成员
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceMember {
    pub user_id: UserId,
    #[serde(default)]
    pub is_automated: bool,
}

/// 语音频道成员变更
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipChange {
    pub guild_id: GuildId,
    pub voice_channel_id: ChannelId,
    /// 变更后的完整成员列表
    pub members: Vec<VoiceMember>,
}

impl MembershipChange {
    /// 非自动化成员数量
    pub fn human_count(&self) -> usize {
        self.members.iter().filter(|m| !m.is_automated).count()
    }
}

/// Chat Gateway Port
#[async_trait]
pub trait ChatGatewayPort: Send + Sync {
    /// 发送消息，返回消息 ID
    async fn send_message(&self, channel_id: ChannelId, text: &str) -> Result<MessageId, GatewayError>;

    /// 查询成员当前所在语音频道
    async fn voice_channel_of(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<Option<ChannelId>, GatewayError>;
}
