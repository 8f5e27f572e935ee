//! Data Transfer Objects

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::playback::{ChannelId, GuildId, Session, SessionState};

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}

/// 事件已入队
#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub event_id: Uuid,
}

/// 会话概览
#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub guild_id: GuildId,
    pub state: SessionState,
    pub voice_channel_id: ChannelId,
    pub text_channel_id: ChannelId,
    pub current_title: Option<String>,
    pub queue_len: usize,
    pub created_at: DateTime<Utc>,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            guild_id: session.guild_id(),
            state: session.state(),
            voice_channel_id: session.voice_channel_id(),
            text_channel_id: session.text_channel_id(),
            current_title: session.current_track().map(|t| t.title.clone()),
            queue_len: session.queue().len(),
            created_at: session.created_at(),
        }
    }
}
