//! Audio Node Port - 远程音频节点抽象
//!
//! 音频节点负责曲库搜索与实际的音频推流，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::playback::{ChannelId, GuildId, Track};

/// 音频节点错误
#[derive(Debug, Error)]
pub enum AudioNodeError {
    #[error("Audio node not ready")]
    NotReady,

    #[error("Request timeout")]
    Timeout,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Node rejected request: {0}")]
    Rejected(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl AudioNodeError {
    /// 节点不可达一类的错误（而非请求本身有问题）
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            AudioNodeError::NotReady | AudioNodeError::Timeout | AudioNodeError::NetworkError(_)
        )
    }
}

/// 曲目结束原因
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// 正常播放完毕
    #[default]
    Finished,
    /// 加载失败
    #[serde(alias = "loadFailed")]
    LoadFailed,
    /// 被 stop / destroy 停止
    Stopped,
    /// 被 skip 或新的 play 替换
    Replaced,
    /// 播放器被回收
    Cleanup,
}

impl EndReason {
    /// 只有自然结束才应推进队列
    pub fn may_start_next(&self) -> bool {
        matches!(self, EndReason::Finished | EndReason::LoadFailed)
    }
}

/// 音频节点上报的播放事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeEvent {
    /// 曲目开始播放
    TrackStarted { guild_id: GuildId, track: Track },
    /// 曲目结束，`track` 为结束的那一首
    TrackEnded {
        guild_id: GuildId,
        track: Track,
        #[serde(default)]
        reason: EndReason,
    },
    /// 节点侧队列播放完毕
    QueueEnded { guild_id: GuildId },
}

impl NodeEvent {
    pub fn guild_id(&self) -> GuildId {
        match self {
            NodeEvent::TrackStarted { guild_id, .. }
            | NodeEvent::TrackEnded { guild_id, .. }
            | NodeEvent::QueueEnded { guild_id } => *guild_id,
        }
    }
}

/// Audio Node Port
///
/// 外部音频节点的控制接口。所有会话状态由核心持有，节点只执行命令。
#[async_trait]
pub trait AudioNodePort: Send + Sync {
    /// 节点是否可用
    async fn is_ready(&self) -> bool;

    /// 搜索曲目（可能返回空列表）
    async fn search(&self, query: &str) -> Result<Vec<Track>, AudioNodeError>;

    /// 加入语音频道
    async fn connect(&self, guild_id: GuildId, voice_channel_id: ChannelId) -> Result<(), AudioNodeError>;

    /// 播放曲目
    async fn play(&self, guild_id: GuildId, track: &Track) -> Result<(), AudioNodeError>;

    /// 停止当前曲目并切换到 `next`（None 表示之后没有曲目）
    async fn skip(&self, guild_id: GuildId, next: Option<&Track>) -> Result<(), AudioNodeError>;

    /// 暂停 / 恢复
    async fn set_paused(&self, guild_id: GuildId, paused: bool) -> Result<(), AudioNodeError>;

    /// 销毁播放器并离开语音频道
    async fn destroy(&self, guild_id: GuildId) -> Result<(), AudioNodeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_event_wire_format() {
        let event: NodeEvent =
            serde_json::from_str(r#"{"type":"queue_ended","guild_id":"42"}"#).unwrap();
        assert_eq!(event, NodeEvent::QueueEnded { guild_id: GuildId::new(42) });

        let event: NodeEvent = serde_json::from_str(
            r#"{"type":"track_started","guild_id":"7","track":{"title":"Song","play_spec":"QA"}}"#,
        )
        .unwrap();
        assert_eq!(event.guild_id(), GuildId::new(7));
    }

    #[test]
    fn test_track_ended_reason() {
        let event: NodeEvent = serde_json::from_str(
            r#"{"type":"track_ended","guild_id":"7","track":{"title":"Song","play_spec":"QA"}}"#,
        )
        .unwrap();
        assert!(matches!(event, NodeEvent::TrackEnded { reason: EndReason::Finished, .. }));

        let event: NodeEvent = serde_json::from_str(
            r#"{"type":"track_ended","guild_id":"7","track":{"title":"Song","play_spec":"QA"},"reason":"replaced"}"#,
        )
        .unwrap();
        match event {
            NodeEvent::TrackEnded { reason, .. } => {
                assert_eq!(reason, EndReason::Replaced);
                assert!(!reason.may_start_next());
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(EndReason::LoadFailed.may_start_next());
    }

    #[test]
    fn test_unavailable_classification() {
        assert!(AudioNodeError::Timeout.is_unavailable());
        assert!(AudioNodeError::NetworkError("refused".into()).is_unavailable());
        assert!(!AudioNodeError::Rejected("bad track".into()).is_unavailable());
    }
}
