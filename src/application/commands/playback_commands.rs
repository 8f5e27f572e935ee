//! Playback Commands - 播放相关命令

use crate::domain::playback::{ChannelId, GuildId, MessageId, Track, UserId};

/// 播放命令 - 搜索最佳结果并加入队列
#[derive(Debug, Clone)]
pub struct PlayCommand {
    pub guild_id: GuildId,
    pub text_channel_id: ChannelId,
    pub requester_id: UserId,
    pub query: String,
}

/// 加入队列后的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// 会话原本空闲，已开始播放
    Started,
    /// 已有曲目在播放，排在队列第 `position` 位
    Queued { position: usize },
}

/// 播放响应
#[derive(Debug, Clone)]
pub struct PlayResponse {
    pub track: Track,
    pub outcome: EnqueueOutcome,
    /// 本次命令是否新建了会话
    pub session_created: bool,
}

/// 搜索命令 - 列出候选等待选择
#[derive(Debug, Clone)]
pub struct SearchCommand {
    pub guild_id: GuildId,
    pub text_channel_id: ChannelId,
    pub requester_id: UserId,
    pub query: String,
}

/// 搜索响应（候选列表已发送）
#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub candidate_count: usize,
    pub prompt_message_id: MessageId,
}

/// 选择命令 - 用户回复数字
#[derive(Debug, Clone)]
pub struct SelectCommand {
    pub guild_id: GuildId,
    pub text_channel_id: ChannelId,
    pub requester_id: UserId,
    /// 1-based
    pub index: usize,
}

/// 查看队列
#[derive(Debug, Clone)]
pub struct ShowQueueCommand {
    pub guild_id: GuildId,
}

/// 队列视图
#[derive(Debug, Clone)]
pub struct QueueView {
    pub current: Option<Track>,
    pub upcoming: Vec<Track>,
    pub total: usize,
}

/// 跳过当前曲目
#[derive(Debug, Clone)]
pub struct SkipCommand {
    pub guild_id: GuildId,
}

/// 跳过响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipResponse {
    /// 已切换到下一首
    Advanced { next: Track },
    /// 没有下一首，会话已结束
    QueueEnded,
    /// 节点未能切换，会话已销毁
    Aborted,
}

/// 停止播放并销毁会话
#[derive(Debug, Clone)]
pub struct StopCommand {
    pub guild_id: GuildId,
}

/// 暂停 / 恢复
#[derive(Debug, Clone)]
pub struct SetPausedCommand {
    pub guild_id: GuildId,
    pub paused: bool,
}
