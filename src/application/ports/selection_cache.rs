//! Selection Cache Port - 搜索候选缓存
//!
//! 以 (guild, 请求者) 为键缓存搜索候选，等待用户用数字回复选择

use chrono::{DateTime, Utc};

use crate::domain::playback::{GuildId, MessageId, Track, UserId};

/// 待选择的搜索结果
#[derive(Debug, Clone)]
pub struct PendingSelection {
    pub candidates: Vec<Track>,
    pub prompt_message_id: MessageId,
    pub created_at: DateTime<Utc>,
}

impl PendingSelection {
    pub fn new(candidates: Vec<Track>, prompt_message_id: MessageId) -> Self {
        Self {
            candidates,
            prompt_message_id,
            created_at: Utc::now(),
        }
    }

    /// 1-based 序号是否在范围内
    pub fn contains_index(&self, index: usize) -> bool {
        (1..=self.candidates.len()).contains(&index)
    }
}

/// Selection Cache Port
pub trait SelectionCachePort: Send + Sync {
    /// 记录（覆盖）搜索候选，超出上限的部分被截断
    fn record(
        &self,
        guild_id: GuildId,
        requester_id: UserId,
        candidates: Vec<Track>,
        prompt_message_id: MessageId,
    );

    /// 按 1-based 序号取出候选并删除该条目
    ///
    /// 没有条目、条目过期或序号越界时返回 None；越界不会删除条目
    fn resolve(&self, guild_id: GuildId, requester_id: UserId, index: usize) -> Option<Track>;

    /// 查看未过期的条目（不消费）
    fn pending(&self, guild_id: GuildId, requester_id: UserId) -> Option<PendingSelection>;

    /// 清理所有过期条目，返回清理数量
    fn sweep_expired(&self) -> usize;

    /// 当前条目数量
    fn len(&self) -> usize;
}
