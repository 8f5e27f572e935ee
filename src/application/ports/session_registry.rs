//! Session Registry Port - 会话注册表
//!
//! guild -> Session 的进程级映射。所有修改都必须先取得该 guild 的
//! 执行通道（[`GuildLane`]），不同 guild 之间互不阻塞。

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;

use crate::domain::playback::{ChannelId, GuildId, Session};

/// 单个 guild 的槽位
pub type GuildSlot = Option<Session>;

/// Guild 执行通道
///
/// 持有期间独占该 guild 的会话槽位，get-or-create 与后续修改
/// 在同一持有期内完成，因此同一 guild 至多构造一个 Session。
pub struct GuildLane {
    guild_id: GuildId,
    slot: OwnedMutexGuard<GuildSlot>,
}

impl GuildLane {
    pub fn new(guild_id: GuildId, slot: OwnedMutexGuard<GuildSlot>) -> Self {
        Self { guild_id, slot }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn session(&self) -> Option<&Session> {
        self.slot.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.slot.as_mut()
    }

    /// 返回已有会话，或构造一个处于 Connecting 的新会话
    ///
    /// 第二个返回值表示是否为新建
    pub fn get_or_create(
        &mut self,
        voice_channel_id: ChannelId,
        text_channel_id: ChannelId,
    ) -> (&mut Session, bool) {
        let created = self.slot.is_none();
        let guild_id = self.guild_id;
        let session = self.slot.get_or_insert_with(|| {
            let mut session = Session::new(guild_id, voice_channel_id, text_channel_id);
            // 新建会话一定处于 Idle
            let _ = session.begin_connect();
            session
        });

        if created {
            tracing::info!(
                guild_id = %guild_id,
                voice_channel_id = %voice_channel_id,
                text_channel_id = %text_channel_id,
                "Session created"
            );
        }
        (session, created)
    }

    /// 将会话转为 Destroyed 并移出注册表
    pub fn destroy(&mut self, reason: &str) -> Option<Session> {
        let mut session = self.slot.take()?;
        let _ = session.destroy();
        tracing::info!(guild_id = %self.guild_id, reason = %reason, "Session destroyed");
        Some(session)
    }
}

/// Session Registry Port
#[async_trait]
pub trait SessionRegistryPort: Send + Sync {
    /// 取得 guild 的执行通道（排队等待同一 guild 的其他持有者）
    async fn lane(&self, guild_id: GuildId) -> GuildLane;

    /// 会话快照（只读副本）
    async fn snapshot(&self, guild_id: GuildId) -> Option<Session>;

    /// 当前有活跃会话的 guild
    async fn active_guilds(&self) -> Vec<GuildId>;

    /// 清理空闲且无人持有的 guild 槽位，返回清理数量
    fn prune_idle(&self) -> usize;
}
