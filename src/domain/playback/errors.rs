//! Playback Context - Errors

use thiserror::Error;

use super::{GuildId, SessionState};

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("非法的状态转换: {action} (当前状态: {from:?}, guild: {guild_id})")]
    InvalidTransition {
        guild_id: GuildId,
        from: SessionState,
        action: &'static str,
    },

    #[error("队列为空: guild {0}")]
    EmptyQueue(GuildId),

    #[error("会话已销毁: guild {0}")]
    Destroyed(GuildId),
}
