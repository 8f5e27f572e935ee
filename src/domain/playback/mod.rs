//! Playback Context - 播放限界上下文
//!
//! 职责:
//! - 曲目与播放队列
//! - 每个 guild 的会话状态机
//! - 平台标识（guild / channel / user / message）

mod aggregate;
mod errors;
mod queue;
mod value_objects;

pub use aggregate::{Session, SessionState};
pub use errors::PlaybackError;
pub use queue::TrackQueue;
pub use value_objects::{ChannelId, GuildId, MessageId, Track, UserId};
