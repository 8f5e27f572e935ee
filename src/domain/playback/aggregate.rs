//! Playback Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ChannelId, GuildId, PlaybackError, Track, TrackQueue};

/// 会话状态
///
/// 转换表:
///
/// | 当前状态          | 操作             | 目标状态    |
/// |-------------------|------------------|-------------|
/// | Idle              | begin_connect    | Connecting  |
/// | Connecting        | start_playback   | Playing     |
/// | Playing / Paused  | advance          | Playing     |
/// | Playing           | pause            | Paused      |
/// | Paused            | resume           | Playing     |
/// | 非 Destroyed      | destroy          | Destroyed   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// 已存在但尚未连接语音
    Idle,
    /// 正在建立语音连接
    Connecting,
    /// 正在播放
    Playing,
    /// 已暂停
    Paused,
    /// 终态
    Destroyed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Playing => "playing",
            SessionState::Paused => "paused",
            SessionState::Destroyed => "destroyed",
        }
    }

    /// 是否持有当前曲目
    pub fn has_current_track(&self) -> bool {
        matches!(self, SessionState::Playing | SessionState::Paused)
    }
}

/// Session 聚合根 - 一个 guild 的播放上下文
///
/// 不变量:
/// - `current_track` 有值当且仅当状态为 Playing 或 Paused
/// - Destroyed 为终态，之后任何转换都会失败
#[derive(Debug, Clone)]
pub struct Session {
    guild_id: GuildId,
    state: SessionState,
    voice_channel_id: ChannelId,
    text_channel_id: ChannelId,
    queue: TrackQueue,
    current_track: Option<Track>,
    created_at: DateTime<Utc>,
}

impl Session {
    /// 创建新会话（Idle）
    pub fn new(guild_id: GuildId, voice_channel_id: ChannelId, text_channel_id: ChannelId) -> Self {
        Self {
            guild_id,
            state: SessionState::Idle,
            voice_channel_id,
            text_channel_id,
            queue: TrackQueue::new(),
            current_track: None,
            created_at: Utc::now(),
        }
    }

    /// Idle -> Connecting
    pub fn begin_connect(&mut self) -> Result<(), PlaybackError> {
        self.ensure(&[SessionState::Idle], "begin_connect")?;
        self.state = SessionState::Connecting;
        Ok(())
    }

    /// 追加曲目到队尾，返回队列长度
    pub fn enqueue(&mut self, track: Track) -> Result<usize, PlaybackError> {
        if self.state == SessionState::Destroyed {
            return Err(PlaybackError::Destroyed(self.guild_id));
        }
        Ok(self.queue.append(track))
    }

    /// 下一首（不出队）
    pub fn next_track(&self) -> Option<&Track> {
        self.queue.front()
    }

    /// 连接完成后开始播放队首: Connecting -> Playing
    ///
    /// 只应在音频节点确认 play 之后调用
    pub fn start_playback(&mut self) -> Result<&Track, PlaybackError> {
        self.ensure(&[SessionState::Connecting], "start_playback")?;
        self.take_next(SessionState::Playing)
    }

    /// 当前曲目结束或被跳过: Playing/Paused -> Playing
    ///
    /// 只应在音频节点确认切换之后调用
    pub fn advance(&mut self) -> Result<&Track, PlaybackError> {
        self.ensure(&[SessionState::Playing, SessionState::Paused], "advance")?;
        self.take_next(SessionState::Playing)
    }

    /// Playing -> Paused
    pub fn pause(&mut self) -> Result<(), PlaybackError> {
        self.ensure(&[SessionState::Playing], "pause")?;
        self.state = SessionState::Paused;
        Ok(())
    }

    /// Paused -> Playing
    pub fn resume(&mut self) -> Result<(), PlaybackError> {
        self.ensure(&[SessionState::Paused], "resume")?;
        self.state = SessionState::Playing;
        Ok(())
    }

    /// 任意非终态 -> Destroyed，释放队列与当前曲目
    pub fn destroy(&mut self) -> Result<(), PlaybackError> {
        if self.state == SessionState::Destroyed {
            return Err(PlaybackError::Destroyed(self.guild_id));
        }
        self.state = SessionState::Destroyed;
        self.queue.clear();
        self.current_track = None;
        Ok(())
    }

    /// 已连接但还没有在播放的曲目
    pub fn is_awaiting_playback(&self) -> bool {
        self.state == SessionState::Connecting
    }

    /// 即将播放的曲目（只读）
    pub fn upcoming(&self, limit: usize) -> Vec<&Track> {
        self.queue.peek_all(limit)
    }

    fn take_next(&mut self, to: SessionState) -> Result<&Track, PlaybackError> {
        let track = self
            .queue
            .pop_front()
            .ok_or(PlaybackError::EmptyQueue(self.guild_id))?;
        self.state = to;
        let current: &Track = self.current_track.insert(track);
        Ok(current)
    }

    fn ensure(&self, allowed: &[SessionState], action: &'static str) -> Result<(), PlaybackError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(PlaybackError::InvalidTransition {
                guild_id: self.guild_id,
                from: self.state,
                action,
            })
        }
    }

    // Getters
    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn voice_channel_id(&self) -> ChannelId {
        self.voice_channel_id
    }

    pub fn text_channel_id(&self) -> ChannelId {
        self.text_channel_id
    }

    pub fn queue(&self) -> &TrackQueue {
        &self.queue
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current_track.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
