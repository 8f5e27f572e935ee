//! Playback Context - Track Queue

use std::collections::VecDeque;

use super::Track;

/// 播放队列（FIFO）
///
/// 不变量:
/// - 队列顺序即插入顺序
/// - 只从队首移除（曲目结束 / 跳过），或整体清空（停止）
#[derive(Debug, Clone, Default)]
pub struct TrackQueue {
    tracks: VecDeque<Track>,
}

impl TrackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加到队尾，返回追加后的队列长度
    pub fn append(&mut self, track: Track) -> usize {
        self.tracks.push_back(track);
        self.tracks.len()
    }

    /// 取出队首；空队列返回 None
    pub fn pop_front(&mut self) -> Option<Track> {
        self.tracks.pop_front()
    }

    pub fn front(&self) -> Option<&Track> {
        self.tracks.front()
    }

    /// 按顺序查看前 `limit` 首（只读，用于展示）
    pub fn peek_all(&self, limit: usize) -> Vec<&Track> {
        self.tracks.iter().take(limit).collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }
}
