//! Fake Audio Node - 内存中的音频节点
//!
//! 不连接真实服务，记录所有调用，可注入搜索结果、失败与延迟。

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::application::ports::{AudioNodeError, AudioNodePort};
use crate::domain::playback::{ChannelId, GuildId, Track};

/// 可注入失败的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeOp {
    Search,
    Connect,
    Play,
    Skip,
    Pause,
    Destroy,
}

/// 一次节点调用的记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeCall {
    Search(String),
    Connect { guild_id: GuildId, voice_channel_id: ChannelId },
    Play { guild_id: GuildId, title: String },
    Skip { guild_id: GuildId, next: Option<String> },
    SetPaused { guild_id: GuildId, paused: bool },
    Destroy { guild_id: GuildId },
}

impl NodeCall {
    pub fn op(&self) -> NodeOp {
        match self {
            NodeCall::Search(_) => NodeOp::Search,
            NodeCall::Connect { .. } => NodeOp::Connect,
            NodeCall::Play { .. } => NodeOp::Play,
            NodeCall::Skip { .. } => NodeOp::Skip,
            NodeCall::SetPaused { .. } => NodeOp::Pause,
            NodeCall::Destroy { .. } => NodeOp::Destroy,
        }
    }
}

/// Fake Audio Node
///
/// 未注入结果的查询返回一条由查询生成的曲目
pub struct FakeAudioNode {
    ready: AtomicBool,
    delay: Option<Duration>,
    results: Mutex<HashMap<String, Vec<Track>>>,
    failing: Mutex<HashSet<NodeOp>>,
    calls: Mutex<Vec<NodeCall>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FakeAudioNode {
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(true),
            delay: None,
            results: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 每次调用前等待固定时间
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// 为某个搜索标识注入结果（完整标识，含搜索前缀）
    pub fn set_results(&self, identifier: impl Into<String>, tracks: Vec<Track>) {
        locked(&self.results).insert(identifier.into(), tracks);
    }

    pub fn fail(&self, op: NodeOp) {
        locked(&self.failing).insert(op);
    }

    pub fn recover(&self, op: NodeOp) {
        locked(&self.failing).remove(&op);
    }

    pub fn calls(&self) -> Vec<NodeCall> {
        locked(&self.calls).clone()
    }

    pub fn count(&self, op: NodeOp) -> usize {
        locked(&self.calls).iter().filter(|c| c.op() == op).count()
    }

    async fn record(&self, call: NodeCall) -> Result<(), AudioNodeError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let op = call.op();
        tracing::debug!(call = ?call, "FakeAudioNode call");
        locked(&self.calls).push(call);

        if locked(&self.failing).contains(&op) {
            Err(AudioNodeError::NetworkError(format!("injected {:?} failure", op)))
        } else {
            Ok(())
        }
    }
}

impl Default for FakeAudioNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioNodePort for FakeAudioNode {
    async fn is_ready(&self) -> bool {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.ready.load(Ordering::SeqCst)
    }

    async fn search(&self, query: &str) -> Result<Vec<Track>, AudioNodeError> {
        self.record(NodeCall::Search(query.to_string())).await?;

        let injected = locked(&self.results).get(query).cloned();
        Ok(injected.unwrap_or_else(|| {
            let title = match query.split_once(':') {
                Some((_, rest)) if !query.contains("://") => rest,
                _ => query,
            };
            vec![Track::new(title, format!("fake:{}", query))]
        }))
    }

    async fn connect(&self, guild_id: GuildId, voice_channel_id: ChannelId) -> Result<(), AudioNodeError> {
        self.record(NodeCall::Connect { guild_id, voice_channel_id }).await
    }

    async fn play(&self, guild_id: GuildId, track: &Track) -> Result<(), AudioNodeError> {
        self.record(NodeCall::Play { guild_id, title: track.title.clone() }).await
    }

    async fn skip(&self, guild_id: GuildId, next: Option<&Track>) -> Result<(), AudioNodeError> {
        self.record(NodeCall::Skip {
            guild_id,
            next: next.map(|t| t.title.clone()),
        })
        .await
    }

    async fn set_paused(&self, guild_id: GuildId, paused: bool) -> Result<(), AudioNodeError> {
        self.record(NodeCall::SetPaused { guild_id, paused }).await
    }

    async fn destroy(&self, guild_id: GuildId) -> Result<(), AudioNodeError> {
        self.record(NodeCall::Destroy { guild_id }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_search_result() {
        let node = FakeAudioNode::new();
        let tracks = node.search("ytsearch:lofi beats").await.unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title, "lofi beats");
        assert_eq!(node.calls(), vec![NodeCall::Search("ytsearch:lofi beats".to_string())]);
    }

    #[tokio::test]
    async fn test_injected_failure_and_recover() {
        let node = FakeAudioNode::new();
        node.fail(NodeOp::Connect);
        assert!(node.connect(GuildId::new(1), ChannelId::new(2)).await.is_err());

        node.recover(NodeOp::Connect);
        assert!(node.connect(GuildId::new(1), ChannelId::new(2)).await.is_ok());
        assert_eq!(node.count(NodeOp::Connect), 2);
    }
}
