//! Timeout Audio Node - 为每次节点调用加上时限
//!
//! 包装任意 AudioNodePort，超时统一映射为 `AudioNodeError::Timeout`，
//! 避免一次卡住的调用长期占用 guild 执行通道。

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{AudioNodeError, AudioNodePort};
use crate::domain::playback::{ChannelId, GuildId, Track};

pub struct TimeoutAudioNode {
    inner: Arc<dyn AudioNodePort>,
    timeout: Duration,
}

impl TimeoutAudioNode {
    pub fn new(inner: Arc<dyn AudioNodePort>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, AudioNodeError>>,
    ) -> Result<T, AudioNodeError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    operation = operation,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Audio node call timed out"
                );
                Err(AudioNodeError::Timeout)
            }
        }
    }
}

#[async_trait]
impl AudioNodePort for TimeoutAudioNode {
    async fn is_ready(&self) -> bool {
        self.bounded("is_ready", async { Ok(self.inner.is_ready().await) })
            .await
            .unwrap_or(false)
    }

    async fn search(&self, query: &str) -> Result<Vec<Track>, AudioNodeError> {
        self.bounded("search", self.inner.search(query)).await
    }

    async fn connect(&self, guild_id: GuildId, voice_channel_id: ChannelId) -> Result<(), AudioNodeError> {
        self.bounded("connect", self.inner.connect(guild_id, voice_channel_id))
            .await
    }

    async fn play(&self, guild_id: GuildId, track: &Track) -> Result<(), AudioNodeError> {
        self.bounded("play", self.inner.play(guild_id, track)).await
    }

    async fn skip(&self, guild_id: GuildId, next: Option<&Track>) -> Result<(), AudioNodeError> {
        self.bounded("skip", self.inner.skip(guild_id, next)).await
    }

    async fn set_paused(&self, guild_id: GuildId, paused: bool) -> Result<(), AudioNodeError> {
        self.bounded("set_paused", self.inner.set_paused(guild_id, paused))
            .await
    }

    async fn destroy(&self, guild_id: GuildId) -> Result<(), AudioNodeError> {
        self.bounded("destroy", self.inner.destroy(guild_id)).await
    }
}
