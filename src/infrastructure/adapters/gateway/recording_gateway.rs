//! Recording Gateway - 内存中的聊天网关
//!
//! 记录所有发出的消息，语音频道成员关系由调用方设置

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::application::ports::{ChatGatewayPort, GatewayError};
use crate::domain::playback::{ChannelId, GuildId, MessageId, UserId};

/// 已发送的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub message_id: MessageId,
    pub channel_id: ChannelId,
    pub text: String,
}

pub struct RecordingGateway {
    voice: Mutex<HashMap<(GuildId, UserId), ChannelId>>,
    sent: Mutex<Vec<SentMessage>>,
    next_id: AtomicU64,
    fail_sends: AtomicBool,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self {
            voice: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            fail_sends: AtomicBool::new(false),
        }
    }

    pub fn join_voice(&self, guild_id: GuildId, user_id: UserId, channel_id: ChannelId) {
        locked(&self.voice).insert((guild_id, user_id), channel_id);
    }

    pub fn leave_voice(&self, guild_id: GuildId, user_id: UserId) {
        locked(&self.voice).remove(&(guild_id, user_id));
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        locked(&self.sent).clone()
    }

    /// 发往某个频道的消息文本
    pub fn sent_to(&self, channel_id: ChannelId) -> Vec<String> {
        locked(&self.sent)
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .map(|m| m.text.clone())
            .collect()
    }

    pub fn last_text(&self) -> Option<String> {
        locked(&self.sent).last().map(|m| m.text.clone())
    }
}

impl Default for RecordingGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatGatewayPort for RecordingGateway {
    async fn send_message(&self, channel_id: ChannelId, text: &str) -> Result<MessageId, GatewayError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(GatewayError::NetworkError("sends disabled".to_string()));
        }

        let message_id = MessageId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        tracing::debug!(channel_id = %channel_id, message_id = %message_id, text = %text, "RecordingGateway: message sent");
        locked(&self.sent).push(SentMessage {
            message_id,
            channel_id,
            text: text.to_string(),
        });
        Ok(message_id)
    }

    async fn voice_channel_of(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<Option<ChannelId>, GatewayError> {
        Ok(locked(&self.voice).get(&(guild_id, user_id)).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_messages_with_distinct_ids() {
        let gateway = RecordingGateway::new();
        let a = gateway.send_message(ChannelId::new(1), "a").await.unwrap();
        let b = gateway.send_message(ChannelId::new(2), "b").await.unwrap();

        assert_ne!(a, b);
        assert_eq!(gateway.sent_to(ChannelId::new(1)), vec!["a".to_string()]);
        assert_eq!(gateway.last_text().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_voice_membership() {
        let gateway = RecordingGateway::new();
        let (guild, user) = (GuildId::new(1), UserId::new(2));
        assert_eq!(gateway.voice_channel_of(guild, user).await.unwrap(), None);

        gateway.join_voice(guild, user, ChannelId::new(3));
        assert_eq!(gateway.voice_channel_of(guild, user).await.unwrap(), Some(ChannelId::new(3)));
    }
}
