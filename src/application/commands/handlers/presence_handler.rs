//! Presence Handler - 语音频道成员变化

use std::sync::Arc;

use crate::application::ports::{AudioNodePort, ChatGatewayPort, MembershipChange, SessionRegistryPort};
use crate::application::replies;

/// 语音频道空了（只剩自动化账号）就结束该 guild 的会话
pub struct PresenceHandler {
    registry: Arc<dyn SessionRegistryPort>,
    node: Arc<dyn AudioNodePort>,
    gateway: Arc<dyn ChatGatewayPort>,
}

impl PresenceHandler {
    pub fn new(
        registry: Arc<dyn SessionRegistryPort>,
        node: Arc<dyn AudioNodePort>,
        gateway: Arc<dyn ChatGatewayPort>,
    ) -> Self {
        Self {
            registry,
            node,
            gateway,
        }
    }

    /// 返回会话是否因此被销毁
    pub async fn handle(&self, change: MembershipChange) -> bool {
        let mut lane = self.registry.lane(change.guild_id).await;

        let text_channel_id = match lane.session() {
            Some(session) if session.voice_channel_id() == change.voice_channel_id => {
                session.text_channel_id()
            }
            _ => return false,
        };

        let humans = change.human_count();
        if humans > 0 {
            tracing::debug!(
                guild_id = %change.guild_id,
                voice_channel_id = %change.voice_channel_id,
                humans = humans,
                "Voice channel still occupied"
            );
            return false;
        }

        if let Err(e) = self.node.destroy(change.guild_id).await {
            tracing::warn!(guild_id = %change.guild_id, error = %e, "Failed to destroy node player");
        }
        lane.destroy("voice channel empty");
        drop(lane);

        if let Err(e) = self.gateway.send_message(text_channel_id, replies::CHANNEL_EMPTY).await {
            tracing::warn!(guild_id = %change.guild_id, error = %e, "Failed to send reply");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::handlers::test_support::*;
    use crate::application::commands::PlayCommand;
    use crate::application::ports::VoiceMember;
    use crate::domain::playback::{ChannelId, UserId};
    use crate::infrastructure::adapters::NodeOp;

    fn change(voice_channel_id: ChannelId, members: Vec<VoiceMember>) -> MembershipChange {
        MembershipChange {
            guild_id: GUILD,
            voice_channel_id,
            members,
        }
    }

    fn bot() -> VoiceMember {
        VoiceMember { user_id: UserId::new(999), is_automated: true }
    }

    async fn start_session(fx: &Fixture) {
        fx.play_handler()
            .handle(PlayCommand {
                guild_id: GUILD,
                text_channel_id: TEXT,
                requester_id: USER,
                query: "lofi".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_channel_destroys_session() {
        let fx = Fixture::new();
        start_session(&fx).await;

        assert!(fx.presence_handler().handle(change(VOICE, vec![bot()])).await);
        assert!(fx.registry.snapshot(GUILD).await.is_none());
        assert_eq!(fx.node.count(NodeOp::Destroy), 1);
        assert_eq!(fx.gateway.sent_to(TEXT).last().map(String::as_str), Some(replies::CHANNEL_EMPTY));
    }

    #[tokio::test]
    async fn test_occupied_channel_keeps_session() {
        let fx = Fixture::new();
        start_session(&fx).await;

        let members = vec![bot(), VoiceMember { user_id: USER, is_automated: false }];
        assert!(!fx.presence_handler().handle(change(VOICE, members)).await);
        assert!(fx.registry.snapshot(GUILD).await.is_some());
        assert_eq!(fx.node.count(NodeOp::Destroy), 0);
    }

    #[tokio::test]
    async fn test_other_channel_is_ignored() {
        let fx = Fixture::new();
        start_session(&fx).await;

        assert!(!fx.presence_handler().handle(change(ChannelId::new(777), vec![])).await);
        assert!(fx.registry.snapshot(GUILD).await.is_some());
    }

    #[tokio::test]
    async fn test_no_session_is_noop() {
        let fx = Fixture::new();
        assert!(!fx.presence_handler().handle(change(VOICE, vec![])).await);
        assert!(fx.node.calls().is_empty());
        assert!(fx.gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn test_node_failure_still_destroys() {
        let fx = Fixture::new();
        start_session(&fx).await;
        fx.node.fail(NodeOp::Destroy);

        assert!(fx.presence_handler().handle(change(VOICE, vec![])).await);
        assert!(fx.registry.snapshot(GUILD).await.is_none());
    }
}
