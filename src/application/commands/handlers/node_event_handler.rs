//! Node Event Handler - 音频节点播放事件

use std::sync::Arc;

use crate::application::error::CommandError;
use crate::application::ports::{
    AudioNodePort, ChatGatewayPort, EndReason, GuildLane, NodeEvent, SessionRegistryPort,
};
use crate::application::replies;
use crate::domain::playback::{ChannelId, GuildId, Track};

/// 处理节点上报的 TrackStarted / TrackEnded / QueueEnded
///
/// 与用户命令走同一条 guild 执行通道
pub struct NodeEventHandler {
    registry: Arc<dyn SessionRegistryPort>,
    node: Arc<dyn AudioNodePort>,
    gateway: Arc<dyn ChatGatewayPort>,
}

impl NodeEventHandler {
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

    pub async fn handle(&self, event: NodeEvent) -> Result<(), CommandError> {
        let guild_id = event.guild_id();
        let mut lane = self.registry.lane(guild_id).await;

        let text_channel_id = match lane.session() {
            Some(session) => session.text_channel_id(),
            None => {
                tracing::debug!(guild_id = %guild_id, event = ?event, "Node event for guild without session");
                return Ok(());
            }
        };

        let announcement = match event {
            NodeEvent::TrackStarted { track, .. } => {
                tracing::info!(guild_id = %guild_id, title = %track.title, "Track started");
                Some(replies::now_playing(&track))
            }
            NodeEvent::TrackEnded { track, reason, .. } => {
                if Self::ends_current(&lane, &track, reason) {
                    self.play_next(&mut lane).await?
                } else {
                    None
                }
            }
            NodeEvent::QueueEnded { .. } => {
                self.end_session(&mut lane, "queue ended").await;
                None
            }
        };
        drop(lane);

        if let Some(text) = announcement {
            self.announce(guild_id, text_channel_id, &text).await;
        }
        Ok(())
    }

    /// 只有当前曲目的自然结束才推进队列
    ///
    /// skip 已经在本地推进过，被替换曲目的结束事件、重复或迟到的事件都忽略
    fn ends_current(lane: &GuildLane, ended: &Track, reason: EndReason) -> bool {
        let guild_id = lane.guild_id();
        if !reason.may_start_next() {
            tracing::debug!(guild_id = %guild_id, title = %ended.title, reason = ?reason, "Track end does not advance queue");
            return false;
        }
        let current = lane.session().and_then(|s| s.current_track());
        match current {
            Some(current) if current.play_spec == ended.play_spec => true,
            _ => {
                tracing::debug!(
                    guild_id = %guild_id,
                    title = %ended.title,
                    current = ?current.map(|t| t.title.as_str()),
                    "Ignoring end event for a track that is not current"
                );
                false
            }
        }
    }

    /// 曲目自然结束：队列非空则播放下一首，否则结束会话
    async fn play_next(&self, lane: &mut GuildLane) -> Result<Option<String>, CommandError> {
        let guild_id = lane.guild_id();
        let next: Option<Track> = lane.session().and_then(|s| s.next_track().cloned());

        let next = match next {
            Some(next) => next,
            None => {
                self.end_session(lane, "queue ended").await;
                return Ok(None);
            }
        };

        if let Err(e) = self.node.play(guild_id, &next).await {
            tracing::error!(guild_id = %guild_id, title = %next.title, error = %e, "Failed to play next track");
            self.end_session(lane, "play failed").await;
            return Ok(Some(replies::PLAYBACK_FAILED.to_string()));
        }

        if let Some(session) = lane.session_mut() {
            session.advance()?;
            tracing::info!(guild_id = %guild_id, title = %next.title, "Advanced to next track");
        }
        Ok(None)
    }

    async fn end_session(&self, lane: &mut GuildLane, reason: &str) {
        let guild_id = lane.guild_id();
        if let Err(e) = self.node.destroy(guild_id).await {
            tracing::warn!(guild_id = %guild_id, error = %e, "Failed to destroy node player");
        }
        lane.destroy(reason);
    }

    async fn announce(&self, guild_id: GuildId, channel_id: ChannelId, text: &str) {
        if let Err(e) = self.gateway.send_message(channel_id, text).await {
            tracing::warn!(guild_id = %guild_id, error = %e, "Failed to send announcement");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::handlers::test_support::*;
    use crate::application::commands::{PlayCommand, SkipCommand};
    use crate::domain::playback::SessionState;
    use crate::infrastructure::adapters::NodeOp;

    async fn play(fx: &Fixture, query: &str) -> Track {
        fx.play_handler()
            .handle(PlayCommand {
                guild_id: GUILD,
                text_channel_id: TEXT,
                requester_id: USER,
                query: query.to_string(),
            })
            .await
            .unwrap()
            .track
    }

    fn ended(track: &Track) -> NodeEvent {
        NodeEvent::TrackEnded {
            guild_id: GUILD,
            track: track.clone(),
            reason: EndReason::Finished,
        }
    }

    #[tokio::test]
    async fn test_queue_end_destroys_session() {
        let fx = Fixture::new();
        play(&fx, "only").await;

        fx.node_event_handler()
            .handle(NodeEvent::QueueEnded { guild_id: GUILD })
            .await
            .unwrap();

        assert!(fx.registry.snapshot(GUILD).await.is_none());
        assert!(fx.registry.active_guilds().await.is_empty());
        assert_eq!(fx.node.count(NodeOp::Destroy), 1);
    }

    #[tokio::test]
    async fn test_track_end_advances_queue() {
        let fx = Fixture::new();
        let first = play(&fx, "first").await;
        let second = play(&fx, "second").await;

        fx.node_event_handler()
            .handle(ended(&first))
            .await
            .unwrap();

        let session = fx.registry.snapshot(GUILD).await.unwrap();
        assert_eq!(session.state(), SessionState::Playing);
        assert_eq!(session.current_track(), Some(&second));
        assert_eq!(fx.node.count(NodeOp::Play), 2);
    }

    #[tokio::test]
    async fn test_track_end_with_empty_queue_ends_session() {
        let fx = Fixture::new();
        let only = play(&fx, "only").await;

        fx.node_event_handler()
            .handle(ended(&only))
            .await
            .unwrap();
        assert!(fx.registry.snapshot(GUILD).await.is_none());
    }

    #[tokio::test]
    async fn test_track_end_play_failure_destroys() {
        let fx = Fixture::new();
        let first = play(&fx, "first").await;
        play(&fx, "second").await;
        fx.node.fail(NodeOp::Play);

        fx.node_event_handler()
            .handle(ended(&first))
            .await
            .unwrap();
        assert!(fx.registry.snapshot(GUILD).await.is_none());
        assert_eq!(fx.gateway.last_text().as_deref(), Some(replies::PLAYBACK_FAILED));
    }

    #[tokio::test]
    async fn test_end_of_skipped_track_keeps_queue() {
        let fx = Fixture::new();
        let a = play(&fx, "a").await;
        let b = play(&fx, "b").await;
        let c = play(&fx, "c").await;

        fx.skip_handler().handle(SkipCommand { guild_id: GUILD }).await.unwrap();
        let session = fx.registry.snapshot(GUILD).await.unwrap();
        assert_eq!(session.current_track(), Some(&b));

        // 被 skip 的曲目随后上报结束，无论原因如何都不能再推进
        for reason in [EndReason::Replaced, EndReason::Finished] {
            fx.node_event_handler()
                .handle(NodeEvent::TrackEnded { guild_id: GUILD, track: a.clone(), reason })
                .await
                .unwrap();
        }

        let session = fx.registry.snapshot(GUILD).await.unwrap();
        assert_eq!(session.current_track(), Some(&b));
        assert_eq!(session.queue().peek_all(10), vec![&c]);
    }

    #[tokio::test]
    async fn test_duplicate_track_end_advances_once() {
        let fx = Fixture::new();
        let a = play(&fx, "a").await;
        let b = play(&fx, "b").await;
        let c = play(&fx, "c").await;

        let handler = fx.node_event_handler();
        handler.handle(ended(&a)).await.unwrap();
        handler.handle(ended(&a)).await.unwrap();

        let session = fx.registry.snapshot(GUILD).await.unwrap();
        assert_eq!(session.current_track(), Some(&b));
        assert_eq!(session.queue().peek_all(10), vec![&c]);
    }

    #[tokio::test]
    async fn test_stopped_track_end_does_not_advance() {
        let fx = Fixture::new();
        let a = play(&fx, "a").await;
        play(&fx, "b").await;

        fx.node_event_handler()
            .handle(NodeEvent::TrackEnded { guild_id: GUILD, track: a.clone(), reason: EndReason::Stopped })
            .await
            .unwrap();

        let session = fx.registry.snapshot(GUILD).await.unwrap();
        assert_eq!(session.current_track(), Some(&a));
        assert_eq!(fx.node.count(NodeOp::Play), 1);
    }

    #[tokio::test]
    async fn test_track_started_announces() {
        let fx = Fixture::new();
        let track = play(&fx, "lofi").await;

        fx.node_event_handler()
            .handle(NodeEvent::TrackStarted { guild_id: GUILD, track: track.clone() })
            .await
            .unwrap();
        assert_eq!(fx.gateway.sent_to(TEXT), vec![replies::now_playing(&track)]);
    }

    #[tokio::test]
    async fn test_event_without_session_is_ignored() {
        let fx = Fixture::new();
        fx.node_event_handler()
            .handle(NodeEvent::QueueEnded { guild_id: GUILD })
            .await
            .unwrap();
        assert!(fx.node.calls().is_empty());
        assert!(fx.gateway.sent().is_empty());
    }
}
