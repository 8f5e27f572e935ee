//! Command Dispatcher - 聊天消息入口
//!
//! 解析消息、调用对应处理器，并在这里统一把结果或错误转为回复。

use std::sync::Arc;

use chrono::Utc;

use crate::application::commands::handlers::{
    PauseHandler, PlayHandler, QueueHandler, SearchHandler, SelectHandler, SkipHandler, StopHandler,
};
use crate::application::commands::*;
use crate::application::error::CommandError;
use crate::application::ports::{
    AudioNodePort, ChatGatewayPort, InboundMessage, SelectionCachePort, SessionRegistryPort,
};
use crate::application::replies;
use crate::domain::playback::{ChannelId, GuildId};
use crate::domain::{parse_command, ChatCommand};

/// 分发器配置
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// 命令前缀
    pub prefix: String,
    /// 非 URL 查询的搜索前缀
    pub search_prefix: String,
    /// 搜索候选数量上限
    pub max_candidates: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            prefix: "!".to_string(),
            search_prefix: "ytsearch".to_string(),
            max_candidates: 10,
        }
    }
}

/// Command Dispatcher
pub struct CommandDispatcher {
    prefix: String,
    gateway: Arc<dyn ChatGatewayPort>,
    play: PlayHandler,
    search: SearchHandler,
    select: SelectHandler,
    queue: QueueHandler,
    skip: SkipHandler,
    stop: StopHandler,
    pause: PauseHandler,
}

impl CommandDispatcher {
    pub fn new(
        config: DispatcherConfig,
        registry: Arc<dyn SessionRegistryPort>,
        node: Arc<dyn AudioNodePort>,
        gateway: Arc<dyn ChatGatewayPort>,
        cache: Arc<dyn SelectionCachePort>,
    ) -> Self {
        Self {
            prefix: config.prefix,
            play: PlayHandler::new(
                registry.clone(),
                node.clone(),
                gateway.clone(),
                config.search_prefix.clone(),
            ),
            search: SearchHandler::new(
                registry.clone(),
                node.clone(),
                gateway.clone(),
                cache.clone(),
                config.search_prefix,
                config.max_candidates,
            ),
            select: SelectHandler::new(registry.clone(), node.clone(), gateway.clone(), cache),
            queue: QueueHandler::new(registry.clone()),
            skip: SkipHandler::new(registry.clone(), node.clone()),
            stop: StopHandler::new(registry.clone(), node.clone()),
            pause: PauseHandler::new(registry, node),
            gateway,
        }
    }

    /// 处理一条入站消息
    ///
    /// 返回发送出去的回复；被忽略的消息或无需回复的命令返回 None
    pub async fn dispatch(&self, message: InboundMessage) -> Option<String> {
        if message.is_automated {
            return None;
        }
        let guild_id = message.guild_id?;
        let command = parse_command(&self.prefix, &message.text)?;

        tracing::debug!(
            guild_id = %guild_id,
            author_id = %message.author_id,
            command = command.name(),
            "Dispatching command"
        );

        let reply = match self.execute(guild_id, &message, command).await {
            Ok(Some(reply)) => reply,
            Ok(None) => return None,
            Err(e) => {
                log_failure(guild_id, &e);
                e.reply().to_string()
            }
        };

        self.send_reply(guild_id, message.channel_id, &reply).await;
        Some(reply)
    }

    async fn execute(
        &self,
        guild_id: GuildId,
        message: &InboundMessage,
        command: ChatCommand,
    ) -> Result<Option<String>, CommandError> {
        let text_channel_id = message.channel_id;
        let requester_id = message.author_id;

        let reply = match command {
            ChatCommand::Help => Some(replies::HELP.to_string()),
            ChatCommand::Ping => {
                let latency_ms = (Utc::now() - message.sent_at).num_milliseconds().max(0);
                Some(replies::pong(latency_ms))
            }
            ChatCommand::Play(query) => {
                let response = self
                    .play
                    .handle(PlayCommand {
                        guild_id,
                        text_channel_id,
                        requester_id,
                        query,
                    })
                    .await?;
                enqueue_reply(&response)
            }
            ChatCommand::Search(query) => {
                // 候选列表已由处理器发送
                self.search
                    .handle(SearchCommand {
                        guild_id,
                        text_channel_id,
                        requester_id,
                        query,
                    })
                    .await?;
                None
            }
            ChatCommand::Select(index) => self
                .select
                .handle(SelectCommand {
                    guild_id,
                    text_channel_id,
                    requester_id,
                    index,
                })
                .await?
                .and_then(|response| enqueue_reply(&response)),
            ChatCommand::Queue => {
                let view = self.queue.handle(ShowQueueCommand { guild_id }).await?;
                Some(replies::queue_listing(
                    view.current.as_ref(),
                    &view.upcoming,
                    view.total,
                ))
            }
            ChatCommand::Skip => {
                let reply = match self.skip.handle(SkipCommand { guild_id }).await? {
                    SkipResponse::Advanced { next } => replies::skipped_to(&next),
                    SkipResponse::QueueEnded => replies::QUEUE_FINISHED.to_string(),
                    SkipResponse::Aborted => replies::SKIP_FAILED.to_string(),
                };
                Some(reply)
            }
            ChatCommand::Stop => {
                self.stop.handle(StopCommand { guild_id }).await?;
                Some(replies::STOPPED.to_string())
            }
            ChatCommand::Pause => {
                self.pause
                    .handle(SetPausedCommand { guild_id, paused: true })
                    .await?;
                Some(replies::PAUSED.to_string())
            }
            ChatCommand::Resume => {
                self.pause
                    .handle(SetPausedCommand { guild_id, paused: false })
                    .await?;
                Some(replies::RESUMED.to_string())
            }
        };

        Ok(reply)
    }

    async fn send_reply(&self, guild_id: GuildId, channel_id: ChannelId, text: &str) {
        if let Err(e) = self.gateway.send_message(channel_id, text).await {
            tracing::warn!(guild_id = %guild_id, channel_id = %channel_id, error = %e, "Failed to send reply");
        }
    }
}

/// 开始播放时由节点的 TrackStarted 事件播报，这里只回复排队
fn enqueue_reply(response: &PlayResponse) -> Option<String> {
    match response.outcome {
        EnqueueOutcome::Started => None,
        EnqueueOutcome::Queued { position } => Some(replies::queued(&response.track, position)),
    }
}

fn log_failure(guild_id: GuildId, err: &CommandError) {
    match err {
        CommandError::Unexpected(_) => {
            tracing::error!(guild_id = %guild_id, error = %err, "Command failed")
        }
        CommandError::BackendUnavailable(_) => {
            tracing::warn!(guild_id = %guild_id, error = %err, "Command failed")
        }
        CommandError::NoResults(_) => {
            tracing::info!(guild_id = %guild_id, error = %err, "Command failed")
        }
        CommandError::UserInput(_) => {
            tracing::debug!(guild_id = %guild_id, error = %err, "Command rejected")
        }
    }
}
