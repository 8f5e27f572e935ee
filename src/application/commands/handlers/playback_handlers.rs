//! Playback Command Handlers
//!
//! 所有处理器都在 guild 执行通道内完成 get-or-create 与修改；
//! 本地状态只在音频节点确认之后才提交。

use std::sync::Arc;

use crate::application::commands::playback_commands::*;
use crate::application::error::CommandError;
use crate::application::ports::{
    AudioNodePort, ChatGatewayPort, GuildLane, SelectionCachePort, SessionRegistryPort,
};
use crate::application::replies;
use crate::domain::playback::{ChannelId, GuildId, SessionState, Track, UserId};
use crate::domain::MAX_SELECTION;

/// 将用户输入转换为节点搜索标识
///
/// URL 原样传递，其余加上搜索前缀（如 `ytsearch:`）
pub fn search_identifier(search_prefix: &str, query: &str) -> String {
    if search_prefix.is_empty() || query.starts_with("http://") || query.starts_with("https://") {
        query.to_string()
    } else {
        format!("{}:{}", search_prefix, query)
    }
}

async fn require_voice_channel(
    gateway: &dyn ChatGatewayPort,
    guild_id: GuildId,
    user_id: UserId,
) -> Result<ChannelId, CommandError> {
    gateway
        .voice_channel_of(guild_id, user_id)
        .await?
        .ok_or(CommandError::user_input(replies::JOIN_VOICE))
}

async fn require_ready(node: &dyn AudioNodePort) -> Result<(), CommandError> {
    if node.is_ready().await {
        Ok(())
    } else {
        tracing::error!("Audio node not usable");
        Err(CommandError::backend_unavailable("audio node not ready"))
    }
}

fn require_query(query: &str) -> Result<&str, CommandError> {
    let query = query.trim();
    if query.is_empty() {
        Err(CommandError::user_input(replies::PROVIDE_QUERY))
    } else {
        Ok(query)
    }
}

/// 新建会话后连接语音，失败时撤销会话
async fn connect_new_session(
    lane: &mut GuildLane,
    node: &dyn AudioNodePort,
    voice_channel_id: ChannelId,
) -> Result<(), CommandError> {
    let guild_id = lane.guild_id();
    match node.connect(guild_id, voice_channel_id).await {
        Ok(()) => {
            tracing::info!(guild_id = %guild_id, voice_channel_id = %voice_channel_id, "Connected to voice");
            Ok(())
        }
        Err(e) => {
            tracing::error!(guild_id = %guild_id, error = %e, "Voice connect failed");
            lane.destroy("connect failed");
            Err(e.into())
        }
    }
}

/// 放弃本次命令新建、尚未开始播放的会话
async fn abandon_new_session(lane: &mut GuildLane, node: &dyn AudioNodePort) {
    let guild_id = lane.guild_id();
    if let Err(e) = node.destroy(guild_id).await {
        tracing::warn!(guild_id = %guild_id, error = %e, "Failed to destroy node player");
    }
    lane.destroy("abandoned before playback");
}

/// 入队；如果会话还没有在播放则立即播放队首
async fn enqueue_and_start(
    lane: &mut GuildLane,
    node: &dyn AudioNodePort,
    track: Track,
) -> Result<EnqueueOutcome, CommandError> {
    let guild_id = lane.guild_id();
    let session = lane
        .session_mut()
        .ok_or_else(|| CommandError::unexpected(format!("no session for guild {}", guild_id)))?;

    let position = session.enqueue(track)?;
    if !session.is_awaiting_playback() {
        return Ok(EnqueueOutcome::Queued { position });
    }

    let head = session
        .next_track()
        .cloned()
        .ok_or_else(|| CommandError::unexpected("queue empty right after enqueue"))?;

    if let Err(e) = node.play(guild_id, &head).await {
        tracing::error!(guild_id = %guild_id, title = %head.title, error = %e, "Play failed");
        if let Err(destroy_err) = node.destroy(guild_id).await {
            tracing::warn!(guild_id = %guild_id, error = %destroy_err, "Failed to destroy node player");
        }
        lane.destroy("play failed");
        return Err(e.into());
    }

    let session = lane
        .session_mut()
        .ok_or_else(|| CommandError::unexpected(format!("no session for guild {}", guild_id)))?;
    let started = session.start_playback()?;
    tracing::info!(guild_id = %guild_id, title = %started.title, "Playback started");
    Ok(EnqueueOutcome::Started)
}

/// 节点确认失败时销毁会话
async fn destroy_after_failure(lane: &mut GuildLane, node: &dyn AudioNodePort, reason: &str) {
    let guild_id = lane.guild_id();
    if let Err(e) = node.destroy(guild_id).await {
        tracing::warn!(guild_id = %guild_id, error = %e, "Failed to destroy node player");
    }
    lane.destroy(reason);
}

/// Play Handler - 搜索并播放最佳结果
pub struct PlayHandler {
    registry: Arc<dyn SessionRegistryPort>,
    node: Arc<dyn AudioNodePort>,
    gateway: Arc<dyn ChatGatewayPort>,
    search_prefix: String,
}

impl PlayHandler {
    pub fn new(
        registry: Arc<dyn SessionRegistryPort>,
        node: Arc<dyn AudioNodePort>,
        gateway: Arc<dyn ChatGatewayPort>,
        search_prefix: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            node,
            gateway,
            search_prefix: search_prefix.into(),
        }
    }

    pub async fn handle(&self, cmd: PlayCommand) -> Result<PlayResponse, CommandError> {
        let voice_channel_id =
            require_voice_channel(self.gateway.as_ref(), cmd.guild_id, cmd.requester_id).await?;
        require_ready(self.node.as_ref()).await?;
        let query = require_query(&cmd.query)?;

        let mut lane = self.registry.lane(cmd.guild_id).await;
        let (_, created) = lane.get_or_create(voice_channel_id, cmd.text_channel_id);
        if created {
            connect_new_session(&mut lane, self.node.as_ref(), voice_channel_id).await?;
        }

        let identifier = search_identifier(&self.search_prefix, query);
        let tracks = match self.node.search(&identifier).await {
            Ok(tracks) => tracks,
            Err(e) => {
                tracing::error!(guild_id = %cmd.guild_id, query = %query, error = %e, "Search failed");
                if created {
                    abandon_new_session(&mut lane, self.node.as_ref()).await;
                }
                return Err(e.into());
            }
        };

        let track = match tracks.into_iter().next() {
            Some(track) => track,
            None => {
                tracing::info!(guild_id = %cmd.guild_id, query = %query, "No results found");
                if created {
                    abandon_new_session(&mut lane, self.node.as_ref()).await;
                }
                return Err(CommandError::NoResults(query.to_string()));
            }
        };

        let outcome = enqueue_and_start(&mut lane, self.node.as_ref(), track.clone()).await?;
        Ok(PlayResponse {
            track,
            outcome,
            session_created: created,
        })
    }
}

/// Search Handler - 列出候选并缓存，等待数字回复
pub struct SearchHandler {
    registry: Arc<dyn SessionRegistryPort>,
    node: Arc<dyn AudioNodePort>,
    gateway: Arc<dyn ChatGatewayPort>,
    cache: Arc<dyn SelectionCachePort>,
    search_prefix: String,
    max_candidates: usize,
}

impl SearchHandler {
    pub fn new(
        registry: Arc<dyn SessionRegistryPort>,
        node: Arc<dyn AudioNodePort>,
        gateway: Arc<dyn ChatGatewayPort>,
        cache: Arc<dyn SelectionCachePort>,
        search_prefix: impl Into<String>,
        max_candidates: usize,
    ) -> Self {
        Self {
            registry,
            node,
            gateway,
            cache,
            search_prefix: search_prefix.into(),
            max_candidates: max_candidates.clamp(1, MAX_SELECTION),
        }
    }

    pub async fn handle(&self, cmd: SearchCommand) -> Result<SearchResponse, CommandError> {
        require_voice_channel(self.gateway.as_ref(), cmd.guild_id, cmd.requester_id).await?;
        require_ready(self.node.as_ref()).await?;
        let query = require_query(&cmd.query)?;

        // 与同一请求者的选择回复串行
        let _lane = self.registry.lane(cmd.guild_id).await;

        let identifier = search_identifier(&self.search_prefix, query);
        let mut candidates = self.node.search(&identifier).await?;
        if candidates.is_empty() {
            tracing::info!(guild_id = %cmd.guild_id, query = %query, "No results found");
            return Err(CommandError::NoResults(query.to_string()));
        }
        candidates.truncate(self.max_candidates);

        let prompt = replies::search_results(query, &candidates);
        let prompt_message_id = self.gateway.send_message(cmd.text_channel_id, &prompt).await?;

        let candidate_count = candidates.len();
        self.cache
            .record(cmd.guild_id, cmd.requester_id, candidates, prompt_message_id);

        tracing::info!(
            guild_id = %cmd.guild_id,
            requester_id = %cmd.requester_id,
            candidate_count = candidate_count,
            "Search candidates cached"
        );

        Ok(SearchResponse {
            candidate_count,
            prompt_message_id,
        })
    }
}

/// Select Handler - 处理数字回复
pub struct SelectHandler {
    registry: Arc<dyn SessionRegistryPort>,
    node: Arc<dyn AudioNodePort>,
    gateway: Arc<dyn ChatGatewayPort>,
    cache: Arc<dyn SelectionCachePort>,
}

impl SelectHandler {
    pub fn new(
        registry: Arc<dyn SessionRegistryPort>,
        node: Arc<dyn AudioNodePort>,
        gateway: Arc<dyn ChatGatewayPort>,
        cache: Arc<dyn SelectionCachePort>,
    ) -> Self {
        Self {
            registry,
            node,
            gateway,
            cache,
        }
    }

    /// 返回 None 表示该数字与任何待选条目无关，应静默忽略
    pub async fn handle(&self, cmd: SelectCommand) -> Result<Option<PlayResponse>, CommandError> {
        let mut lane = self.registry.lane(cmd.guild_id).await;

        let in_range = self
            .cache
            .pending(cmd.guild_id, cmd.requester_id)
            .map(|pending| pending.contains_index(cmd.index))
            .unwrap_or(false);
        if !in_range {
            tracing::debug!(
                guild_id = %cmd.guild_id,
                requester_id = %cmd.requester_id,
                index = cmd.index,
                "Selection ignored"
            );
            return Ok(None);
        }

        let voice_channel_id = match lane.session() {
            Some(session) => session.voice_channel_id(),
            None => {
                let voice_channel_id =
                    require_voice_channel(self.gateway.as_ref(), cmd.guild_id, cmd.requester_id)
                        .await?;
                require_ready(self.node.as_ref()).await?;
                voice_channel_id
            }
        };

        let track = match self.cache.resolve(cmd.guild_id, cmd.requester_id, cmd.index) {
            Some(track) => track,
            None => return Ok(None),
        };

        let (_, created) = lane.get_or_create(voice_channel_id, cmd.text_channel_id);
        if created {
            connect_new_session(&mut lane, self.node.as_ref(), voice_channel_id).await?;
        }

        let outcome = enqueue_and_start(&mut lane, self.node.as_ref(), track.clone()).await?;
        tracing::info!(
            guild_id = %cmd.guild_id,
            requester_id = %cmd.requester_id,
            index = cmd.index,
            title = %track.title,
            "Selection enqueued"
        );

        Ok(Some(PlayResponse {
            track,
            outcome,
            session_created: created,
        }))
    }
}

/// Queue Handler - 查看队列
pub struct QueueHandler {
    registry: Arc<dyn SessionRegistryPort>,
}

impl QueueHandler {
    pub fn new(registry: Arc<dyn SessionRegistryPort>) -> Self {
        Self { registry }
    }

    pub async fn handle(&self, cmd: ShowQueueCommand) -> Result<QueueView, CommandError> {
        let lane = self.registry.lane(cmd.guild_id).await;
        let session = lane
            .session()
            .filter(|session| session.current_track().is_some() || !session.queue().is_empty())
            .ok_or(CommandError::user_input(replies::QUEUE_EMPTY))?;

        Ok(QueueView {
            current: session.current_track().cloned(),
            upcoming: session
                .upcoming(MAX_SELECTION)
                .into_iter()
                .cloned()
                .collect(),
            total: session.queue().len(),
        })
    }
}

/// Skip Handler - 强制切换到下一首
pub struct SkipHandler {
    registry: Arc<dyn SessionRegistryPort>,
    node: Arc<dyn AudioNodePort>,
}

impl SkipHandler {
    pub fn new(registry: Arc<dyn SessionRegistryPort>, node: Arc<dyn AudioNodePort>) -> Self {
        Self { registry, node }
    }

    pub async fn handle(&self, cmd: SkipCommand) -> Result<SkipResponse, CommandError> {
        let mut lane = self.registry.lane(cmd.guild_id).await;

        let next = match lane.session() {
            Some(session) if session.state().has_current_track() => session.next_track().cloned(),
            _ => return Err(CommandError::user_input(replies::NOTHING_PLAYING)),
        };

        if let Err(e) = self.node.skip(cmd.guild_id, next.as_ref()).await {
            tracing::error!(guild_id = %cmd.guild_id, error = %e, "Skip failed, destroying session");
            destroy_after_failure(&mut lane, self.node.as_ref(), "skip failed").await;
            return Ok(SkipResponse::Aborted);
        }

        match next {
            Some(next) => {
                let session = lane.session_mut().ok_or_else(|| {
                    CommandError::unexpected(format!("no session for guild {}", cmd.guild_id))
                })?;
                session.advance()?;
                tracing::info!(guild_id = %cmd.guild_id, title = %next.title, "Skipped to next track");
                Ok(SkipResponse::Advanced { next })
            }
            None => {
                destroy_after_failure(&mut lane, self.node.as_ref(), "queue ended").await;
                Ok(SkipResponse::QueueEnded)
            }
        }
    }
}

/// Stop Handler - 停止播放并销毁会话
pub struct StopHandler {
    registry: Arc<dyn SessionRegistryPort>,
    node: Arc<dyn AudioNodePort>,
}

impl StopHandler {
    pub fn new(registry: Arc<dyn SessionRegistryPort>, node: Arc<dyn AudioNodePort>) -> Self {
        Self { registry, node }
    }

    pub async fn handle(&self, cmd: StopCommand) -> Result<(), CommandError> {
        let mut lane = self.registry.lane(cmd.guild_id).await;
        if lane.session().is_none() {
            return Err(CommandError::user_input(replies::NOTHING_PLAYING));
        }

        if let Err(e) = self.node.destroy(cmd.guild_id).await {
            tracing::warn!(guild_id = %cmd.guild_id, error = %e, "Node destroy failed, dropping session anyway");
        }
        lane.destroy("stop command");
        Ok(())
    }
}

/// Pause Handler - 暂停 / 恢复
pub struct PauseHandler {
    registry: Arc<dyn SessionRegistryPort>,
    node: Arc<dyn AudioNodePort>,
}

impl PauseHandler {
    pub fn new(registry: Arc<dyn SessionRegistryPort>, node: Arc<dyn AudioNodePort>) -> Self {
        Self { registry, node }
    }

    /// 返回新的暂停状态
    pub async fn handle(&self, cmd: SetPausedCommand) -> Result<bool, CommandError> {
        let mut lane = self.registry.lane(cmd.guild_id).await;

        let state = match lane.session() {
            Some(session) if session.state().has_current_track() => session.state(),
            _ => return Err(CommandError::user_input(replies::NOTHING_PLAYING)),
        };
        match (cmd.paused, state) {
            (true, SessionState::Paused) => {
                return Err(CommandError::user_input(replies::ALREADY_PAUSED))
            }
            (false, SessionState::Playing) => {
                return Err(CommandError::user_input(replies::NOT_PAUSED))
            }
            _ => {}
        }

        if let Err(e) = self.node.set_paused(cmd.guild_id, cmd.paused).await {
            tracing::error!(guild_id = %cmd.guild_id, error = %e, "Pause toggle failed, destroying session");
            destroy_after_failure(&mut lane, self.node.as_ref(), "pause failed").await;
            return Err(e.into());
        }

        let session = lane
            .session_mut()
            .ok_or_else(|| CommandError::unexpected(format!("no session for guild {}", cmd.guild_id)))?;
        if cmd.paused {
            session.pause()?;
        } else {
            session.resume()?;
        }
        tracing::info!(guild_id = %cmd.guild_id, paused = cmd.paused, "Pause state changed");
        Ok(cmd.paused)
    }
}
