//! Event Worker - 入站事件处理
//!
//! 每个 guild 一条执行通道（actor）：同一 guild 的事件按到达顺序逐个处理，
//! 全局并发许可只在轮到该事件执行时才获取。

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::application::ports::{InboundMessage, MembershipChange, NodeEvent};
use crate::application::{CommandDispatcher, NodeEventHandler, PresenceHandler};
use crate::domain::playback::GuildId;

/// 入站事件
#[derive(Debug, Clone)]
pub enum InboundEvent {
    /// 聊天消息
    Message(InboundMessage),
    /// 语音频道成员变化
    Membership(MembershipChange),
    /// 音频节点播放事件
    Node(NodeEvent),
}

impl InboundEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Message(_) => "message",
            InboundEvent::Membership(_) => "membership",
            InboundEvent::Node(_) => "node",
        }
    }

    /// 事件所属 guild，私信为 None
    pub fn guild_id(&self) -> Option<GuildId> {
        match self {
            InboundEvent::Message(message) => message.guild_id,
            InboundEvent::Membership(change) => Some(change.guild_id),
            InboundEvent::Node(event) => Some(event.guild_id()),
        }
    }
}

/// 事件信封（带追踪 ID）
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub id: Uuid,
    pub received_at: DateTime<Utc>,
    pub event: InboundEvent,
}

impl EventEnvelope {
    pub fn new(event: InboundEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            received_at: Utc::now(),
            event,
        }
    }
}

/// Worker 配置
#[derive(Debug, Clone)]
pub struct EventWorkerConfig {
    /// 同时处理的最大事件数（跨 guild）
    pub max_concurrent: usize,
    /// 单个 guild 通道可积压的事件数，超出的事件丢弃
    pub lane_capacity: usize,
    /// guild 通道空闲多久后退出
    pub lane_idle: Duration,
}

impl Default for EventWorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 64,
            lane_capacity: 256,
            lane_idle: Duration::from_secs(60),
        }
    }
}

/// 事件处理器集合
pub struct EventHandlers {
    pub dispatcher: CommandDispatcher,
    pub presence: PresenceHandler,
    pub node_events: NodeEventHandler,
}

/// 单个 guild 的执行通道
struct GuildLaneHandle {
    sender: mpsc::Sender<EventEnvelope>,
    task: JoinHandle<()>,
}

/// Event Worker
///
/// 从队列消费事件并分发到 guild 执行通道。
/// 一个 guild 最多占用一个并发许可，慢 guild 不会阻塞其他 guild。
pub struct EventWorker {
    config: EventWorkerConfig,
    receiver: mpsc::Receiver<EventEnvelope>,
    handlers: Arc<EventHandlers>,
    semaphore: Arc<Semaphore>,
    lanes: HashMap<GuildId, GuildLaneHandle>,
}

impl EventWorker {
    pub fn new(
        config: EventWorkerConfig,
        receiver: mpsc::Receiver<EventEnvelope>,
        handlers: EventHandlers,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            config,
            receiver,
            handlers: Arc::new(handlers),
            semaphore,
            lanes: HashMap::new(),
        }
    }

    /// 启动 Worker，发送端全部关闭且积压事件处理完后返回
    pub async fn run(mut self) {
        tracing::info!(
            max_concurrent = self.config.max_concurrent,
            lane_capacity = self.config.lane_capacity,
            "EventWorker started"
        );

        while let Some(envelope) = self.receiver.recv().await {
            match envelope.event.guild_id() {
                Some(guild_id) => self.route(guild_id, envelope),
                None => {
                    let handlers = self.handlers.clone();
                    let semaphore = self.semaphore.clone();
                    tokio::spawn(async move { execute(&handlers, &semaphore, envelope).await });
                }
            }
            self.lanes.retain(|_, lane| !lane.task.is_finished());
        }

        // 关闭所有通道并等待积压事件处理完
        for (_, lane) in self.lanes.drain() {
            drop(lane.sender);
            if let Err(e) = lane.task.await {
                tracing::error!(error = %e, "Guild lane task failed");
            }
        }
        tracing::info!("EventWorker stopped");
    }

    /// 投递到 guild 通道，通道不存在或已退出时新建
    fn route(&mut self, guild_id: GuildId, envelope: EventEnvelope) {
        let envelope = match self.lanes.get(&guild_id) {
            Some(lane) => match lane.sender.try_send(envelope) {
                Ok(()) => return,
                Err(TrySendError::Full(envelope)) => {
                    tracing::warn!(
                        guild_id = %guild_id,
                        event_id = %envelope.id,
                        kind = envelope.event.kind(),
                        "Guild lane is full, dropping event"
                    );
                    return;
                }
                Err(TrySendError::Closed(envelope)) => envelope,
            },
            None => envelope,
        };

        // 新通道等旧通道排空后再开始，保证顺序
        let previous = self.lanes.remove(&guild_id).map(|lane| lane.task);
        let (sender, receiver) = mpsc::channel(self.config.lane_capacity.max(1));
        if let Err(e) = sender.try_send(envelope) {
            tracing::error!(guild_id = %guild_id, error = %e, "Failed to seed guild lane");
            return;
        }

        let task = tokio::spawn(run_lane(
            guild_id,
            receiver,
            previous,
            self.handlers.clone(),
            self.semaphore.clone(),
            self.config.lane_idle,
        ));
        tracing::debug!(guild_id = %guild_id, "Guild lane opened");
        self.lanes.insert(guild_id, GuildLaneHandle { sender, task });
    }
}

async fn run_lane(
    guild_id: GuildId,
    mut receiver: mpsc::Receiver<EventEnvelope>,
    previous: Option<JoinHandle<()>>,
    handlers: Arc<EventHandlers>,
    semaphore: Arc<Semaphore>,
    idle: Duration,
) {
    if let Some(previous) = previous {
        if let Err(e) = previous.await {
            tracing::error!(guild_id = %guild_id, error = %e, "Previous guild lane task failed");
        }
    }

    loop {
        match tokio::time::timeout(idle, receiver.recv()).await {
            Ok(Some(envelope)) => execute(&handlers, &semaphore, envelope).await,
            Ok(None) => break,
            Err(_) => {
                // 空闲：拒绝新事件，处理已入队的剩余事件后退出
                receiver.close();
                while let Some(envelope) = receiver.recv().await {
                    execute(&handlers, &semaphore, envelope).await;
                }
                break;
            }
        }
    }
    tracing::debug!(guild_id = %guild_id, "Guild lane closed");
}

/// 获取并发许可后处理一个事件，内层任务隔离 panic
async fn execute(handlers: &Arc<EventHandlers>, semaphore: &Arc<Semaphore>, envelope: EventEnvelope) {
    let _permit = match semaphore.clone().acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            tracing::error!("Failed to acquire semaphore permit");
            return;
        }
    };

    let id = envelope.id;
    let kind = envelope.event.kind();
    if let Err(e) = tokio::spawn(process(handlers.clone(), envelope)).await {
        if e.is_panic() {
            tracing::error!(event_id = %id, kind = kind, "Event handler panicked");
        } else {
            tracing::warn!(event_id = %id, kind = kind, error = %e, "Event handler cancelled");
        }
    }
}

async fn process(handlers: Arc<EventHandlers>, envelope: EventEnvelope) {
    let queued_ms = (Utc::now() - envelope.received_at).num_milliseconds();
    tracing::debug!(
        event_id = %envelope.id,
        kind = envelope.event.kind(),
        queued_ms = queued_ms,
        "Processing event"
    );

    match envelope.event {
        InboundEvent::Message(message) => {
            handlers.dispatcher.dispatch(message).await;
        }
        InboundEvent::Membership(change) => {
            handlers.presence.handle(change).await;
        }
        InboundEvent::Node(event) => {
            if let Err(e) = handlers.node_events.handle(event).await {
                tracing::error!(event_id = %envelope.id, error = %e, "Node event handling failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{SelectionCachePort, SessionRegistryPort};
    use crate::application::DispatcherConfig;
    use crate::domain::playback::{ChannelId, Session, SessionState, UserId};
    use crate::infrastructure::adapters::{FakeAudioNode, RecordingGateway};
    use crate::infrastructure::memory::{InMemorySelectionCache, InMemorySessionRegistry};
    use std::time::Instant;

    const GUILD: GuildId = GuildId::new(1);
    const OTHER_GUILD: GuildId = GuildId::new(2);
    const TEXT: ChannelId = ChannelId::new(2);
    const VOICE: ChannelId = ChannelId::new(3);
    const OTHER_VOICE: ChannelId = ChannelId::new(5);
    const USER: UserId = UserId::new(4);

    struct Harness {
        registry: Arc<InMemorySessionRegistry>,
        sender: mpsc::Sender<EventEnvelope>,
        worker: JoinHandle<()>,
    }

    fn start(config: EventWorkerConfig, node: FakeAudioNode) -> Harness {
        let registry = Arc::new(InMemorySessionRegistry::new());
        let node = Arc::new(node);
        let gateway = Arc::new(RecordingGateway::new());
        gateway.join_voice(GUILD, USER, VOICE);
        gateway.join_voice(OTHER_GUILD, USER, OTHER_VOICE);
        let cache: Arc<dyn SelectionCachePort> =
            Arc::new(InMemorySelectionCache::new(Duration::from_secs(60), 10));

        let handlers = EventHandlers {
            dispatcher: CommandDispatcher::new(
                DispatcherConfig::default(),
                registry.clone(),
                node.clone(),
                gateway.clone(),
                cache,
            ),
            presence: PresenceHandler::new(registry.clone(), node.clone(), gateway.clone()),
            node_events: NodeEventHandler::new(registry.clone(), node.clone(), gateway.clone()),
        };

        let (sender, receiver) = mpsc::channel(64);
        let worker = tokio::spawn(EventWorker::new(config, receiver, handlers).run());
        Harness {
            registry,
            sender,
            worker,
        }
    }

    fn message(guild_id: GuildId, text: &str) -> EventEnvelope {
        EventEnvelope::new(InboundEvent::Message(InboundMessage {
            guild_id: Some(guild_id),
            channel_id: TEXT,
            author_id: USER,
            text: text.to_string(),
            is_automated: false,
            sent_at: Utc::now(),
        }))
    }

    /// 轮询直到会话满足条件
    async fn wait_for<F>(registry: &InMemorySessionRegistry, guild_id: GuildId, done: F) -> Option<Session>
    where
        F: Fn(&Option<Session>) -> bool,
    {
        for _ in 0..300 {
            let snapshot = registry.snapshot(guild_id).await;
            if done(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        None
    }

    #[tokio::test]
    async fn test_worker_processes_events_until_closed() {
        let harness = start(EventWorkerConfig::default(), FakeAudioNode::new());

        harness.sender.send(message(GUILD, "!play lofi")).await.unwrap();
        assert!(wait_for(&harness.registry, GUILD, |s| s.is_some()).await.is_some());

        harness
            .sender
            .send(EventEnvelope::new(InboundEvent::Membership(MembershipChange {
                guild_id: GUILD,
                voice_channel_id: VOICE,
                members: vec![],
            })))
            .await
            .unwrap();
        wait_for(&harness.registry, GUILD, |s| s.is_none()).await;
        assert!(harness.registry.snapshot(GUILD).await.is_none());

        drop(harness.sender);
        tokio::time::timeout(Duration::from_secs(1), harness.worker)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_busy_guild_does_not_block_other_guilds() {
        let config = EventWorkerConfig {
            max_concurrent: 4,
            ..Default::default()
        };
        let harness = start(config, FakeAudioNode::new().with_delay(Duration::from_millis(100)));

        for i in 0..8 {
            harness.sender.send(message(GUILD, &format!("!play song {}", i))).await.unwrap();
        }
        let started = Instant::now();
        harness.sender.send(message(OTHER_GUILD, "!play elsewhere")).await.unwrap();

        let session = wait_for(&harness.registry, OTHER_GUILD, |s| {
            s.as_ref().map(|s| s.state() == SessionState::Playing).unwrap_or(false)
        })
        .await;
        let elapsed = started.elapsed();

        assert!(session.is_some());
        // 自身工作约 400ms（is_ready + connect + search + play）
        assert!(elapsed < Duration::from_millis(900), "served after {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_events_of_one_guild_run_in_arrival_order() {
        let harness = start(
            EventWorkerConfig::default(),
            FakeAudioNode::new().with_delay(Duration::from_millis(20)),
        );

        for title in ["a", "b", "c"] {
            harness.sender.send(message(GUILD, &format!("!play {}", title))).await.unwrap();
        }

        let session = wait_for(&harness.registry, GUILD, |s| {
            s.as_ref().map(|s| s.queue().len() == 2).unwrap_or(false)
        })
        .await
        .unwrap();
        assert_eq!(session.current_track().unwrap().title, "a");
        let queued: Vec<&str> = session.queue().peek_all(10).iter().map(|t| t.title.as_str()).collect();
        assert_eq!(queued, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_idle_lane_reopens_for_new_events() {
        let config = EventWorkerConfig {
            lane_idle: Duration::from_millis(20),
            ..Default::default()
        };
        let harness = start(config, FakeAudioNode::new());

        harness.sender.send(message(GUILD, "!play first")).await.unwrap();
        assert!(wait_for(&harness.registry, GUILD, |s| s.is_some()).await.is_some());
        tokio::time::sleep(Duration::from_millis(80)).await;

        harness.sender.send(message(GUILD, "!play second")).await.unwrap();
        let session = wait_for(&harness.registry, GUILD, |s| {
            s.as_ref().map(|s| s.queue().len() == 1).unwrap_or(false)
        })
        .await
        .unwrap();
        assert_eq!(session.queue().peek_all(1)[0].title, "second");
    }

    #[test]
    fn test_event_kind_and_guild() {
        let event = InboundEvent::Node(NodeEvent::QueueEnded { guild_id: GUILD });
        assert_eq!(event.kind(), "node");
        assert_eq!(event.guild_id(), Some(GUILD));

        let dm = message(GUILD, "!ping");
        let dm = match dm.event {
            InboundEvent::Message(mut m) => {
                m.guild_id = None;
                InboundEvent::Message(m)
            }
            other => other,
        };
        assert_eq!(dm.guild_id(), None);
    }
}
