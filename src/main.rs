//! GuildTune - 多 guild 音乐播放会话服务
//!
//! 启动顺序：配置 -> 日志 -> 适配器 -> EventWorker -> 清理任务 -> HTTP 入口

use std::sync::Arc;

use guildtune::application::ports::{SelectionCachePort, SessionRegistryPort};
use guildtune::application::{
    CommandDispatcher, DispatcherConfig, NodeEventHandler, PresenceHandler,
};
use guildtune::config::{load_config, print_config};
use guildtune::infrastructure::adapters::{
    HttpAudioNodeClient, HttpAudioNodeConfig, HttpChatGateway, HttpChatGatewayConfig,
    TimeoutAudioNode,
};
use guildtune::infrastructure::http::{AppState, HttpServer, ServerConfig};
use guildtune::infrastructure::memory::{InMemorySelectionCache, InMemorySessionRegistry};
use guildtune::infrastructure::worker::{EventHandlers, EventWorker, EventWorkerConfig};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志尚未初始化，错误由 main 的返回值输出，进程以非零状态退出
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    let log_filter = format!(
        "{},guildtune={},tower_http=debug",
        config.log.level, config.log.level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter)),
        )
        .init();

    tracing::info!("GuildTune - music session service");
    print_config(&config);

    // 音频节点（每次调用都有超时上限）
    let node_config = HttpAudioNodeConfig::new(&config.audio_node.url, &config.audio_node.password)
        .with_timeout(config.audio_node.timeout_secs);
    let node = Arc::new(TimeoutAudioNode::new(
        Arc::new(HttpAudioNodeClient::new(node_config)?),
        config.audio_node.timeout(),
    ));

    // 聊天网关
    let gateway = Arc::new(HttpChatGateway::new(HttpChatGatewayConfig {
        api_base: config.discord.api_base.clone(),
        token: config.discord.token.clone(),
        ..Default::default()
    })?);

    let registry = Arc::new(InMemorySessionRegistry::new());
    let cache = Arc::new(InMemorySelectionCache::new(
        config.selection.ttl(),
        config.selection.max_candidates,
    ));

    let handlers = EventHandlers {
        dispatcher: CommandDispatcher::new(
            DispatcherConfig {
                prefix: config.bot.prefix.clone(),
                search_prefix: config.audio_node.search_prefix.clone(),
                max_candidates: config.selection.max_candidates,
            },
            registry.clone(),
            node.clone(),
            gateway.clone(),
            cache.clone(),
        ),
        presence: PresenceHandler::new(registry.clone(), node.clone(), gateway.clone()),
        node_events: NodeEventHandler::new(registry.clone(), node.clone(), gateway.clone()),
    };

    // 创建事件队列并启动 Worker
    let (event_tx, event_rx) = mpsc::channel(config.worker.queue_capacity);
    let worker = EventWorker::new(
        EventWorkerConfig {
            max_concurrent: config.worker.max_concurrent,
            lane_capacity: config.worker.lane_capacity,
            lane_idle: config.worker.lane_idle(),
        },
        event_rx,
        handlers,
    );
    tokio::spawn(worker.run());

    // 定期清理过期候选与空闲槽位
    let sweep_interval = config.selection.sweep_interval();
    let sweep_cache = cache.clone();
    let sweep_registry = registry.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            let swept = sweep_cache.sweep_expired();
            let pruned = sweep_registry.prune_idle();
            tracing::debug!(swept = swept, pruned = pruned, "Periodic cleanup finished");
        }
    });

    let server_config = ServerConfig::new(&config.server.host, config.server.port);
    let state = AppState::new(event_tx, registry, config.server.ingress_token.clone());
    let server = HttpServer::new(server_config, state);

    server
        .run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
