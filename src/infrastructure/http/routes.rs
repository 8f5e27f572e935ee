//! HTTP Routes
//!
//! API Endpoints:
//! - /                      GET   存活检查（纯文本）
//! - /api/ping              GET   健康检查
//! - /api/gateway/message   POST  网关中继：聊天消息          [token]
//! - /api/gateway/voice     POST  网关中继：语音频道成员变化  [token]
//! - /api/node/event        POST  音频节点播放事件            [token]
//! - /api/sessions          GET   活跃会话列表                [token]
//!
//! [token] 需要 `Authorization: Bearer <server.ingress_token>`

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::middleware::require_ingress_token;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::liveness))
        .nest("/api", api_routes(state.clone()))
        .with_state(state)
}

/// API 路由
fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .merge(protected_routes(state))
}

/// 需要共享密钥的路由
fn protected_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/gateway/message", post(handlers::gateway_message))
        .route("/gateway/voice", post(handlers::gateway_voice))
        .route("/node/event", post(handlers::node_event))
        .route("/sessions", get(handlers::list_sessions))
        .route_layer(middleware::from_fn_with_state(state, require_ingress_token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::SessionRegistryPort;
    use crate::domain::playback::{ChannelId, GuildId};
    use crate::infrastructure::memory::InMemorySessionRegistry;
    use crate::infrastructure::worker::{EventEnvelope, InboundEvent};
    use axum::body::{to_bytes, Body};
    use http::{Request, StatusCode};
    use serde_json::Value;
    use tokio::sync::mpsc;
    use tower::util::ServiceExt;

    const TOKEN: &str = "relay-secret";

    fn app(capacity: usize) -> (Router, mpsc::Receiver<EventEnvelope>, Arc<InMemorySessionRegistry>) {
        let (tx, rx) = mpsc::channel(capacity);
        let registry = Arc::new(InMemorySessionRegistry::new());
        let state = Arc::new(AppState::new(tx, registry.clone(), TOKEN));
        (create_routes(state), rx, registry)
    }

    fn post_json_with(uri: &str, body: &str, authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(value) = authorization {
            builder = builder.header("authorization", value);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        post_json_with(uri, body, Some(&format!("Bearer {}", TOKEN)))
    }

    fn get_authorized(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("authorization", format!("Bearer {}", TOKEN))
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_liveness() {
        let (app, _rx, _) = app(1);
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Bot is running.");
    }

    #[tokio::test]
    async fn test_ping() {
        let (app, _rx, _) = app(1);
        let response = app
            .oneshot(Request::builder().uri("/api/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_message_is_enqueued() {
        let (app, mut rx, _) = app(4);
        let body = r#"{"guild_id":"1","channel_id":"2","author_id":"3","text":"!play lofi"}"#;
        let response = app.oneshot(post_json("/api/gateway/message", body)).await.unwrap();

        let json = json_body(response).await;
        assert_eq!(json["errno"], 0);
        let envelope = rx.try_recv().unwrap();
        assert_eq!(json["data"]["event_id"], envelope.id.to_string());
        match envelope.event {
            InboundEvent::Message(message) => assert_eq!(message.text, "!play lofi"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_voice_and_node_events_are_enqueued() {
        let (app, mut rx, _) = app(4);
        let voice = r#"{"guild_id":"1","voice_channel_id":"5","members":[{"user_id":"9","is_automated":true}]}"#;
        app.clone().oneshot(post_json("/api/gateway/voice", voice)).await.unwrap();
        app.oneshot(post_json("/api/node/event", r#"{"type":"queue_ended","guild_id":"1"}"#))
            .await
            .unwrap();

        assert!(matches!(rx.try_recv().unwrap().event, InboundEvent::Membership(_)));
        assert!(matches!(rx.try_recv().unwrap().event, InboundEvent::Node(_)));
    }

    #[tokio::test]
    async fn test_full_queue_returns_service_unavailable() {
        let (app, _rx, _) = app(1);
        let body = r#"{"type":"track_ended","guild_id":"1","track":{"title":"T","play_spec":"enc"}}"#;
        app.clone().oneshot(post_json("/api/node/event", body)).await.unwrap();
        let response = app.oneshot(post_json("/api/node/event", body)).await.unwrap();

        assert_eq!(json_body(response).await["errno"], 503);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_bad_request() {
        let (app, mut rx, _) = app(1);
        let response = app
            .oneshot(post_json("/api/node/event", r#"{"type":"unknown"}"#))
            .await
            .unwrap();

        assert_eq!(json_body(response).await["errno"], 400);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_ingress_requires_token() {
        let (app, mut rx, _) = app(4);
        let voice = r#"{"guild_id":"1","voice_channel_id":"5","members":[]}"#;

        for authorization in [None, Some("Bearer wrong-secret"), Some("relay-secret"), Some("Bearer")] {
            let response = app
                .clone()
                .oneshot(post_json_with("/api/gateway/voice", voice, authorization))
                .await
                .unwrap();
            assert_eq!(json_body(response).await["errno"], 401, "authorization {:?}", authorization);
        }

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/sessions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_body(response).await["errno"], 401);
        assert!(rx.try_recv().is_err());

        // 存活检查不需要密钥
        let response = app
            .oneshot(Request::builder().uri("/api/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_list_sessions() {
        let (app, _rx, registry) = app(1);
        {
            let mut lane = registry.lane(GuildId::new(42)).await;
            lane.get_or_create(ChannelId::new(1), ChannelId::new(2));
        }

        let response = app
            .oneshot(get_authorized("/api/sessions"))
            .await
            .unwrap();
        let json = json_body(response).await;
        assert_eq!(json["data"][0]["guild_id"], "42");
        assert_eq!(json["data"][0]["state"], "connecting");
        assert_eq!(json["data"][0]["queue_len"], 0);
    }
}
