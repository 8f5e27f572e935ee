//! Application State
//!
//! HTTP 入口只负责把事件投递给 EventWorker，以及只读查询会话

use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::application::ports::SessionRegistryPort;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::worker::{EventEnvelope, InboundEvent};

/// 应用状态
pub struct AppState {
    /// 事件队列发送端
    pub events: mpsc::Sender<EventEnvelope>,
    pub registry: Arc<dyn SessionRegistryPort>,
    /// 受保护路由要求的共享密钥
    ingress_token: String,
}

impl AppState {
    pub fn new(
        events: mpsc::Sender<EventEnvelope>,
        registry: Arc<dyn SessionRegistryPort>,
        ingress_token: impl Into<String>,
    ) -> Self {
        Self {
            events,
            registry,
            ingress_token: ingress_token.into(),
        }
    }

    /// 比较共享密钥，耗时与首个不同字节的位置无关
    pub fn accepts_token(&self, presented: &str) -> bool {
        let expected = self.ingress_token.as_bytes();
        let presented = presented.as_bytes();
        if expected.is_empty() || expected.len() != presented.len() {
            return false;
        }
        expected
            .iter()
            .zip(presented)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
    }

    /// 投递事件，不等待处理结果
    pub fn enqueue(&self, event: InboundEvent) -> Result<Uuid, ApiError> {
        let envelope = EventEnvelope::new(event);
        let id = envelope.id;
        let kind = envelope.event.kind();

        self.events.try_send(envelope).map_err(|e| match e {
            TrySendError::Full(_) => ApiError::ServiceUnavailable("Event queue is full".to_string()),
            TrySendError::Closed(_) => {
                ApiError::ServiceUnavailable("Event worker is not running".to_string())
            }
        })?;

        tracing::debug!(event_id = %id, kind = kind, "Event enqueued");
        Ok(id)
    }
}
