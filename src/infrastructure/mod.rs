//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现，以及事件入口与后台 Worker

pub mod adapters;
pub mod http;
pub mod memory;
pub mod worker;

pub use memory::{InMemorySelectionCache, InMemorySessionRegistry};
pub use worker::{EventWorker, EventWorkerConfig};
