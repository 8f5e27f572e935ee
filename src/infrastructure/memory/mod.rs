//! Memory Layer - In-Memory State Management
//!
//! 实现 SessionRegistry 和 SelectionCache，所有会话状态只保存在内存中

mod selection_cache;
mod session_registry;

pub use selection_cache::InMemorySelectionCache;
pub use session_registry::InMemorySessionRegistry;
