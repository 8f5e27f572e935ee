//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod audio_node;
pub mod gateway;

pub use audio_node::*;
pub use gateway::*;
