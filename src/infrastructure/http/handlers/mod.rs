//! HTTP Handlers

mod gateway;
mod node;
mod ping;
mod sessions;

pub use gateway::*;
pub use node::*;
pub use ping::*;
pub use sessions::*;
