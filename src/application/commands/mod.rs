//! 应用层 - 命令
//!
//! 聊天命令与外部通知对应的用例

mod playback_commands;

pub mod handlers;

pub use playback_commands::*;
