//! Domain Layer - 领域层
//!
//! 包含一个限界上下文:
//! - Playback Context: 每个 guild 的播放会话、队列与曲目
//!
//! 以及共享的聊天命令解析器

pub mod playback;

mod command_parser;

pub use command_parser::{parse_command, ChatCommand, MAX_SELECTION};
