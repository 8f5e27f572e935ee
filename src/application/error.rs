//! 应用层错误定义
//!
//! 命令执行失败的统一分类，所有失败都在分发器边界转为聊天回复

use thiserror::Error;

use crate::application::ports::{AudioNodeError, GatewayError};
use crate::application::replies;
use crate::domain::playback::PlaybackError;

/// 命令错误
#[derive(Debug, Error)]
pub enum CommandError {
    /// 用户输入问题（缺少参数、不在语音频道等），直接回复给用户
    #[error("{0}")]
    UserInput(&'static str),

    /// 音频节点不可用（未就绪、连接/搜索/播放失败、超时）
    #[error("Audio backend unavailable: {0}")]
    BackendUnavailable(String),

    /// 搜索没有结果（正常的否定结果）
    #[error("No results for query: {0}")]
    NoResults(String),

    /// 其他意外错误
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl CommandError {
    pub fn user_input(reply: &'static str) -> Self {
        Self::UserInput(reply)
    }

    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::BackendUnavailable(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// 给用户的回复
    pub fn reply(&self) -> &'static str {
        match self {
            CommandError::UserInput(reply) => *reply,
            CommandError::BackendUnavailable(_) => replies::BACKEND_NOT_READY,
            CommandError::NoResults(_) => replies::NO_RESULTS,
            CommandError::Unexpected(_) => replies::UNEXPECTED,
        }
    }
}

impl From<AudioNodeError> for CommandError {
    fn from(err: AudioNodeError) -> Self {
        if err.is_unavailable() {
            Self::BackendUnavailable(err.to_string())
        } else {
            Self::Unexpected(err.to_string())
        }
    }
}

impl From<GatewayError> for CommandError {
    fn from(err: GatewayError) -> Self {
        Self::Unexpected(err.to_string())
    }
}

impl From<PlaybackError> for CommandError {
    fn from(err: PlaybackError) -> Self {
        Self::Unexpected(err.to_string())
    }
}
