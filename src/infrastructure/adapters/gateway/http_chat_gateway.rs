//! HTTP Chat Gateway - Discord REST 客户端
//!
//! 实现 ChatGatewayPort trait
//!
//! - POST {api_base}/channels/{channel}/messages   {"content": "..."}
//! - GET  {api_base}/guilds/{guild}/voice-states/{user}

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::ports::{ChatGatewayPort, GatewayError};
use crate::domain::playback::{ChannelId, GuildId, MessageId, UserId};

/// Discord 单条消息上限
const MAX_MESSAGE_LEN: usize = 2000;

/// HTTP 聊天网关配置
#[derive(Debug, Clone)]
pub struct HttpChatGatewayConfig {
    pub api_base: String,
    pub token: String,
    pub timeout_secs: u64,
}

impl Default for HttpChatGatewayConfig {
    fn default() -> Self {
        Self {
            api_base: "https://discord.com/api/v10".to_string(),
            token: String::new(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageCreated {
    id: MessageId,
}

#[derive(Debug, Deserialize)]
struct VoiceState {
    #[serde(default)]
    channel_id: Option<ChannelId>,
}

pub struct HttpChatGateway {
    client: Client,
    config: HttpChatGatewayConfig,
}

impl HttpChatGateway {
    pub fn new(config: HttpChatGatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.config.token)
    }
}

/// 按字符截断到消息上限
fn clamp_message(text: &str) -> &str {
    match text.char_indices().nth(MAX_MESSAGE_LEN) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl ChatGatewayPort for HttpChatGateway {
    async fn send_message(&self, channel_id: ChannelId, text: &str) -> Result<MessageId, GatewayError> {
        let url = self.url(&format!("/channels/{}/messages", channel_id));
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth())
            .json(&CreateMessage { content: clamp_message(text) })
            .send()
            .await
            .map_err(|e| GatewayError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected(format!("HTTP {}: {}", status, error_text)));
        }

        let created: MessageCreated = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        Ok(created.id)
    }

    async fn voice_channel_of(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<Option<ChannelId>, GatewayError> {
        let url = self.url(&format!("/guilds/{}/voice-states/{}", guild_id, user_id));
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth())
            .send()
            .await
            .map_err(|e| GatewayError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected(format!("HTTP {}: {}", status, error_text)));
        }

        let state: VoiceState = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        Ok(state.channel_id)
    }
}
