//! HTTP Audio Node Client - 调用远程音频节点 REST 接口
//!
//! 实现 AudioNodePort trait
//!
//! 节点 API（所有请求携带 `Authorization: {password}`）:
//! - GET    /version
//! - GET    /v4/loadtracks?identifier=...
//! - POST   /v4/players/{guild}/connect   {"channelId": "..."}
//! - POST   /v4/players/{guild}/play      {"encoded": "..."}
//! - POST   /v4/players/{guild}/skip      {"encoded": "..." | null}
//! - POST   /v4/players/{guild}/pause     {"paused": true}
//! - DELETE /v4/players/{guild}

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::ports::{AudioNodeError, AudioNodePort};
use crate::domain::playback::{ChannelId, GuildId, Track};

/// HTTP 音频节点客户端配置
#[derive(Debug, Clone)]
pub struct HttpAudioNodeConfig {
    /// 节点基础 URL
    pub base_url: String,
    /// 节点密码
    pub password: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for HttpAudioNodeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:2333".to_string(),
            password: String::new(),
            timeout_secs: 10,
        }
    }
}

impl HttpAudioNodeConfig {
    pub fn new(base_url: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

#[derive(Debug, Deserialize)]
struct TrackInfo {
    title: String,
    #[serde(default)]
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NodeTrack {
    encoded: String,
    info: TrackInfo,
}

impl From<NodeTrack> for Track {
    fn from(raw: NodeTrack) -> Self {
        Track {
            title: raw.info.title,
            play_spec: raw.encoded,
            uri: raw.info.uri,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoadError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Playlist {
    tracks: Vec<NodeTrack>,
}

/// loadtracks 响应
#[derive(Debug, Deserialize)]
#[serde(tag = "loadType", content = "data", rename_all = "lowercase")]
enum LoadResult {
    Track(NodeTrack),
    Playlist(Playlist),
    Search(Vec<NodeTrack>),
    Empty(IgnoredAny),
    Error(LoadError),
}

impl LoadResult {
    fn into_tracks(self) -> Result<Vec<Track>, AudioNodeError> {
        match self {
            LoadResult::Track(track) => Ok(vec![track.into()]),
            LoadResult::Playlist(playlist) => {
                Ok(playlist.tracks.into_iter().map(Track::from).collect())
            }
            LoadResult::Search(tracks) => Ok(tracks.into_iter().map(Track::from).collect()),
            LoadResult::Empty(_) => Ok(Vec::new()),
            LoadResult::Error(err) => Err(AudioNodeError::Rejected(
                err.message.unwrap_or_else(|| "load failed".to_string()),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConnectBody {
    channel_id: ChannelId,
}

#[derive(Debug, Serialize)]
struct PlayBody<'a> {
    encoded: &'a str,
}

#[derive(Debug, Serialize)]
struct SkipBody<'a> {
    encoded: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct PauseBody {
    paused: bool,
}

/// HTTP 音频节点客户端
pub struct HttpAudioNodeClient {
    client: Client,
    config: HttpAudioNodeConfig,
}

impl HttpAudioNodeClient {
    pub fn new(config: HttpAudioNodeConfig) -> Result<Self, AudioNodeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AudioNodeError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn player_url(&self, guild_id: GuildId, action: Option<&str>) -> String {
        match action {
            Some(action) => self.url(&format!("/v4/players/{}/{}", guild_id, action)),
            None => self.url(&format!("/v4/players/{}", guild_id)),
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, AudioNodeError> {
        let response = request
            .header("Authorization", &self.config.password)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AudioNodeError::Rejected(format!("HTTP {}: {}", status, error_text)));
        }
        Ok(response)
    }

    async fn player_command<B: Serialize + Sync>(
        &self,
        guild_id: GuildId,
        action: &str,
        body: &B,
    ) -> Result<(), AudioNodeError> {
        let url = self.player_url(guild_id, Some(action));
        tracing::debug!(url = %url, guild_id = %guild_id, "Sending player command");
        self.send(self.client.post(&url).json(body)).await?;
        Ok(())
    }
}

fn map_reqwest_error(e: reqwest::Error) -> AudioNodeError {
    if e.is_timeout() {
        AudioNodeError::Timeout
    } else if e.is_connect() {
        AudioNodeError::NetworkError(format!("Cannot connect to audio node: {}", e))
    } else {
        AudioNodeError::NetworkError(e.to_string())
    }
}

#[async_trait]
impl AudioNodePort for HttpAudioNodeClient {
    async fn is_ready(&self) -> bool {
        match self
            .client
            .get(&self.url("/version"))
            .header("Authorization", &self.config.password)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<Track>, AudioNodeError> {
        let request = self
            .client
            .get(&self.url("/v4/loadtracks"))
            .query(&[("identifier", query)]);
        let response = self.send(request).await?;

        let result: LoadResult = response
            .json()
            .await
            .map_err(|e| AudioNodeError::InvalidResponse(e.to_string()))?;
        let tracks = result.into_tracks()?;

        tracing::debug!(identifier = %query, results = tracks.len(), "Search completed");
        Ok(tracks)
    }

    async fn connect(&self, guild_id: GuildId, voice_channel_id: ChannelId) -> Result<(), AudioNodeError> {
        self.player_command(guild_id, "connect", &ConnectBody { channel_id: voice_channel_id })
            .await
    }

    async fn play(&self, guild_id: GuildId, track: &Track) -> Result<(), AudioNodeError> {
        self.player_command(guild_id, "play", &PlayBody { encoded: &track.play_spec })
            .await
    }

    async fn skip(&self, guild_id: GuildId, next: Option<&Track>) -> Result<(), AudioNodeError> {
        let body = SkipBody {
            encoded: next.map(|t| t.play_spec.as_str()),
        };
        self.player_command(guild_id, "skip", &body).await
    }

    async fn set_paused(&self, guild_id: GuildId, paused: bool) -> Result<(), AudioNodeError> {
        self.player_command(guild_id, "pause", &PauseBody { paused }).await
    }

    async fn destroy(&self, guild_id: GuildId) -> Result<(), AudioNodeError> {
        let url = self.player_url(guild_id, None);
        self.send(self.client.delete(&url)).await?;
        tracing::debug!(guild_id = %guild_id, "Player destroyed");
        Ok(())
    }
}
