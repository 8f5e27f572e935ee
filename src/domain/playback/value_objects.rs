//! Playback Context - Value Objects

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 线上格式里 snowflake 既可能是字符串也可能是数字
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSnowflake {
    Text(String),
    Number(u64),
}

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub fn get(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                match RawSnowflake::deserialize(deserializer)? {
                    RawSnowflake::Number(raw) => Ok(Self(raw)),
                    RawSnowflake::Text(text) => text.parse().map_err(serde::de::Error::custom),
                }
            }
        }
    };
}

snowflake_id!(
    /// Guild 唯一标识（会话隔离单元）
    GuildId
);
snowflake_id!(
    /// 文字或语音频道标识
    ChannelId
);
snowflake_id!(
    /// 用户标识
    UserId
);
snowflake_id!(
    /// 消息标识
    MessageId
);

/// 可播放曲目
///
/// 不可变值对象，只有值相等，没有独立身份。
/// `play_spec` 原样交给音频节点（编码后的曲目或直接定位符）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    pub play_spec: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl Track {
    pub fn new(title: impl Into<String>, play_spec: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            play_spec: play_spec.into(),
            uri: None,
        }
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }
}
