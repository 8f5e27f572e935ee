//! Audio Node Adapter - 音频节点客户端实现

mod fake_audio_node;
mod http_audio_node;
mod timeout;

pub use fake_audio_node::{FakeAudioNode, NodeCall, NodeOp};
pub use http_audio_node::{HttpAudioNodeClient, HttpAudioNodeConfig};
pub use timeout::TimeoutAudioNode;
