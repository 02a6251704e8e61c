use serde::{Deserialize, Serialize};

/// 视频托管方返回的一个可下载版本
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoVariant {
    pub audio_bitrate: u64,     // 音频码率（kbps）
    pub file_extension: String, // 不带点，例如 "webm"
    pub location: String,       // 下载地址
}

/// 视频托管方查询到的视频信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedVideo {
    pub title: String,
    pub variants: Vec<VideoVariant>,
}
