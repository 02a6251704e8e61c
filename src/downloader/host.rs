use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};
use url::Url;

use super::error::HostError;
use crate::common::api::client::HttpClient;
use crate::parser::models::{HostedVideo, VideoVariant};

// 视频托管方的能力接口：查询所有版本，下载某个版本的原始字节
#[async_trait]
pub trait VideoHost: Send + Sync {
    async fn lookup(&self, uri: &Url) -> Result<HostedVideo, HostError>;

    async fn fetch(&self, variant: &VideoVariant) -> Result<Vec<u8>, HostError>;
}

// -----------------------------------------------------------------------------------------------

/// 基于 yt-dlp 的托管方实现：yt-dlp 只负责解析格式列表，字节由 [`HttpClient`] 下载
pub struct YtDlpHost {
    program: String,
    client: HttpClient,
}

impl YtDlpHost {
    pub fn new(client: HttpClient) -> Self {
        // 获取 yt-dlp 路径（支持环境变量）
        let program = std::env::var("YTDLP_PATH").unwrap_or_else(|_| "yt-dlp".to_string());
        Self { program, client }
    }

    pub fn from_env() -> Result<Self, HostError> {
        Ok(Self::new(HttpClient::new()?))
    }
}

#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: String,
    #[serde(default)]
    formats: Vec<YtDlpFormat>,
}

#[derive(Debug, Deserialize)]
struct YtDlpFormat {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    ext: Option<String>,
    #[serde(default)]
    acodec: Option<String>,
    #[serde(default)]
    abr: Option<f64>,
}

impl YtDlpInfo {
    fn into_hosted_video(self) -> HostedVideo {
        let variants = self
            .formats
            .into_iter()
            // 纯视频流没有音轨
            .filter(|f| f.acodec.as_deref() != Some("none"))
            .filter_map(|f| {
                let location = f.url?;
                Some(VideoVariant {
                    audio_bitrate: f.abr.unwrap_or(0.0).max(0.0).round() as u64,
                    file_extension: f.ext.unwrap_or_else(|| "mp4".to_string()),
                    location,
                })
            })
            .collect();

        HostedVideo {
            title: self.title,
            variants,
        }
    }
}

#[async_trait]
impl VideoHost for YtDlpHost {
    async fn lookup(&self, uri: &Url) -> Result<HostedVideo, HostError> {
        debug!("使用 {} 查询视频信息: {}", self.program, uri);

        let output = Command::new(&self.program)
            .args(["--dump-json", "--no-playlist", "--no-warnings"])
            .arg(uri.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => HostError::ToolNotFound(self.program.clone()),
                _ => HostError::Io(e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HostError::ToolFailed(stderr.trim().to_string()));
        }

        let info: YtDlpInfo = serde_json::from_slice(&output.stdout)?;
        let hosted = info.into_hosted_video();
        info!("查询到视频: {} ({} 个含音频的版本)", hosted.title, hosted.variants.len());
        Ok(hosted)
    }

    async fn fetch(&self, variant: &VideoVariant) -> Result<Vec<u8>, HostError> {
        Ok(self.client.fetch_bytes(&variant.location).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_formats_with_audio_become_variants() {
        let json = r#"{
            "title": "Test Video",
            "formats": [
                {"format_id": "137", "url": "https://cdn/v", "ext": "mp4", "acodec": "none", "vcodec": "avc1"},
                {"format_id": "140", "url": "https://cdn/a", "ext": "m4a", "acodec": "mp4a.40.2", "abr": 129.47},
                {"format_id": "251", "url": "https://cdn/o", "ext": "webm", "acodec": "opus", "abr": 160.0},
                {"format_id": "sb0", "ext": "mhtml", "acodec": "mp4a"}
            ]
        }"#;
        let info: YtDlpInfo = serde_json::from_str(json).unwrap();
        let hosted = info.into_hosted_video();

        assert_eq!(hosted.title, "Test Video");
        assert_eq!(hosted.variants.len(), 2);
        assert_eq!(hosted.variants[0].audio_bitrate, 129);
        assert_eq!(hosted.variants[1].file_extension, "webm");
    }

    #[test]
    fn test_missing_formats_is_empty() {
        let info: YtDlpInfo = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
        assert!(info.into_hosted_video().variants.is_empty());
    }
}
