use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, error, info};

use super::error::TranscodeError;
use super::transcoder::{AudioMetadata, TranscodingEngine};

/// 调用系统 ffmpeg / ffprobe 的转码引擎
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    ffmpeg: String,
    ffprobe: String,
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::from_env()
    }
}

impl FfmpegEngine {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// 获取 ffmpeg / ffprobe 路径（支持环境变量）
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            std::env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
        )
    }

    // 检查 ffmpeg 是否可用
    async fn ensure_available(&self) -> Result<(), TranscodeError> {
        debug!("检查系统中是否安装了 ffmpeg...");
        let status = Command::new(&self.ffmpeg)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => {
                error!("❌ 未检测到 ffmpeg，请确保系统中已安装并配置了 ffmpeg 可执行路径。");
                error!("安装方法参考：https://ffmpeg.org/download.html");
                Err(TranscodeError::ToolNotFound(self.ffmpeg.clone()))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    duration: Option<String>,
}

fn parse_probe_duration(stdout: &[u8]) -> Result<Option<Duration>, TranscodeError> {
    let probe: ProbeOutput = serde_json::from_slice(stdout)?;
    Ok(probe
        .format
        .duration
        .and_then(|d| d.trim().parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok()))
}

#[async_trait]
impl TranscodingEngine for FfmpegEngine {
    async fn convert(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        self.ensure_available().await?;

        // 进程随 future 一起丢弃时会被终止
        let result = Command::new(&self.ffmpeg)
            .arg("-i")
            .arg(input)
            .args(["-vn", "-c:a", "libmp3lame", "-q:a", "2"])
            .arg("-y") // 自动覆盖
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !result.status.success() {
            let err_msg = String::from_utf8_lossy(&result.stderr);
            error!("❌ ffmpeg 转换失败，错误日志如下：\n{}", err_msg);
            return Err(TranscodeError::Ffmpeg(err_msg.trim().to_string()));
        }

        info!("✅ 视频转换为音频成功，输出文件: {:?}", output);
        Ok(())
    }

    async fn read_metadata(&self, input: &Path) -> Result<AudioMetadata, TranscodeError> {
        let result = Command::new(&self.ffprobe)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => TranscodeError::ToolNotFound(self.ffprobe.clone()),
                _ => TranscodeError::Io(e),
            })?;

        if !result.status.success() {
            let err_msg = String::from_utf8_lossy(&result.stderr);
            return Err(TranscodeError::Probe(err_msg.trim().to_string()));
        }

        Ok(AudioMetadata {
            duration: parse_probe_duration(&result.stdout)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_duration() {
        let json = br#"{"format": {"filename": "a.mp3", "duration": "183.456000"}}"#;
        assert_eq!(
            parse_probe_duration(json).unwrap(),
            Some(Duration::from_micros(183_456_000))
        );
    }

    #[test]
    fn test_parse_probe_without_duration() {
        assert_eq!(parse_probe_duration(br#"{"format": {}}"#).unwrap(), None);
        assert!(parse_probe_duration(b"not json").is_err());
    }
}
