use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::error::TranscodeError;
use crate::common::response::{Message, Response, UnfinishedReason};

/// 转换后的音频扩展名
pub const AUDIO_EXTENSION: &str = "mp3";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioMetadata {
    pub duration: Option<Duration>,
}

// 外部转码能力，编解码本身不在本 crate 中实现
#[async_trait]
pub trait TranscodingEngine: Send + Sync {
    async fn convert(&self, input: &Path, output: &Path) -> Result<(), TranscodeError>;

    async fn read_metadata(&self, input: &Path) -> Result<AudioMetadata, TranscodeError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFile {
    pub file: PathBuf,
    pub duration: Option<Duration>,
}

pub struct Transcoder<E> {
    engine: E,
}

impl<E: TranscodingEngine> Transcoder<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// 把视频转换为 `target_directory/{标题}.mp3`
    ///
    /// 取消只在外部转换调用的边界生效：调用前检查一次，调用过程中放弃等待，
    /// 调用结束后再检查一次。被取消时删除已产生的输出文件。
    pub async fn convert(
        &self,
        video_file: &Path,
        target_directory: &Path,
        cancel: &CancellationToken,
    ) -> Response<AudioFile> {
        if let Err(e) = tokio::fs::create_dir_all(target_directory).await {
            error!("❌ 创建音频目录失败: {:?}: {}", target_directory, e);
            return Response::from_errors(
                UnfinishedReason::AudioDownloadError,
                [format!("创建目录 {} 失败: {}", target_directory.display(), e)],
            );
        }

        let title = video_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        let output = target_directory.join(format!("{}.{}", title, AUDIO_EXTENSION));

        if cancel.is_cancelled() {
            return Response::cancelled([]);
        }

        debug!("开始转换: {:?} -> {:?}", video_file, output);
        let converted = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.engine.convert(video_file, &output) => Some(result),
        };

        match converted {
            Some(Ok(())) if !cancel.is_cancelled() => {}
            Some(Err(e)) => {
                error!("❌ 音频转换失败: {}", e);
                return Response::from_errors(UnfinishedReason::VideoToAudioConversionError, [e.to_string()]);
            }
            // 转换期间或刚结束时被取消
            _ => {
                remove_partial_output(&output).await;
                return Response::cancelled([Message::information("音频转换已取消")]);
            }
        }

        // 时长只是参考信息，读取失败不影响结果
        let mut messages = Vec::new();
        let duration = match self.engine.read_metadata(&output).await {
            Ok(metadata) => metadata.duration,
            Err(e) => {
                warn!("读取音频时长失败: {:?}: {}", output, e);
                messages.push(Message::warning(format!("读取音频时长失败: {}", e)));
                None
            }
        };

        info!("✅ 音频转换完成: {:?}", output);
        Response::finished(AudioFile {
            file: output,
            duration,
        })
        .with_messages(messages)
    }
}

async fn remove_partial_output(output: &Path) {
    match tokio::fs::remove_file(output).await {
        Ok(()) => debug!("已删除未完成的输出: {:?}", output),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("删除未完成的输出失败: {:?}: {}", output, e),
    }
}
