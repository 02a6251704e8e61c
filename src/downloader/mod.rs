use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::common::models::{DownloadOutcome, MediaData, MediaDownloadRequest, MediaDownloadResponse};
use crate::common::response::{Message, Response, UnfinishedReason};
use crate::post_process::transcoder::{Transcoder, TranscodingEngine};

use self::core::VideoSource;
use self::host::VideoHost;

pub mod chunked;
pub mod core;
pub mod error;
pub mod host;
pub mod progress;

/// 下载流水线：链接标准化 → 下载视频 → 转换为音频
pub struct MediaDownloader<H, E> {
    source: Arc<VideoSource<H>>,
    transcoder: Arc<Transcoder<E>>,
}

impl<H, E> Clone for MediaDownloader<H, E> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            transcoder: Arc::clone(&self.transcoder),
        }
    }
}

impl<H, E> MediaDownloader<H, E>
where
    H: VideoHost + 'static,
    E: TranscodingEngine + 'static,
{
    pub fn new(source: VideoSource<H>, transcoder: Transcoder<E>) -> Self {
        Self {
            source: Arc::new(source),
            transcoder: Arc::new(transcoder),
        }
    }

    /// 检查链接格式，返回标准化后的链接
    pub fn is_uri_in_valid_format(&self, raw: &str) -> Option<String> {
        self.source.normalizer().normalize(raw)
    }

    /// 在后台启动下载，立即返回句柄
    pub fn download(&self, request: MediaDownloadRequest, cancel: CancellationToken) -> DownloadHandle {
        let (metadata_tx, metadata_rx) = oneshot::channel();
        let this = self.clone();
        let task = tokio::spawn(async move { this.run(request, metadata_tx, cancel).await });

        DownloadHandle {
            metadata: Some(metadata_rx),
            task,
        }
    }

    /// 在当前任务中执行整个流水线
    pub async fn run(
        &self,
        request: MediaDownloadRequest,
        metadata: oneshot::Sender<MediaData>,
        cancel: CancellationToken,
    ) -> MediaDownloadResponse {
        debug!("开始下载: {}", request.download_info.uri());

        let video = self
            .source
            .download(&request.download_info, &request.scratch_directory, metadata, &cancel)
            .await;
        let (video, mut messages) = match video.into_finished() {
            Ok(video) => video,
            Err(stop) => return stop,
        };

        let audio = self
            .transcoder
            .convert(&video.file, &request.target_directory, &cancel)
            .await;
        let (audio, audio_messages) = match audio.into_finished() {
            Ok(audio) => audio,
            Err(stop) => return stop.prepend_messages(messages),
        };
        messages.extend(audio_messages);

        // 临时视频文件不再需要
        if let Err(e) = tokio::fs::remove_file(&video.file).await {
            warn!("删除临时视频文件失败: {:?}: {}", video.file, e);
            messages.push(Message::warning(format!(
                "删除临时视频文件 {} 失败: {}",
                video.file.display(),
                e
            )));
        }

        info!("✅ 音频已保存: {:?}", audio.file);
        Response::finished(DownloadOutcome {
            file: audio.file,
            data: MediaData {
                title: video.title,
                duration: audio.duration,
            },
        })
        .with_messages(messages)
    }
}

/// 后台下载的句柄：先拿到标题，再等待最终结果
pub struct DownloadHandle {
    metadata: Option<oneshot::Receiver<MediaData>>,
    task: JoinHandle<MediaDownloadResponse>,
}

impl DownloadHandle {
    /// 标题确定后返回；流水线在此之前就结束时返回 `None`，之后再调用也返回 `None`
    pub async fn metadata(&mut self) -> Option<MediaData> {
        self.metadata.take()?.await.ok()
    }

    pub async fn finish(self) -> MediaDownloadResponse {
        match self.task.await {
            Ok(response) => response,
            Err(e) => Response::from_errors(
                UnfinishedReason::AudioDownloadError,
                [format!("下载任务异常终止: {}", e)],
            ),
        }
    }
}
