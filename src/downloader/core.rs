use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use super::chunked::{ChunkedTransfer, TransferStatus};
use super::host::VideoHost;
use super::progress::transfer_bar;
use crate::common::models::{MediaData, RemoteResourceDownloadInfo};
use crate::common::response::{Message, Response, UnfinishedReason};
use crate::parser::models::VideoVariant;
use crate::parser::stream_selector::select_best_audio;
use crate::parser::url_parser::UriNormalizer;
use crate::parser::utils::{format_size, sanitize_title};

/// 解析后的视频：清理过的标题和音频码率最高的版本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVideo {
    pub title: String,
    pub variant: VideoVariant,
}

impl ResolvedVideo {
    pub fn file_extension(&self) -> &str {
        &self.variant.file_extension
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.title, self.file_extension())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedVideo {
    pub file: PathBuf,
    pub title: String,
}

pub struct VideoSource<H> {
    host: H,
    normalizer: UriNormalizer,
    show_progress: bool,
}

impl<H: VideoHost> VideoSource<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            normalizer: UriNormalizer::default(),
            show_progress: false,
        }
    }

    pub fn with_normalizer(mut self, normalizer: UriNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn normalizer(&self) -> &UriNormalizer {
        &self.normalizer
    }

    /// 标准化链接并选出音频码率最高的版本，不下载任何字节
    pub async fn resolve(&self, raw_uri: &str) -> Response<ResolvedVideo> {
        let Some(normalized) = self.normalizer.normalize(raw_uri) else {
            warn!("无效的视频链接: {}", raw_uri);
            return Response::from_errors(
                UnfinishedReason::InvalidUri,
                [format!("无效的视频链接: {}", raw_uri)],
            );
        };

        let uri = match Url::parse(&normalized) {
            Ok(uri) => uri,
            Err(e) => {
                return Response::from_errors(UnfinishedReason::InvalidUri, [e.to_string()]);
            }
        };

        let hosted = match self.host.lookup(&uri).await {
            Ok(hosted) => hosted,
            Err(e) => {
                error!("❌ 查询视频信息失败: {}", e);
                return Response::from_errors(UnfinishedReason::VideoDownloadError, [e.to_string()]);
            }
        };

        let Some(variant) = select_best_audio(&hosted.variants).cloned() else {
            warn!("没有可下载的版本: {}", uri);
            return Response::from_errors(
                UnfinishedReason::VideoNotFound,
                [format!("没有找到可下载的视频: {}", uri)],
            );
        };

        Response::finished(ResolvedVideo {
            title: sanitize_title(&hosted.title),
            variant,
        })
    }

    /// 解析并下载视频到 `directory`，标题确定后立即通过 `metadata` 发送一次
    pub async fn download(
        &self,
        info: &RemoteResourceDownloadInfo,
        directory: &Path,
        metadata: oneshot::Sender<MediaData>,
        cancel: &CancellationToken,
    ) -> Response<DownloadedVideo> {
        let (resolved, messages) = match self.resolve(info.uri()).await.into_finished() {
            Ok(resolved) => resolved,
            Err(stop) => return stop,
        };

        // 开始传输前检查一次，避免无用的 IO
        if cancel.is_cancelled() {
            debug!("下载开始前已取消: {}", resolved.title);
            return Response::cancelled(messages);
        }

        if metadata.send(MediaData::titled(&resolved.title)).is_err() {
            debug!("元数据接收方已关闭");
        }

        let data = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Response::cancelled(messages);
            }
            fetched = self.host.fetch(&resolved.variant) => match fetched {
                Ok(data) => data,
                Err(e) => {
                    error!("❌ 视频下载失败: {}", e);
                    return Response::from_errors(UnfinishedReason::VideoDownloadError, [e.to_string()])
                        .prepend_messages(messages);
                }
            },
        };
        debug!("已获取视频数据: {}", format_size(data.len() as u64));

        // 数据尚未落盘，此时取消不应留下任何文件
        if cancel.is_cancelled() {
            debug!("写入开始前已取消: {}", resolved.title);
            return Response::cancelled(messages);
        }

        let file_path = directory.join(resolved.file_name());
        match self.write_file(&file_path, &data, info, &resolved.title, cancel).await {
            Ok(TransferStatus::Completed) => {
                info!("✅ 视频下载完成: {:?}", file_path);
                Response::finished(DownloadedVideo {
                    file: file_path,
                    title: resolved.title,
                })
                .with_messages(messages)
            }
            Ok(TransferStatus::Cancelled { written: 0 }) => {
                // 一个字节都没写入，空文件没有保留的意义
                if let Err(e) = tokio::fs::remove_file(&file_path).await {
                    warn!("删除空文件失败: {:?}: {}", file_path, e);
                }
                Response::cancelled(messages)
            }
            Ok(TransferStatus::Cancelled { written }) => Response::cancelled(messages).with_message(
                Message::information(format!(
                    "下载已取消，已写入 {} 字节的部分文件保留在 {}",
                    written,
                    file_path.display()
                )),
            ),
            Err(e) => {
                error!("❌ 视频文件写入失败: {:?}: {}", file_path, e);
                Response::from_errors(
                    UnfinishedReason::VideoFileWritingError,
                    [format!("写入 {} 失败: {}", file_path.display(), e)],
                )
                .prepend_messages(messages)
            }
        }
    }

    async fn write_file(
        &self,
        file_path: &Path,
        data: &[u8],
        info: &RemoteResourceDownloadInfo,
        title: &str,
        cancel: &CancellationToken,
    ) -> std::io::Result<TransferStatus> {
        if let Some(directory) = file_path.parent() {
            tokio::fs::create_dir_all(directory).await?;
        }

        let mut transfer = ChunkedTransfer::new(info.chunk_size());
        if self.show_progress {
            transfer = transfer.with_progress(transfer_bar(data.len() as u64, title));
        }

        let mut file = File::create(file_path).await?;
        transfer.write_in_chunks(&mut file, data, cancel).await
    }
}
