use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use url::Url;

use tubesplit::downloader::core::VideoSource;
use tubesplit::downloader::error::HostError;
use tubesplit::downloader::host::VideoHost;
use tubesplit::parser::models::{HostedVideo, VideoVariant};
use tubesplit::post_process::error::TranscodeError;
use tubesplit::post_process::{AudioMetadata, TranscodingEngine};
use tubesplit::{
    MediaDownloadRequest, MediaDownloader, MessageKind, RemoteResourceDownloadInfo, Transcoder, UnfinishedReason,
};

const VIDEO_URI: &str = "youtube.com/watch?v=abc123";
const VIDEO_BYTES: &[u8] = b"not really a video, but the pipeline does not care";

struct FakeHost {
    title: String,
    variants: Vec<VideoVariant>,
    looked_up: Arc<Mutex<Vec<String>>>,
    payload: Vec<u8>,
    lookup_fails: bool,
    fetch_fails: bool,
    // 下载时触发取消，模拟传输中途被取消
    cancel_on_fetch: Option<CancellationToken>,
}

impl FakeHost {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            variants: vec![
                VideoVariant {
                    audio_bitrate: 48,
                    file_extension: "3gp".to_string(),
                    location: "low".to_string(),
                },
                VideoVariant {
                    audio_bitrate: 128,
                    file_extension: "mp4".to_string(),
                    location: "high".to_string(),
                },
            ],
            looked_up: Arc::new(Mutex::new(Vec::new())),
            payload: VIDEO_BYTES.to_vec(),
            lookup_fails: false,
            fetch_fails: false,
            cancel_on_fetch: None,
        }
    }

    fn without_variants(mut self) -> Self {
        self.variants.clear();
        self
    }

    fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    fn failing_lookup(mut self) -> Self {
        self.lookup_fails = true;
        self
    }

    fn failing_fetch(mut self) -> Self {
        self.fetch_fails = true;
        self
    }

    fn cancelling_on_fetch(mut self, cancel: CancellationToken) -> Self {
        self.cancel_on_fetch = Some(cancel);
        self
    }
}

#[async_trait]
impl VideoHost for FakeHost {
    async fn lookup(&self, uri: &Url) -> Result<HostedVideo, HostError> {
        self.looked_up.lock().unwrap().push(uri.to_string());
        if self.lookup_fails {
            return Err(HostError::ToolFailed("ERROR: Video unavailable".to_string()));
        }
        Ok(HostedVideo {
            title: self.title.clone(),
            variants: self.variants.clone(),
        })
    }

    async fn fetch(&self, variant: &VideoVariant) -> Result<Vec<u8>, HostError> {
        if variant.location != "high" {
            return Err(HostError::Other(format!("unexpected variant {}", variant.location)));
        }
        if self.fetch_fails {
            return Err(HostError::Other("connection reset by peer".to_string()));
        }
        if let Some(cancel) = &self.cancel_on_fetch {
            cancel.cancel();
        }
        Ok(self.payload.clone())
    }
}

#[derive(Default)]
struct FakeEngine {
    metadata_fails: bool,
}

#[async_trait]
impl TranscodingEngine for FakeEngine {
    async fn convert(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        let video = tokio::fs::read(input).await?;
        assert_eq!(video, VIDEO_BYTES);
        tokio::fs::write(output, b"ID3 fake mp3").await?;
        Ok(())
    }

    async fn read_metadata(&self, _input: &Path) -> Result<AudioMetadata, TranscodeError> {
        if self.metadata_fails {
            return Err(TranscodeError::Probe("no duration".to_string()));
        }
        Ok(AudioMetadata {
            duration: Some(Duration::from_secs(61)),
        })
    }
}

fn downloader(host: FakeHost, engine: FakeEngine) -> MediaDownloader<FakeHost, FakeEngine> {
    MediaDownloader::new(VideoSource::new(host), Transcoder::new(engine))
}

fn request(uri: &str, target: &Path) -> MediaDownloadRequest {
    MediaDownloadRequest::new(RemoteResourceDownloadInfo::with_default_chunk_size(uri), target)
}

#[tokio::test]
async fn test_invalid_uri_is_rejected() {
    let dir = TempDir::new().unwrap();
    let downloader = downloader(FakeHost::new("t"), FakeEngine::default());

    let mut handle = downloader.download(request("https://vimeo.com/1", dir.path()), CancellationToken::new());
    assert!(handle.metadata().await.is_none());

    let response = handle.finish().await;
    assert_eq!(response.unfinished_reason(), Some(UnfinishedReason::InvalidUri));
    assert!(response.has_errors());
}

#[tokio::test]
async fn test_no_variants_is_video_not_found() {
    let dir = TempDir::new().unwrap();
    let downloader = downloader(FakeHost::new("t").without_variants(), FakeEngine::default());

    let response = downloader
        .download(request(VIDEO_URI, dir.path()), CancellationToken::new())
        .finish()
        .await;
    assert_eq!(response.unfinished_reason(), Some(UnfinishedReason::VideoNotFound));
}

#[tokio::test]
async fn test_full_download_produces_audio_and_removes_video() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("music");
    let downloader = downloader(FakeHost::new("My: Song?"), FakeEngine::default());

    let mut handle = downloader.download(request(VIDEO_URI, &target), CancellationToken::new());
    let metadata = handle.metadata().await.expect("标题应当在下载前送达");
    assert_eq!(metadata.title, "My Song");
    assert_eq!(metadata.duration, None);

    let response = handle.finish().await;
    assert!(response.is_finished(), "{:?}", response.messages());
    assert!(!response.has_warnings());

    let outcome = response.value().unwrap();
    assert_eq!(outcome.file, target.join("My Song.mp3"));
    assert_eq!(outcome.data.title, "My Song");
    assert_eq!(outcome.data.duration, Some(Duration::from_secs(61)));
    assert!(outcome.file.exists());

    // 临时视频已被删除
    assert!(!target.join("tmp").join("My Song.mp4").exists());
}

#[tokio::test]
async fn test_host_sees_normalized_uri() {
    let host = FakeHost::new("t");
    let looked_up = Arc::clone(&host.looked_up);
    let source = VideoSource::new(host);

    let resolved = source.resolve(VIDEO_URI).await;
    assert!(resolved.is_finished());
    assert_eq!(resolved.value().unwrap().variant.audio_bitrate, 128);
    assert_eq!(
        looked_up.lock().unwrap().as_slice(),
        ["https://www.youtube.com/watch?v=abc123".to_string()]
    );
}

#[tokio::test]
async fn test_metadata_failure_is_only_a_warning() {
    let dir = TempDir::new().unwrap();
    let engine = FakeEngine { metadata_fails: true };
    let downloader = downloader(FakeHost::new("clip"), engine);

    let response = downloader
        .download(request(VIDEO_URI, dir.path()), CancellationToken::new())
        .finish()
        .await;
    assert!(response.is_finished());
    assert!(response.has_warnings());
    assert!(response.messages().iter().all(|m| m.kind == MessageKind::Warning));
    assert_eq!(response.value().unwrap().data.duration, None);
}

#[tokio::test]
async fn test_cancelled_before_transfer_creates_no_file() {
    let dir = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let downloader = downloader(FakeHost::new("clip"), FakeEngine::default());

    let mut handle = downloader.download(request(VIDEO_URI, dir.path()), cancel);
    assert!(handle.metadata().await.is_none());

    let response = handle.finish().await;
    assert!(response.is_cancelled());
    assert!(!dir.path().join("tmp").exists());
    assert!(!dir.path().join("clip.mp3").exists());
}

#[tokio::test]
async fn test_cancelled_after_fetch_creates_no_file() {
    let dir = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    let downloader = downloader(FakeHost::new("clip").cancelling_on_fetch(cancel.clone()), FakeEngine::default());

    let response = downloader
        .run(request(VIDEO_URI, dir.path()), tokio::sync::oneshot::channel().0, cancel)
        .await;
    assert!(response.is_cancelled());
    assert!(
        !response
            .messages()
            .iter()
            .any(|m| m.kind == MessageKind::Information)
    );
    assert!(!dir.path().join("tmp").join("clip.mp4").exists());
    assert!(!dir.path().join("clip.mp3").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelled_mid_transfer_leaves_partial_file() {
    let dir = TempDir::new().unwrap();
    let payload = vec![7u8; 1 << 20];
    let source = VideoSource::new(FakeHost::new("clip").with_payload(payload.clone()));
    let info = RemoteResourceDownloadInfo::new(VIDEO_URI, NonZeroUsize::new(1).unwrap());
    let cancel = CancellationToken::new();

    // 看到第一批字节落盘后立即取消
    let partial = dir.path().join("clip.mp4");
    let watcher = {
        let cancel = cancel.clone();
        let partial = partial.clone();
        tokio::spawn(async move {
            loop {
                if let Ok(metadata) = tokio::fs::metadata(&partial).await {
                    if metadata.len() > 0 {
                        cancel.cancel();
                        return;
                    }
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
    };

    let response = source
        .download(&info, dir.path(), tokio::sync::oneshot::channel().0, &cancel)
        .await;
    watcher.await.unwrap();

    assert!(response.is_cancelled());
    assert!(
        response
            .messages()
            .iter()
            .any(|m| m.kind == MessageKind::Information)
    );

    // 部分文件保留，由调用方决定如何清理
    let written = std::fs::metadata(&partial).unwrap().len();
    assert!(written > 0);
    assert!(written < payload.len() as u64);
}

#[tokio::test]
async fn test_lookup_failure_is_download_error() {
    let dir = TempDir::new().unwrap();
    let downloader = downloader(FakeHost::new("clip").failing_lookup(), FakeEngine::default());

    let response = downloader
        .download(request(VIDEO_URI, dir.path()), CancellationToken::new())
        .finish()
        .await;
    assert_eq!(response.unfinished_reason(), Some(UnfinishedReason::VideoDownloadError));
    assert!(response.messages()[0].content.contains("Video unavailable"));
}

#[tokio::test]
async fn test_fetch_failure_is_download_error() {
    let dir = TempDir::new().unwrap();
    let downloader = downloader(FakeHost::new("clip").failing_fetch(), FakeEngine::default());

    let response = downloader
        .download(request(VIDEO_URI, dir.path()), CancellationToken::new())
        .finish()
        .await;
    assert_eq!(response.unfinished_reason(), Some(UnfinishedReason::VideoDownloadError));
    assert!(!dir.path().join("tmp").exists());
}

#[tokio::test]
async fn test_unwritable_scratch_directory_is_file_writing_error() {
    let dir = TempDir::new().unwrap();
    // 临时目录的位置被一个普通文件占用
    let scratch = dir.path().join("scratch");
    std::fs::write(&scratch, b"occupied").unwrap();
    let downloader = downloader(FakeHost::new("clip"), FakeEngine::default());

    let response = downloader
        .download(
            request(VIDEO_URI, dir.path()).with_scratch_directory(&scratch),
            CancellationToken::new(),
        )
        .finish()
        .await;
    assert_eq!(response.unfinished_reason(), Some(UnfinishedReason::VideoFileWritingError));
    assert!(response.has_errors());
}
