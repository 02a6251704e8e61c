pub mod common;
pub mod downloader;
pub mod parser;
pub mod post_process;

pub use common::models::{
    DownloadOutcome, MediaData, MediaDownloadRequest, MediaDownloadResponse, MediaSplitRequest,
    MediaSplitResponse, RemoteResourceDownloadInfo, SplitOutcome, TimeRange,
};
pub use common::response::{Message, MessageKind, Response, State, UnfinishedReason};
pub use downloader::{DownloadHandle, MediaDownloader};
pub use post_process::{FfmpegEngine, FrameSplitter, Transcoder};
