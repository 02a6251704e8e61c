use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::common::response::Response;
use crate::parser::errors::ParseError;
use crate::parser::utils::parse_timestamp;

/// 默认的下载分块大小（80 KiB）
pub const DEFAULT_CHUNK_SIZE: usize = 81_920;

// -----------------------------------------------------------------------------------------------

/// 要下载的远程资源以及写盘时的分块大小
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResourceDownloadInfo {
    uri: String,
    chunk_size: NonZeroUsize,
}

impl RemoteResourceDownloadInfo {
    pub fn new(uri: impl Into<String>, chunk_size: NonZeroUsize) -> Self {
        Self {
            uri: uri.into(),
            chunk_size,
        }
    }

    pub fn with_default_chunk_size(uri: impl Into<String>) -> Self {
        Self::new(uri, NonZeroUsize::new(DEFAULT_CHUNK_SIZE).unwrap_or(NonZeroUsize::MIN))
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn chunk_size(&self) -> NonZeroUsize {
        self.chunk_size
    }
}

/// 一次下载请求
///
/// 视频先写入 `scratch_directory`，转换后的音频写入 `target_directory`，两个路径都按原样使用。
#[derive(Debug, Clone)]
pub struct MediaDownloadRequest {
    pub download_info: RemoteResourceDownloadInfo,
    pub scratch_directory: PathBuf,
    pub target_directory: PathBuf,
}

impl MediaDownloadRequest {
    pub fn new(download_info: RemoteResourceDownloadInfo, target_directory: impl Into<PathBuf>) -> Self {
        let target_directory = target_directory.into();
        Self {
            download_info,
            scratch_directory: target_directory.join("tmp"),
            target_directory,
        }
    }

    pub fn with_scratch_directory(mut self, scratch_directory: impl Into<PathBuf>) -> Self {
        self.scratch_directory = scratch_directory.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaData {
    pub title: String,
    pub duration: Option<Duration>, // 只有音频阶段完成后才知道
}

impl MediaData {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            duration: None,
        }
    }
}

// -----------------------------------------------------------------------------------------------

/// 闭区间时间段，构造时自动保证 `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeRange {
    start: Duration,
    end: Duration,
}

impl TimeRange {
    pub fn new(a: Duration, b: Duration) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    pub fn start(&self) -> Duration {
        self.start
    }

    pub fn end(&self) -> Duration {
        self.end
    }

    pub fn contains(&self, position: Duration) -> bool {
        self.start <= position && position <= self.end
    }
}

impl FromStr for TimeRange {
    type Err = ParseError;

    // 格式: START-END，例如 00:00:20-00:00:25
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (a, b) = s
            .split_once('-')
            .ok_or_else(|| ParseError::InvalidTimeRange(s.to_string()))?;
        Ok(Self::new(parse_timestamp(a)?, parse_timestamp(b)?))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MediaSplitRequest {
    pub source_file: PathBuf,
    pub destination_file: PathBuf,
    pub start: Option<Duration>, // None 表示从头开始
    pub end: Option<Duration>,   // None 表示直到结尾
    pub excluded_ranges: Vec<TimeRange>,
}

impl MediaSplitRequest {
    pub fn new(source_file: impl Into<PathBuf>, destination_file: impl Into<PathBuf>) -> Self {
        Self {
            source_file: source_file.into(),
            destination_file: destination_file.into(),
            ..Default::default()
        }
    }

    /// 源文件与目标文件相同的原地切分
    pub fn in_place(file: impl Into<PathBuf>) -> Self {
        let file = file.into();
        Self::new(file.clone(), file)
    }

    pub fn starting_at(mut self, start: Duration) -> Self {
        self.start = Some(start);
        self
    }

    pub fn ending_at(mut self, end: Duration) -> Self {
        self.end = Some(end);
        self
    }

    pub fn excluding(mut self, range: TimeRange) -> Self {
        self.excluded_ranges.push(range);
        self
    }

    pub fn is_excluded(&self, position: Duration) -> bool {
        self.excluded_ranges.iter().any(|r| r.contains(position))
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub file: PathBuf,
    pub data: MediaData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutcome {
    pub source_file: PathBuf, // 原地切分时为临时文件路径
    pub split_file: PathBuf,
}

pub type MediaDownloadResponse = Response<DownloadOutcome>;
pub type MediaSplitResponse = Response<SplitOutcome>;
