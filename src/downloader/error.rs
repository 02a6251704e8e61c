use thiserror::Error;

use crate::common::api::error::ApiError;

/// 视频托管方（查询和下载）相关的错误
#[derive(Debug, Error)]
pub enum HostError {
    #[error("未检测到 {0}，请确认已安装，或设置环境变量 YTDLP_PATH 指向可执行文件")]
    ToolNotFound(String),

    #[error("yt-dlp 执行失败: {0}")]
    ToolFailed(String),

    #[error("视频信息解析失败: {0}")]
    InvalidMetadata(#[from] serde_json::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
