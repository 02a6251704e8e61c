use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("未检测到 {0}，请确保系统中已安装 ffmpeg，或设置环境变量 FFMPEG_PATH / FFPROBE_PATH")]
    ToolNotFound(String),

    #[error("ffmpeg 转换失败: {0}")]
    Ffmpeg(String),

    #[error("ffprobe 读取失败: {0}")]
    Probe(String),

    #[error("媒体信息解析失败: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("ID3 标签不完整，需要 {expected} 字节，实际只有 {actual} 字节")]
    TruncatedTag { expected: usize, actual: usize },

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SplitError {
    #[error("音频帧读取失败: {0}")]
    Frame(#[from] FrameError),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}
