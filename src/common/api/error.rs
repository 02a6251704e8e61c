use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("网络请求失败: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("访问被拒绝 ({status})，URL: {url}")]
    AccessDenied { status: u16, url: String },

    #[error("请求过于频繁 (429 Too Many Requests)，URL: {0}")]
    RateLimited(String),

    #[error("HTTP 请求失败，状态码: {status}，URL: {url}")]
    Status { status: u16, url: String },

    #[error("响应内容不是媒体文件: {0}")]
    UnexpectedContent(String),
}
