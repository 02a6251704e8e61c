use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use tracing::{debug, warn};

use super::error::ApiError;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36";

// 下载媒体文件用的客户端
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    pub fn new() -> Result<Self, ApiError> {
        let inner = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(10))
            .default_headers(Self::get_default_headers())
            .build()?;
        Ok(Self { inner })
    }

    pub fn get_default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9,zh-CN;q=0.8"));
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers
    }

    pub async fn get_raw_response(&self, url: &str) -> Result<Response, ApiError> {
        let resp = self.inner.get(url).send().await?;
        Self::check_response_status(&resp, url)?;
        Ok(resp)
    }

    /// 下载完整的响应体
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let response = self.get_raw_response(url).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        // 返回 HTML 多半是错误页面
        if content_type.contains("text/html") {
            warn!("URL 返回 HTML 内容，可能不是文件下载链接: {}", url);
            return Err(ApiError::UnexpectedContent(content_type));
        }

        let total_size = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|len| len.to_str().ok())
            .and_then(|len| len.parse::<usize>().ok())
            .unwrap_or(0);
        debug!("开始下载: {} ({} 字节)", url, total_size);

        let mut body = Vec::with_capacity(total_size);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk?);
        }

        debug!("下载完成: {} 字节", body.len());
        Ok(body)
    }

    // 检查响应状态并处理特殊情况
    fn check_response_status(response: &Response, url: &str) -> Result<(), ApiError> {
        let status = response.status();
        debug!("Response Status: {}", status);

        match status {
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
                warn!("🚫 检测到 {} 状态码，访问被拒绝", status);
                Err(ApiError::AccessDenied {
                    status: status.as_u16(),
                    url: url.to_string(),
                })
            }
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("⚠️ 检测到 429 Too Many Requests 状态码，请求过于频繁");
                Err(ApiError::RateLimited(url.to_string()))
            }
            status if status.is_success() => Ok(()),
            _ => {
                warn!("❌ 非成功状态码: {}", status);
                Err(ApiError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                })
            }
        }
    }
}
