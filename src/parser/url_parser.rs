use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;
use url::Url;

/// 默认要求主机名包含的字符
pub const REQUIRED_HOST_TOKEN: &str = "youtube";

lazy_static! {
    static ref SCHEME_PATTERN: Regex = Regex::new(r"(?i)^https?://").unwrap();
}

const SCHEME_SEPARATOR: &str = "://";

/// 校验并修复用户输入的视频链接，不访问网络
#[derive(Debug, Clone)]
pub struct UriNormalizer {
    required_host_token: String,
}

impl Default for UriNormalizer {
    fn default() -> Self {
        Self::new(REQUIRED_HOST_TOKEN)
    }
}

impl UriNormalizer {
    pub fn new(required_host_token: impl Into<String>) -> Self {
        Self {
            required_host_token: required_host_token.into().to_lowercase(),
        }
    }

    /// 标准化链接，成功时返回修复后的链接
    ///
    /// 1. 缺少 http/https 协议时补上 `https://`
    /// 2. 主机部分不含 `www` 时在协议分隔符后插入 `www.`
    /// 3. 解析为绝对地址，且主机名必须包含令牌中的每一个字符（逐字符检查，不是域名匹配）
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let mut candidate = if SCHEME_PATTERN.is_match(raw) {
            raw.to_string()
        } else {
            format!("https://{}", raw)
        };

        let host_start = candidate.find(SCHEME_SEPARATOR)? + SCHEME_SEPARATOR.len();
        let host_end = candidate[host_start..]
            .find(['/', '?', '#'])
            .map_or(candidate.len(), |i| host_start + i);
        if !candidate[host_start..host_end].to_lowercase().contains("www") {
            candidate.insert_str(host_start, "www.");
        }

        let url = match Url::parse(&candidate) {
            Ok(url) => url,
            Err(e) => {
                debug!("链接解析失败: {} ({})", candidate, e);
                return None;
            }
        };

        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }

        let host = url.host_str()?.to_lowercase();
        if !self.required_host_token.chars().all(|c| host.contains(c)) {
            debug!("主机名不匹配: {}", host);
            return None;
        }

        Some(candidate)
    }
}

/// 使用默认令牌检查链接格式
pub fn is_uri_in_valid_format(raw: &str) -> Option<String> {
    UriNormalizer::default().normalize(raw)
}
