use std::time::Duration;

use super::errors::ParseError;

/// 解析时间点，支持 `SS`、`MM:SS`、`HH:MM:SS`，秒可以带小数，例如 `01:02:03.5`
pub fn parse_timestamp(input: &str) -> Result<Duration, ParseError> {
    let invalid = || ParseError::InvalidTimestamp(input.to_string());
    let text = input.trim();
    if text.is_empty() {
        return Err(invalid());
    }

    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() > 3 {
        return Err(invalid());
    }

    // 最后一段是秒，前面依次是分钟和小时
    let (seconds, rest) = parts.split_last().ok_or_else(invalid)?;
    let seconds = parse_seconds(seconds).ok_or_else(invalid)?;

    let mut whole = 0u64;
    for (part, unit) in rest.iter().rev().zip([60u64, 3600]) {
        let value: u64 = part.parse().map_err(|_| invalid())?;
        whole = value
            .checked_mul(unit)
            .and_then(|v| v.checked_add(whole))
            .ok_or_else(invalid)?;
    }

    Duration::from_secs(whole).checked_add(seconds).ok_or_else(invalid)
}

fn parse_seconds(text: &str) -> Option<Duration> {
    let (int_part, frac_part) = match text.split_once('.') {
        Some((_, "")) => return None,
        Some((i, f)) => (i, f),
        None => (text, ""),
    };
    if int_part.is_empty() || !int_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if !frac_part.chars().all(|c| c.is_ascii_digit()) || frac_part.len() > 9 {
        return None;
    }
    let secs: u64 = int_part.parse().ok()?;
    let nanos = if frac_part.is_empty() {
        0
    } else {
        format!("{:0<9}", frac_part).parse::<u32>().ok()?
    };
    Some(Duration::new(secs, nanos))
}

/// 格式化时长为 `HH:MM:SS.mmm`
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;
    format!("{:02}:{:02}:{:02}.{:03}", hours, mins, secs, duration.subsec_millis())
}

// 格式化文件大小
pub fn format_size(size: u64) -> String {
    if size > 1024 * 1024 * 1024 {
        format!("{:.2} GB", size as f64 / 1024.0 / 1024.0 / 1024.0)
    } else if size > 1024 * 1024 {
        format!("{:.1} MB", size as f64 / 1024.0 / 1024.0)
    } else {
        format!("{:.1} KB", size as f64 / 1024.0)
    }
}

/// 把视频标题清理成合法的文件名
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .filter(|c| !c.is_control())
        .collect();
    // Windows 不允许文件名以点或空格结尾
    let cleaned = cleaned.trim().trim_end_matches(['.', ' ']).to_string();
    if cleaned.is_empty() {
        "video".to_string()
    } else {
        cleaned
    }
}
