use tracing::debug;

use super::models::VideoVariant;

/// 选择音频码率最高的版本
///
/// 码率相同时保留最先出现的版本，保证结果稳定。
pub fn select_best_audio(variants: &[VideoVariant]) -> Option<&VideoVariant> {
    debug!("可用的视频版本数量: {}", variants.len());
    for (i, variant) in variants.iter().enumerate() {
        debug!(
            "版本 {}: 音频码率={}kbps, 格式={}",
            i, variant.audio_bitrate, variant.file_extension
        );
    }

    // max_by_key 在相等时返回最后一个，这里需要第一个
    let selected = variants.iter().fold(None::<&VideoVariant>, |best, v| match best {
        Some(b) if b.audio_bitrate >= v.audio_bitrate => Some(b),
        _ => Some(v),
    });

    if let Some(v) = selected {
        debug!("选择最高质量音频: {}kbps ({})", v.audio_bitrate, v.file_extension);
    }
    selected
}
