use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::error::SplitError;
use super::mp3::Mp3FrameReader;
use crate::common::models::{MediaSplitRequest, MediaSplitResponse, SplitOutcome};
use crate::common::response::{Message, Response, UnfinishedReason};
use crate::parser::utils::format_duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SplitStatus {
    Completed { frames_read: u64, frames_written: u64 },
    Cancelled,
}

/// 按帧切分 MP3：帧原样拷贝，不重新编码
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameSplitter;

impl FrameSplitter {
    pub fn new() -> Self {
        Self
    }

    pub async fn split(&self, request: &MediaSplitRequest, cancel: &CancellationToken) -> MediaSplitResponse {
        if cancel.is_cancelled() {
            return Response::cancelled([]);
        }

        debug!(
            "开始切分: {:?} -> {:?} (起点 {:?}, 终点 {:?}, 排除 {} 段)",
            request.source_file,
            request.destination_file,
            request.start.map(format_duration),
            request.end.map(format_duration),
            request.excluded_ranges.len()
        );

        // 原地切分：源文件先移到同目录下的临时文件，目标再以原名写入
        let aliased = is_same_file(&request.source_file, &request.destination_file).await;
        let source = if aliased {
            let temporary = temporary_path(&request.source_file);
            if let Err(e) = tokio::fs::rename(&request.source_file, &temporary).await {
                error!("❌ 重命名源文件失败: {:?}: {}", request.source_file, e);
                return Response::from_errors(
                    UnfinishedReason::AudioSplitError,
                    [format!("重命名 {} 失败: {}", request.source_file.display(), e)],
                );
            }
            debug!("源文件已移至临时路径: {:?}", temporary);
            temporary
        } else {
            request.source_file.clone()
        };

        let mut messages = Vec::new();
        let result = copy_frames(&source, request, cancel, &mut messages).await;

        let keep_notice = || {
            Message::information(format!("原始音频保留在临时文件 {}", source.display()))
        };

        match result {
            Ok(SplitStatus::Completed {
                frames_read,
                frames_written,
            }) => {
                if frames_read == 0 {
                    warn!("源文件中没有可识别的音频帧: {:?}", source);
                    messages.push(Message::warning(format!(
                        "源文件 {} 中没有可识别的音频帧",
                        source.display()
                    )));
                }
                if aliased {
                    if let Err(e) = tokio::fs::remove_file(&source).await {
                        warn!("删除临时文件失败: {:?}: {}", source, e);
                        messages.push(Message::warning(format!("删除临时文件 {} 失败: {}", source.display(), e)));
                    }
                }

                info!(
                    "✅ 切分完成: {:?} ({}/{} 帧)",
                    request.destination_file, frames_written, frames_read
                );
                Response::finished(SplitOutcome {
                    source_file: source.clone(),
                    split_file: request.destination_file.clone(),
                })
                .with_messages(messages)
            }
            Ok(SplitStatus::Cancelled) => {
                debug!("切分已取消: {:?}", request.destination_file);
                if aliased {
                    messages.push(keep_notice());
                }
                Response::cancelled(messages)
            }
            Err(e) => {
                error!("❌ 音频切分失败: {}", e);
                let mut response =
                    Response::from_errors(UnfinishedReason::AudioSplitError, [e.to_string()]).prepend_messages(messages);
                if aliased {
                    response = response.with_message(keep_notice());
                }
                response
            }
        }
    }
}

async fn copy_frames(
    source: &Path,
    request: &MediaSplitRequest,
    cancel: &CancellationToken,
    messages: &mut Vec<Message>,
) -> Result<SplitStatus, SplitError> {
    let destination = &request.destination_file;

    // 切分总是覆盖已有的目标文件
    if tokio::fs::try_exists(destination).await? {
        warn!("目标文件已存在，将被覆盖: {:?}", destination);
        messages.push(Message::warning(format!("目标文件 {} 已存在，已覆盖", destination.display())));
        tokio::fs::remove_file(destination).await?;
    }
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut reader = Mp3FrameReader::open(File::open(source).await?).await?;
    let mut output = BufWriter::new(File::create(destination).await?);
    write_frames(&mut reader, &mut output, request, cancel).await
}

async fn write_frames<R, W>(
    reader: &mut Mp3FrameReader<R>,
    output: &mut W,
    request: &MediaSplitRequest,
    cancel: &CancellationToken,
) -> Result<SplitStatus, SplitError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    output.write_all(reader.leading_tag()).await?;

    // 第一帧无条件写入，播放器需要其中的格式信息
    let Some(first) = reader.next_frame().await? else {
        output.flush().await?;
        return Ok(SplitStatus::Completed {
            frames_read: 0,
            frames_written: 0,
        });
    };
    output.write_all(&first.raw).await?;
    let mut frames_read = 1;
    let mut frames_written = 1;

    loop {
        if cancel.is_cancelled() {
            output.flush().await?;
            return Ok(SplitStatus::Cancelled);
        }

        let Some(frame) = reader.next_frame().await? else {
            break;
        };
        frames_read += 1;

        let position = reader.position();
        if request.end.is_some_and(|end| position >= end) {
            debug!("到达终点 {}，停止读取", format_duration(position));
            break;
        }
        if request.start.is_some_and(|start| position < start) {
            continue;
        }
        if request.is_excluded(position) {
            continue;
        }

        output.write_all(&frame.raw).await?;
        frames_written += 1;
    }

    output.flush().await?;
    Ok(SplitStatus::Completed {
        frames_read,
        frames_written,
    })
}

async fn is_same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn temporary_path(file: &Path) -> PathBuf {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    file.with_file_name(format!("{}.{}.tmp", name, Uuid::new_v4().simple()))
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;

    use tokio::io::ReadBuf;

    use super::*;

    // MPEG-1 Layer III, 128 kbps, 48000 Hz：每帧 384 字节
    const HEADER: [u8; 4] = [0xFF, 0xFB, 0x94, 0x00];
    const FRAME_LEN: usize = 384;

    fn mp3(frames: usize) -> Vec<u8> {
        let mut data = vec![0u8; frames * FRAME_LEN];
        for raw in data.chunks_exact_mut(FRAME_LEN) {
            raw[..4].copy_from_slice(&HEADER);
        }
        data
    }

    // 每次最多给出 step 字节，累计读出 trip_at 字节后触发取消
    struct TrippingReader {
        data: Vec<u8>,
        pos: usize,
        step: usize,
        trip_at: usize,
        token: CancellationToken,
    }

    impl AsyncRead for TrippingReader {
        fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
            let end = (self.pos + self.step).min(self.data.len()).min(self.pos + buf.remaining());
            let chunk = self.data[self.pos..end].to_vec();
            buf.put_slice(&chunk);
            self.pos = end;
            if self.pos >= self.trip_at {
                self.token.cancel();
            }
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_cancellation_mid_stream_stops_between_frames() {
        let total = 100;
        let token = CancellationToken::new();
        let source = TrippingReader {
            data: mp3(total),
            pos: 0,
            step: 1000,
            trip_at: 4000,
            token: token.clone(),
        };

        let mut reader = Mp3FrameReader::open(source).await.unwrap();
        let mut output = Vec::new();
        let request = MediaSplitRequest::new("in.mp3", "out.mp3");
        let status = write_frames(&mut reader, &mut output, &request, &token).await.unwrap();

        assert_eq!(status, SplitStatus::Cancelled);
        assert_eq!(output.len() % FRAME_LEN, 0);
        let written = output.len() / FRAME_LEN;
        assert!(written > 1, "取消前已读出的帧应当写入");
        assert!(written < total, "取消后不应继续写入");
        assert_eq!(output, mp3(written));
    }

    #[tokio::test]
    async fn test_write_frames_reports_counts() {
        let data = mp3(10);
        let mut reader = Mp3FrameReader::open(data.as_slice()).await.unwrap();
        let mut output = Vec::new();
        let request = MediaSplitRequest::new("in.mp3", "out.mp3").ending_at(Duration::from_millis(120));

        let status = write_frames(&mut reader, &mut output, &request, &CancellationToken::new())
            .await
            .unwrap();
        // 第 5 帧读完时到达 120 毫秒
        assert_eq!(
            status,
            SplitStatus::Completed {
                frames_read: 5,
                frames_written: 4
            }
        );
        assert_eq!(output, mp3(4));
    }

    #[test]
    fn test_temporary_path_stays_in_directory() {
        let temp = temporary_path(Path::new("/music/a.mp3"));
        assert_eq!(temp.parent(), Some(Path::new("/music")));

        let name = temp.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("a.mp3."));
        assert!(name.ends_with(".tmp"));
        assert_ne!(temporary_path(Path::new("/music/a.mp3")), temp);
    }

    #[tokio::test]
    async fn test_same_path_is_same_file() {
        assert!(is_same_file(Path::new("x/a.mp3"), Path::new("x/a.mp3")).await);
        assert!(!is_same_file(Path::new("x/a.mp3"), Path::new("x/b.mp3")).await);
    }
}
