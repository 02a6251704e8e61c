use std::io;
use std::num::NonZeroUsize;

use indicatif::ProgressBar;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Completed,
    Cancelled { written: u64 }, // 已写入的字节保留在目标中
}

/// 按固定大小分块写入，块与块之间检查取消信号
///
/// 不做重试，取消后也不会删除或截断已写入的内容，清理由调用方负责。
#[derive(Debug, Clone)]
pub struct ChunkedTransfer {
    chunk_size: NonZeroUsize,
    progress: Option<ProgressBar>,
}

impl ChunkedTransfer {
    pub fn new(chunk_size: NonZeroUsize) -> Self {
        Self {
            chunk_size,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub async fn write_in_chunks<W>(
        &self,
        destination: &mut W,
        data: &[u8],
        cancel: &CancellationToken,
    ) -> io::Result<TransferStatus>
    where
        W: AsyncWrite + Unpin,
    {
        let mut written = 0u64;

        for chunk in data.chunks(self.chunk_size.get()) {
            if cancel.is_cancelled() {
                destination.flush().await?;
                if let Some(pb) = &self.progress {
                    pb.abandon_with_message("已取消");
                }
                debug!("分块写入被取消，已写入 {} 字节", written);
                return Ok(TransferStatus::Cancelled { written });
            }

            destination.write_all(chunk).await?;
            written += chunk.len() as u64;

            if let Some(pb) = &self.progress {
                pb.set_position(written);
            }
        }

        destination.flush().await?;
        if let Some(pb) = &self.progress {
            pb.finish_with_message("写入完成");
        }
        Ok(TransferStatus::Completed)
    }
}
