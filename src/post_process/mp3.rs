use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace};

use super::error::FrameError;

const READ_CHUNK: usize = 16 * 1024;
const HEADER_LEN: usize = 4;
const ID3V2_HEADER_LEN: usize = 10;
const ID3V2_FOOTER_FLAG: u8 = 0x10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    V1,
    V2,
    V25,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    I,
    II,
    III,
}

// 码率表（kbps），下标即头部中的码率索引，0 为自由格式
const BITRATES_V1_L1: [u32; 15] = [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448];
const BITRATES_V1_L2: [u32; 15] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384];
const BITRATES_V1_L3: [u32; 15] = [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];
const BITRATES_V2_L1: [u32; 15] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256];
const BITRATES_V2_L23: [u32; 15] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];

/// MPEG 音频帧头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: MpegVersion,
    pub layer: Layer,
    pub bitrate_kbps: u32,
    pub sample_rate: u32,
    pub padding: bool,
}

impl FrameHeader {
    /// 解析 4 字节帧头；保留值和自由格式都不视为帧
    pub fn parse(bytes: [u8; 4]) -> Option<Self> {
        if bytes[0] != 0xFF || bytes[1] & 0xE0 != 0xE0 {
            return None;
        }

        let version = match (bytes[1] >> 3) & 0x03 {
            0 => MpegVersion::V25,
            2 => MpegVersion::V2,
            3 => MpegVersion::V1,
            _ => return None,
        };
        let layer = match (bytes[1] >> 1) & 0x03 {
            1 => Layer::III,
            2 => Layer::II,
            3 => Layer::I,
            _ => return None,
        };

        let bitrate_index = (bytes[2] >> 4) as usize;
        if bitrate_index == 0 || bitrate_index == 15 {
            return None;
        }
        let table = match (version, layer) {
            (MpegVersion::V1, Layer::I) => &BITRATES_V1_L1,
            (MpegVersion::V1, Layer::II) => &BITRATES_V1_L2,
            (MpegVersion::V1, Layer::III) => &BITRATES_V1_L3,
            (_, Layer::I) => &BITRATES_V2_L1,
            (_, _) => &BITRATES_V2_L23,
        };

        let sample_rate_index = (bytes[2] >> 2) & 0x03;
        let base_rate = match sample_rate_index {
            0 => 44_100,
            1 => 48_000,
            2 => 32_000,
            _ => return None,
        };
        let sample_rate = match version {
            MpegVersion::V1 => base_rate,
            MpegVersion::V2 => base_rate / 2,
            MpegVersion::V25 => base_rate / 4,
        };

        Some(Self {
            version,
            layer,
            bitrate_kbps: table[bitrate_index],
            sample_rate,
            padding: (bytes[2] >> 1) & 0x01 == 1,
        })
    }

    pub fn samples_per_frame(&self) -> u32 {
        match (self.layer, self.version) {
            (Layer::I, _) => 384,
            (Layer::II, _) => 1152,
            (Layer::III, MpegVersion::V1) => 1152,
            (Layer::III, _) => 576,
        }
    }

    /// 含帧头在内的整帧字节数
    pub fn frame_length(&self) -> usize {
        let bps = self.bitrate_kbps as usize * 1000;
        let rate = self.sample_rate as usize;
        let padding = self.padding as usize;

        match (self.layer, self.version) {
            (Layer::I, _) => (12 * bps / rate + padding) * 4,
            (Layer::II, _) | (Layer::III, MpegVersion::V1) => 144 * bps / rate + padding,
            (Layer::III, _) => 72 * bps / rate + padding,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_nanos(self.samples_per_frame() as u64 * 1_000_000_000 / self.sample_rate as u64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mp3Frame {
    pub header: FrameHeader,
    pub raw: Vec<u8>,
}

// 按采样数累计时长，采样率不变时不会有逐帧舍入误差
#[derive(Debug, Default, Clone, Copy)]
struct FrameClock {
    settled: Duration,
    samples: u64,
    sample_rate: u32,
}

impl FrameClock {
    fn advance(&mut self, header: &FrameHeader) {
        if header.sample_rate != self.sample_rate {
            self.settled = self.elapsed();
            self.samples = 0;
            self.sample_rate = header.sample_rate;
        }
        self.samples += header.samples_per_frame() as u64;
    }

    fn elapsed(&self) -> Duration {
        if self.sample_rate == 0 {
            return self.settled;
        }
        let nanos = self.samples as u128 * 1_000_000_000 / self.sample_rate as u128;
        self.settled + Duration::from_nanos(nanos as u64)
    }
}

/// 顺序读取 MP3 帧的读取器
pub struct Mp3FrameReader<R> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
    eof: bool,
    leading_tag: Vec<u8>,
    clock: FrameClock,
    skipped: u64,
}

impl<R: AsyncRead + Unpin> Mp3FrameReader<R> {
    /// 打开读取器，开头的 ID3v2 标签会被读出并单独保存
    pub async fn open(inner: R) -> Result<Self, FrameError> {
        let mut reader = Self {
            inner,
            buf: Vec::with_capacity(READ_CHUNK),
            pos: 0,
            eof: false,
            leading_tag: Vec::new(),
            clock: FrameClock::default(),
            skipped: 0,
        };

        if reader.fill(ID3V2_HEADER_LEN).await? && reader.buf.starts_with(b"ID3") {
            let header = &reader.buf[..ID3V2_HEADER_LEN];
            let size = header[6..10]
                .iter()
                .fold(0usize, |acc, b| (acc << 7) | (*b & 0x7F) as usize);
            let footer = if header[5] & ID3V2_FOOTER_FLAG != 0 { ID3V2_HEADER_LEN } else { 0 };
            let total = ID3V2_HEADER_LEN + size + footer;

            if !reader.fill(total).await? {
                return Err(FrameError::TruncatedTag {
                    expected: total,
                    actual: reader.buf.len(),
                });
            }
            reader.leading_tag = reader.buf[..total].to_vec();
            reader.pos = total;
            debug!("跳过 ID3v2 标签: {} 字节", total);
        }

        Ok(reader)
    }

    pub fn leading_tag(&self) -> &[u8] {
        &self.leading_tag
    }

    /// 已读出的所有帧的累计解码时长
    pub fn position(&self) -> Duration {
        self.clock.elapsed()
    }

    /// 读取下一帧；到达结尾、遇到 ID3v1 标签或最后一帧不完整时返回 `None`
    pub async fn next_frame(&mut self) -> Result<Option<Mp3Frame>, FrameError> {
        loop {
            if !self.fill(HEADER_LEN).await? {
                return Ok(None);
            }

            let head = [
                self.buf[self.pos],
                self.buf[self.pos + 1],
                self.buf[self.pos + 2],
                self.buf[self.pos + 3],
            ];
            if head.starts_with(b"TAG") {
                debug!("遇到 ID3v1 标签，停止读取");
                return Ok(None);
            }

            let Some(header) = FrameHeader::parse(head) else {
                // 逐字节重新同步
                self.pos += 1;
                self.skipped += 1;
                continue;
            };

            let length = header.frame_length();
            if length < HEADER_LEN {
                self.pos += 1;
                self.skipped += 1;
                continue;
            }
            if !self.fill(length).await? {
                debug!("最后一帧不完整，停止读取");
                return Ok(None);
            }

            if self.skipped > 0 {
                trace!("重新同步，跳过 {} 字节", self.skipped);
                self.skipped = 0;
            }

            let raw = self.buf[self.pos..self.pos + length].to_vec();
            self.pos += length;
            self.clock.advance(&header);
            return Ok(Some(Mp3Frame { header, raw }));
        }
    }

    // 保证缓冲区中至少有 wanted 个未消费字节，数据不足时返回 false
    async fn fill(&mut self, wanted: usize) -> std::io::Result<bool> {
        while self.buf.len() - self.pos < wanted {
            if self.eof {
                return Ok(false);
            }
            if self.pos > 0 && self.pos >= self.buf.len() / 2 {
                self.buf.drain(..self.pos);
                self.pos = 0;
            }
            self.buf.reserve(READ_CHUNK);
            if self.inner.read_buf(&mut self.buf).await? == 0 {
                self.eof = true;
            }
        }
        Ok(true)
    }
}
