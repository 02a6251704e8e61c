pub mod error;
pub mod ffmpeg;
pub mod mp3;
pub mod splitter;
pub mod transcoder;

pub use ffmpeg::FfmpegEngine;
pub use splitter::FrameSplitter;
pub use transcoder::{AUDIO_EXTENSION, AudioFile, AudioMetadata, Transcoder, TranscodingEngine};
