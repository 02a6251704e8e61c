use clap::{Parser, Subcommand};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use tubesplit::TimeRange;
use tubesplit::common::models::DEFAULT_CHUNK_SIZE;
use tubesplit::parser::utils::parse_timestamp;

/// 视频音频下载与切分工具
#[derive(Parser, Debug)]
#[command(name = "tubesplit")]
#[command(version)]
#[command(author = "rpeng252@gmail.com")]
#[command(about = "下载视频并转换为 MP3，按时间切分音频", long_about = None)]
pub struct Cli {
    /// 输出调试日志
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 检查视频链接格式并输出标准化后的链接
    CheckUrl {
        #[arg(value_name = "URL")]
        #[arg(value_hint = clap::ValueHint::Url)]
        url: String,
    },

    /// 下载视频并转换为音频
    Download {
        /// 视频链接
        #[arg(value_name = "URL")]
        #[arg(value_hint = clap::ValueHint::Url)]
        url: String,

        /// 音频保存目录
        #[arg(long, value_name = "DIR")]
        #[arg(default_value = ".")]
        #[arg(value_hint = clap::ValueHint::DirPath)]
        output_dir: PathBuf,

        /// 临时视频目录 (默认: <输出目录>/tmp)
        #[arg(long, value_name = "DIR")]
        #[arg(value_hint = clap::ValueHint::DirPath)]
        scratch_dir: Option<PathBuf>,

        /// 每次写入的字节数
        #[arg(long, value_name = "BYTES")]
        #[arg(default_value_t = NonZeroUsize::new(DEFAULT_CHUNK_SIZE).unwrap_or(NonZeroUsize::MIN))]
        chunk_size: NonZeroUsize,

        /// 不显示进度条
        #[arg(long)]
        no_progress: bool,
    },

    /// 按时间切分 MP3 音频
    Split {
        /// 源 MP3 文件
        #[arg(value_name = "SOURCE")]
        #[arg(value_hint = clap::ValueHint::FilePath)]
        source: PathBuf,

        /// 输出文件 (默认覆盖源文件)
        #[arg(long, short, value_name = "FILE")]
        #[arg(value_hint = clap::ValueHint::FilePath)]
        output: Option<PathBuf>,

        /// 起始时间，如 1:30 或 00:01:30.5
        #[arg(long, value_name = "TIME")]
        #[arg(value_parser = parse_time)]
        start: Option<Duration>,

        /// 结束时间
        #[arg(long, value_name = "TIME")]
        #[arg(value_parser = parse_time)]
        end: Option<Duration>,

        /// 需要剔除的时间段，可重复，如 --exclude 1:00-1:20
        #[arg(long, value_name = "START-END")]
        exclude: Vec<TimeRange>,
    },
}

fn parse_time(input: &str) -> Result<Duration, String> {
    parse_timestamp(input).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_split_arguments() {
        let cli = Cli::parse_from([
            "tubesplit", "split", "a.mp3", "--start", "10", "--end", "0:40", "--exclude", "20-25",
        ]);
        match cli.command {
            Command::Split {
                source,
                output,
                start,
                end,
                exclude,
            } => {
                assert_eq!(source, PathBuf::from("a.mp3"));
                assert_eq!(output, None);
                assert_eq!(start, Some(Duration::from_secs(10)));
                assert_eq!(end, Some(Duration::from_secs(40)));
                assert_eq!(exclude.len(), 1);
                assert_eq!(exclude[0].end(), Duration::from_secs(25));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_download_defaults() {
        let cli = Cli::parse_from(["tubesplit", "download", "youtube.com/watch?v=x"]);
        match cli.command {
            Command::Download {
                chunk_size,
                scratch_dir,
                no_progress,
                ..
            } => {
                assert_eq!(chunk_size.get(), DEFAULT_CHUNK_SIZE);
                assert_eq!(scratch_dir, None);
                assert!(!no_progress);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
