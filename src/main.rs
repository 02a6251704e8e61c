use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tubesplit::common::logger::PrettyLogger;
use tubesplit::downloader::core::VideoSource;
use tubesplit::downloader::host::YtDlpHost;
use tubesplit::parser::UriNormalizer;
use tubesplit::parser::utils::format_duration;
use tubesplit::{
    FfmpegEngine, FrameSplitter, MediaDownloadRequest, MediaDownloader, MediaSplitRequest,
    RemoteResourceDownloadInfo, Response, State, Transcoder, UnfinishedReason, log_error, log_info,
    log_step, log_success, log_warning,
};

mod cli;

use cli::Command;

// 被 Ctrl-C 取消时的退出码
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::Cli::parse();

    // 初始化日志
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).with_target(false).init();

    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("收到中断信号，正在取消...");
            watcher.cancel();
        }
    });

    match run(args.command, cancel).await {
        Ok(code) => code,
        Err(e) => {
            log_error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, cancel: CancellationToken) -> anyhow::Result<ExitCode> {
    match command {
        Command::CheckUrl { url } => match UriNormalizer::default().normalize(&url) {
            Some(normalized) => {
                log_success!("链接有效");
                println!("{}", normalized);
                Ok(ExitCode::SUCCESS)
            }
            None => {
                log_error!("无效的视频链接: {}", url);
                Ok(ExitCode::FAILURE)
            }
        },

        Command::Download {
            url,
            output_dir,
            scratch_dir,
            chunk_size,
            no_progress,
        } => {
            let host = YtDlpHost::from_env().context("初始化下载客户端失败")?;
            let source = VideoSource::new(host).with_progress(!no_progress);
            let downloader = MediaDownloader::new(source, Transcoder::new(FfmpegEngine::from_env()));

            let mut request =
                MediaDownloadRequest::new(RemoteResourceDownloadInfo::new(url.clone(), chunk_size), output_dir);
            if let Some(scratch_dir) = scratch_dir {
                request = request.with_scratch_directory(scratch_dir);
            }
            debug!("下载请求: {:?}", request);
            log_info!("临时目录: {}", request.scratch_directory.display());

            log_step!("下载: {}", url);
            let mut handle = downloader.download(request, cancel);
            if let Some(data) = handle.metadata().await {
                PrettyLogger::media_info(&data.title, "正在下载");
            }

            let response = handle.finish().await;
            Ok(report(&response, |outcome| {
                PrettyLogger::separator();
                let detail = outcome
                    .data
                    .duration
                    .map(format_duration)
                    .unwrap_or_else(|| "时长未知".to_string());
                PrettyLogger::media_info(&outcome.data.title, detail);
                PrettyLogger::file_info("音频文件", outcome.file.display().to_string());
                log_success!("下载完成！");
            }))
        }

        Command::Split {
            source,
            output,
            start,
            end,
            exclude,
        } => {
            let destination = output.unwrap_or_else(|| source.clone());
            let mut request = MediaSplitRequest::new(source, destination);
            if let Some(start) = start {
                request = request.starting_at(start);
            }
            if let Some(end) = end {
                request = request.ending_at(end);
            }
            for range in exclude {
                request = request.excluding(range);
            }

            log_step!("切分: {}", request.source_file.display());
            let response = FrameSplitter::new().split(&request, &cancel).await;
            Ok(report(&response, |outcome| {
                PrettyLogger::file_info("输出文件", outcome.split_file.display().to_string());
                log_success!("切分完成！");
            }))
        }
    }
}

/// 输出结果中的消息并换算成退出码
fn report<T>(response: &Response<T>, on_finished: impl FnOnce(&T)) -> ExitCode {
    PrettyLogger::messages(response.messages());

    match response.state() {
        State::Finished(value) => {
            on_finished(value);
            ExitCode::SUCCESS
        }
        State::Unfinished(UnfinishedReason::Cancelled) => {
            log_warning!("操作已取消");
            ExitCode::from(EXIT_CANCELLED)
        }
        State::Unfinished(reason) => {
            log_error!("未完成: {}", reason);
            ExitCode::FAILURE
        }
    }
}
