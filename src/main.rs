use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

use m3u8_grabber_lib::config::AppConfig;
use m3u8_grabber_lib::downloader::{
    DownloadOptions, Downloader, OutputMode, StatusEmitter, ToolManager, ToolType,
};
use m3u8_grabber_lib::logging;

const EXAMPLES: &str = "\
Examples:
  m3u8-grabber https://gimy.com.tw/video/58422-11.html
  m3u8-grabber https://gimy.com.tw/video/58422-11.html -o episode11.mp4
  m3u8-grabber -m https://cdn.example.com/hls/index.m3u8 -o out.mp4
  m3u8-grabber https://gimy.com.tw/video/58422-11.html -t ffmpeg";

#[derive(Debug, Parser)]
#[command(name = "m3u8-grabber", version)]
#[command(about = "Find the m3u8 stream behind a video page and download it")]
#[command(after_help = EXAMPLES)]
struct Cli {
    /// Video page URL
    url: Option<String>,

    /// Use this m3u8 URL directly instead of searching the page
    #[arg(short = 'm', long = "m3u8", value_name = "URL")]
    m3u8: Option<String>,

    /// Output file (default: derived from the page URL)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Force a downloader instead of picking the first available one
    #[arg(short, long, value_parser = ["yt-dlp", "ffmpeg"])]
    tool: Option<String>,

    /// Verbose logging
    #[arg(long, default_value_t = false)]
    debug: bool,
}

impl Cli {
    fn options(&self) -> Result<DownloadOptions, String> {
        let tool = self
            .tool
            .as_deref()
            .map(str::parse::<ToolType>)
            .transpose()?;

        Ok(DownloadOptions {
            page_url: self.url.clone(),
            manifest_url: self.m3u8.clone(),
            ..DownloadOptions::default()
        }
        .with_output(self.output.clone())
        .with_tool(tool))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.debug);

    let options = match cli.options() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if !options.has_target() {
        let _ = Cli::command().print_help();
        return ExitCode::FAILURE;
    }

    let config = AppConfig::from_env();
    let availability = ToolManager::new(&config).probe().await;

    let downloader = match Downloader::from_config(&config, OutputMode::Inherit) {
        Ok(downloader) => downloader,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match downloader
        .run(&options, availability, &StatusEmitter::console())
        .await
    {
        Ok(result) => {
            println!("Saved to: {}", result.output.display());
            if let Some(mib) = result.size_mib() {
                println!("File size: {:.2} MB", mib);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "download aborted");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
