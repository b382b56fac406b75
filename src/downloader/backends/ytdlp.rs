use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use crate::downloader::errors::DownloadError;
use crate::downloader::models::{DownloadRequest, NetworkConfig};
use crate::downloader::status::{StatusEmitter, StatusEvent, StatusLevel};
use crate::downloader::tools::ToolType;
use crate::downloader::traits::DownloaderBackend;
use crate::downloader::utils::{run_tool, OutputMode, ProcessOutcome};

pub struct YtDlpBackend {
    binary_path: String,
    proxy: Option<String>,
    mode: OutputMode,
}

impl YtDlpBackend {
    pub fn new(binary_path: impl Into<String>, network: &NetworkConfig, mode: OutputMode) -> Self {
        Self {
            binary_path: binary_path.into(),
            proxy: network.proxy.clone(),
            mode,
        }
    }
}

#[async_trait]
impl DownloaderBackend for YtDlpBackend {
    fn tool(&self) -> ToolType {
        ToolType::YtDlp
    }

    fn build_args(&self, request: &DownloadRequest) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            request.output.to_string_lossy().to_string(),
        ];

        if !request.referer.is_empty() {
            args.push("--referer".to_string());
            args.push(request.referer.clone());
        }

        args.extend([
            "--no-check-certificates".to_string(),
            "-f".to_string(),
            "best".to_string(),
        ]);

        if let Some(proxy) = &self.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }

        args.push(request.manifest_url.as_str().to_string());
        args
    }

    async fn download(
        &self,
        request: &DownloadRequest,
        emitter: &StatusEmitter,
    ) -> Result<ProcessOutcome, DownloadError> {
        let args = self.build_args(request);
        run_tool(&self.binary_path, &args, self.mode, emitter, parse_ytdlp_progress).await
    }
}

/// Parse yt-dlp progress line like:
/// [download]   6.2% of ~ 343.72MiB at  420.30KiB/s ETA 12:32 (frag 29/454)
fn parse_ytdlp_progress(line: &str) -> Option<StatusEvent> {
    lazy_static! {
        static ref PROGRESS_RE: Regex = Regex::new(
            r"\[download\]\s+(\d+\.?\d*)%\s+of\s+~?\s*(\d+\.?\d*\s*\w+)(?:\s+at\s+(\S+\s*\w*/s))?(?:\s+ETA\s+(\S+))?(?:\s+\(frag\s+(\d+)/(\d+)\))?"
        ).unwrap();
        static ref DEST_RE: Regex = Regex::new(r"\[download\]\s+Destination:\s+(.+)").unwrap();
        static ref ALREADY_RE: Regex = Regex::new(r"has already been downloaded").unwrap();
    }

    if let Some(caps) = PROGRESS_RE.captures(line) {
        let percent: f32 = caps.get(1)?.as_str().parse().ok()?;
        let size = caps.get(2).map(|m| m.as_str()).unwrap_or("?");
        let speed = caps.get(3).map(|m| m.as_str()).unwrap_or("?");

        let mut status = format!("{:.1}% of {} @ {}", percent, size, speed);
        if let Some(eta) = caps.get(4) {
            status.push_str(&format!(" ETA {}", eta.as_str()));
        }
        if let (Some(current), Some(total)) = (caps.get(5), caps.get(6)) {
            status.push_str(&format!(" (frag {}/{})", current.as_str(), total.as_str()));
        }
        return Some(StatusEvent::progress(percent, status));
    }

    if let Some(caps) = DEST_RE.captures(line) {
        let filename = caps.get(1).map(|m| m.as_str()).unwrap_or("file");
        return Some(StatusEvent::progress(0.0, format!("Writing {}", filename.trim())));
    }

    if ALREADY_RE.is_match(line) {
        return Some(StatusEvent::new(StatusLevel::Warning, "File already downloaded"));
    }

    None
}
