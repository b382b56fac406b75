use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use crate::downloader::errors::DownloadError;
use crate::downloader::models::{DownloadRequest, NetworkConfig};
use crate::downloader::status::{StatusEmitter, StatusEvent, StatusLevel};
use crate::downloader::tools::ToolType;
use crate::downloader::traits::DownloaderBackend;
use crate::downloader::utils::{run_tool, OutputMode, ProcessOutcome};

/// Remuxes the HLS stream into the output container without re-encoding.
pub struct FfmpegBackend {
    binary_path: String,
    proxy: Option<String>,
    mode: OutputMode,
}

impl FfmpegBackend {
    pub fn new(binary_path: impl Into<String>, network: &NetworkConfig, mode: OutputMode) -> Self {
        Self {
            binary_path: binary_path.into(),
            // ffmpeg's http protocol only speaks HTTP proxies
            proxy: network.proxy.clone().filter(|p| p.starts_with("http")),
            mode,
        }
    }
}

#[async_trait]
impl DownloaderBackend for FfmpegBackend {
    fn tool(&self) -> ToolType {
        ToolType::Ffmpeg
    }

    fn build_args(&self, request: &DownloadRequest) -> Vec<String> {
        let mut args = vec!["-y".to_string()];

        if !request.referer.is_empty() {
            args.push("-headers".to_string());
            args.push(format!("Referer: {}", request.referer));
        }

        if let Some(proxy) = &self.proxy {
            args.push("-http_proxy".to_string());
            args.push(proxy.clone());
        }

        args.extend([
            "-i".to_string(),
            request.manifest_url.as_str().to_string(),
            "-c".to_string(),
            "copy".to_string(),
            // ADTS -> raw AAC framing, required for the mp4 container
            "-bsf:a".to_string(),
            "aac_adtstoasc".to_string(),
            request.output.to_string_lossy().to_string(),
        ]);
        args
    }

    async fn download(
        &self,
        request: &DownloadRequest,
        emitter: &StatusEmitter,
    ) -> Result<ProcessOutcome, DownloadError> {
        let args = self.build_args(request);
        run_tool(&self.binary_path, &args, self.mode, emitter, parse_ffmpeg_progress).await
    }
}

/// ffmpeg status lines look like:
/// frame= 1200 fps=0.0 q=-1.0 size=   10240kB time=00:00:40.00 bitrate=2097.2kbits/s speed=79.9x
fn parse_ffmpeg_progress(line: &str) -> Option<StatusEvent> {
    lazy_static! {
        static ref STATS_RE: Regex = Regex::new(
            r"size=\s*(\S+)\s+time=\s*(\d+:\d{2}:\d{2}(?:\.\d+)?).*?speed=\s*(\S+)"
        ).unwrap();
        static ref INPUT_RE: Regex = Regex::new(r"^Input #0,\s*(\w+)").unwrap();
    }

    if let Some(caps) = STATS_RE.captures(line) {
        return Some(StatusEvent::new(
            StatusLevel::Info,
            format!("{} written, position {} ({})", &caps[1], &caps[2], &caps[3]),
        ));
    }

    if let Some(caps) = INPUT_RE.captures(line.trim_start()) {
        return Some(StatusEvent::progress(0.0, format!("Opened {} stream", &caps[1])));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::models::ManifestUrl;
    use std::path::PathBuf;

    fn request() -> DownloadRequest {
        DownloadRequest {
            manifest_url: ManifestUrl::parse("https://cdn.example/a/index.m3u8").unwrap(),
            output: PathBuf::from("out dir/video.mp4"),
            referer: "https://cdn.example".to_string(),
            tool: ToolType::Ffmpeg,
        }
    }

    #[test]
    fn test_build_args() {
        let backend = FfmpegBackend::new("ffmpeg", &NetworkConfig::default(), OutputMode::Inherit);
        assert_eq!(
            backend.build_args(&request()),
            [
                "-y",
                "-headers",
                "Referer: https://cdn.example",
                "-i",
                "https://cdn.example/a/index.m3u8",
                "-c",
                "copy",
                "-bsf:a",
                "aac_adtstoasc",
                "out dir/video.mp4",
            ]
        );
    }

    #[test]
    fn test_socks_proxy_is_not_passed() {
        let socks = NetworkConfig {
            proxy: Some("socks5h://127.0.0.1:1080".to_string()),
            ..NetworkConfig::default()
        };
        let backend = FfmpegBackend::new("ffmpeg", &socks, OutputMode::Inherit);
        assert!(!backend.build_args(&request()).contains(&"-http_proxy".to_string()));

        let http = NetworkConfig {
            proxy: Some("http://127.0.0.1:8080".to_string()),
            ..NetworkConfig::default()
        };
        let backend = FfmpegBackend::new("ffmpeg", &http, OutputMode::Inherit);
        let args = backend.build_args(&request());
        assert_eq!(&args[3..5], ["-http_proxy", "http://127.0.0.1:8080"]);
    }

    #[test]
    fn test_parse_stats_line() {
        let event = parse_ffmpeg_progress(
            "frame= 1200 fps=0.0 q=-1.0 size=   10240kB time=00:00:40.00 bitrate=2097.2kbits/s speed=79.9x",
        )
        .unwrap();
        assert_eq!(event.message, "10240kB written, position 00:00:40.00 (79.9x)");
        assert!(parse_ffmpeg_progress("  Duration: 00:45:10.00, start: 0.000000").is_none());
    }
}
