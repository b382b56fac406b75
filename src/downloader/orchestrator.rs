// Orchestrator: target resolution, tool selection and a single download attempt

use std::path::PathBuf;
use tracing::debug;
use url::Url;

use super::backends::{FfmpegBackend, YtDlpBackend};
use super::errors::DownloadError;
use super::extractor::extract_manifest_url;
use super::fetch::HttpPageFetcher;
use super::models::{DownloadOptions, DownloadRequest, DownloadResult, ManifestUrl};
use super::naming::derive_output_name;
use super::status::StatusEmitter;
use super::tools::{ToolAvailability, ToolType};
use super::traits::{DownloaderBackend, PageFetcher};
use super::utils::OutputMode;
use crate::config::AppConfig;

pub struct Downloader {
    fetcher: Box<dyn PageFetcher>,
    backends: Vec<Box<dyn DownloaderBackend>>,
}

impl Downloader {
    pub fn new(fetcher: Box<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            backends: Vec::new(),
        }
    }

    /// HTTP fetcher plus the yt-dlp and ffmpeg backends, wired from config.
    pub fn from_config(config: &AppConfig, mode: OutputMode) -> Result<Self, DownloadError> {
        let mut downloader = Self::new(Box::new(HttpPageFetcher::new(&config.network)?));
        downloader.add_backend(Box::new(YtDlpBackend::new(
            config.ytdlp_bin.clone(),
            &config.network,
            mode,
        )));
        downloader.add_backend(Box::new(FfmpegBackend::new(
            config.ffmpeg_bin.clone(),
            &config.network,
            mode,
        )));
        Ok(downloader)
    }

    pub fn add_backend(&mut self, backend: Box<dyn DownloaderBackend>) {
        self.backends.push(backend);
    }

    fn backend_for(&self, tool: ToolType) -> Option<&dyn DownloaderBackend> {
        self.backends
            .iter()
            .find(|backend| backend.tool() == tool)
            .map(|backend| backend.as_ref())
    }

    /// Resolve the manifest, pick a tool and run it once.
    ///
    /// Every check is a hard gate; the first failing one ends the run. A
    /// non-zero exit of the tool is reported as `DownloadFailed`, with the
    /// size of whatever it left behind.
    pub async fn run(
        &self,
        options: &DownloadOptions,
        availability: ToolAvailability,
        emitter: &StatusEmitter,
    ) -> Result<DownloadResult, DownloadError> {
        if !options.has_target() {
            return Err(DownloadError::NoTargetSpecified);
        }

        emitter.info(format!("Available tools: {}", availability.summary()));
        if !availability.any() {
            return Err(DownloadError::NoToolAvailable);
        }

        let tool = availability.select(options.tool)?;
        let backend = self
            .backend_for(tool)
            .ok_or(DownloadError::ToolUnavailable(tool))?;

        let page_url = options.page_url();
        let manifest_url = match (options.manifest_url(), page_url) {
            (Some(direct), _) => {
                let manifest = ManifestUrl::parse(direct)?;
                if !manifest.has_manifest_marker() {
                    emitter.warn(format!("{} does not look like an m3u8 playlist", manifest));
                }
                manifest
            }
            (None, Some(page)) => self.resolve_from_page(page, emitter).await?,
            (None, None) => return Err(DownloadError::NoTargetSpecified),
        };
        emitter.info(format!("Manifest URL: {}", manifest_url));

        let referer = match page_url {
            Some(page) => page.to_string(),
            None => manifest_url.origin_referer(),
        };

        let output = match &options.output {
            Some(path) => path.clone(),
            None => PathBuf::from(derive_output_name(page_url.unwrap_or(""), manifest_url.as_str())),
        };
        emitter.info(format!("Output file: {}", output.display()));

        let request = DownloadRequest {
            manifest_url,
            output,
            referer,
            tool,
        };

        emitter.info(format!("Downloading with {}", tool));
        let outcome = backend.download(&request, emitter).await?;

        let file_size = measure(&request.output).await;
        debug!(?outcome, ?file_size, "download finished");

        let result = DownloadResult {
            success: outcome.success,
            output: request.output,
            file_size,
            tool,
            manifest_url: request.manifest_url.as_str().to_string(),
        };

        if !result.success {
            emitter.error("Download failed");
            return Err(DownloadError::DownloadFailed {
                tool,
                code: outcome.code,
                file_size,
            });
        }

        emitter.success("Download complete");
        Ok(result)
    }

    async fn resolve_from_page(
        &self,
        page: &str,
        emitter: &StatusEmitter,
    ) -> Result<ManifestUrl, DownloadError> {
        let page_url = Url::parse(page)
            .map_err(|e| DownloadError::InvalidUrl(format!("{}: {}", page, e)))?;

        emitter.info(format!("Fetching page: {}", page_url));
        let document = self.fetcher.fetch(&page_url).await?;

        let raw = extract_manifest_url(&document.html).ok_or(DownloadError::ManifestNotFound)?;
        ManifestUrl::resolve(&raw, Some(&document.url))
    }
}

/// Size of the file at `path`, if there is one.
async fn measure(path: &std::path::Path) -> Option<u64> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Some(meta.len()),
        _ => None,
    }
}
