// Seams between the orchestrator and the outside world

use async_trait::async_trait;
use url::Url;

use super::errors::DownloadError;
use super::models::{DownloadRequest, PageDocument};
use super::status::StatusEmitter;
use super::tools::ToolType;
use super::utils::ProcessOutcome;

/// Fetches the page that embeds the manifest.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET `page_url` with the page itself as Referer. Transport errors and
    /// non-success statuses are both `FetchFailed`.
    async fn fetch(&self, page_url: &Url) -> Result<PageDocument, DownloadError>;
}

/// Trait for downloader backend implementations
#[async_trait]
pub trait DownloaderBackend: Send + Sync {
    /// Which external tool this backend drives
    fn tool(&self) -> ToolType;

    /// Argument list for the tool (without the program name)
    fn build_args(&self, request: &DownloadRequest) -> Vec<String>;

    /// Run the tool and wait for it to exit
    async fn download(
        &self,
        request: &DownloadRequest,
        emitter: &StatusEmitter,
    ) -> Result<ProcessOutcome, DownloadError>;
}
