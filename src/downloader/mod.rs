// Downloader module - page fetch, manifest extraction and the external tools

pub mod backends;
pub mod errors;
pub mod extractor;
pub mod fetch;
pub mod models;
pub mod naming;
pub mod orchestrator;
pub mod session;
pub mod status;
pub mod tools;
pub mod traits;
pub mod utils;

pub use errors::DownloadError;
pub use models::{DownloadOptions, DownloadRequest, DownloadResult, ManifestUrl, NetworkConfig};
pub use orchestrator::Downloader;
pub use session::{DownloadSession, SessionHandle};
pub use status::{StatusEmitter, StatusEvent, StatusLevel};
pub use tools::{ToolAvailability, ToolManager, ToolType};
pub use traits::{DownloaderBackend, PageFetcher};
pub use utils::OutputMode;
