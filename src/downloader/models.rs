// Common data models for the download pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use url::Url;

use super::errors::DownloadError;
use super::tools::ToolType;
use crate::config::DEFAULT_USER_AGENT;

/// Marker that identifies an HLS manifest, matched case-insensitively.
pub const MANIFEST_MARKER: &str = ".m3u8";

pub fn has_manifest_marker(text: &str) -> bool {
    text.to_ascii_lowercase().contains(MANIFEST_MARKER)
}

/// Network configuration for the page fetch and the external tools
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Proxy URL (e.g., "socks5h://127.0.0.1:1080")
    pub proxy: Option<String>,

    /// Timeout in seconds
    pub timeout: Option<u32>,

    pub user_agent: String,

    /// Honour HTTP_PROXY / HTTPS_PROXY from the environment when no explicit
    /// proxy is set
    pub use_system_proxy: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout: Some(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            use_system_proxy: true,
        }
    }
}

/// A fetched page. `url` is the final URL after redirects.
#[derive(Debug, Clone)]
pub struct PageDocument {
    pub url: Url,
    pub html: String,
}

/// Absolute http(s) URL of an m3u8 manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestUrl(Url);

impl ManifestUrl {
    pub fn parse(input: &str) -> Result<Self, DownloadError> {
        Self::resolve(input, None)
    }

    /// Parse text pulled out of a page. `\/` is unescaped first; a relative
    /// value is joined onto `base` when one is given.
    pub fn resolve(input: &str, base: Option<&Url>) -> Result<Self, DownloadError> {
        let text = input.trim().replace("\\/", "/");

        let url = match (Url::parse(&text), base) {
            (Ok(url), _) => url,
            (Err(url::ParseError::RelativeUrlWithoutBase), Some(base)) => base
                .join(&text)
                .map_err(|e| DownloadError::InvalidUrl(format!("{}: {}", text, e)))?,
            (Err(e), _) => return Err(DownloadError::InvalidUrl(format!("{}: {}", text, e))),
        };

        match url.scheme() {
            "http" | "https" => Ok(Self(url)),
            other => Err(DownloadError::InvalidUrl(format!(
                "{}: unsupported scheme '{}'",
                text, other
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn has_manifest_marker(&self) -> bool {
        has_manifest_marker(self.0.path())
    }

    /// `scheme://host[:port]` of the manifest, used as the Referer when no
    /// page URL is known.
    pub fn origin_referer(&self) -> String {
        self.0.origin().ascii_serialization()
    }
}

impl fmt::Display for ManifestUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the user asked for. At least one of `page_url` / `manifest_url`
/// must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadOptions {
    pub page_url: Option<String>,
    pub manifest_url: Option<String>,
    pub output: Option<PathBuf>,
    pub tool: Option<ToolType>,
}

impl DownloadOptions {
    /// Classify a single URL field: anything mentioning `.m3u8` is taken as
    /// the manifest itself, everything else as the page that embeds it.
    pub fn from_single_input(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() {
            return Self::default();
        }

        if has_manifest_marker(input) {
            Self {
                manifest_url: Some(input.to_string()),
                ..Self::default()
            }
        } else {
            Self {
                page_url: Some(input.to_string()),
                ..Self::default()
            }
        }
    }

    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output.filter(|p| !p.as_os_str().is_empty());
        self
    }

    pub fn with_tool(mut self, tool: Option<ToolType>) -> Self {
        self.tool = tool;
        self
    }

    pub fn page_url(&self) -> Option<&str> {
        non_empty(self.page_url.as_deref())
    }

    pub fn manifest_url(&self) -> Option<&str> {
        non_empty(self.manifest_url.as_deref())
    }

    pub fn has_target(&self) -> bool {
        self.page_url().is_some() || self.manifest_url().is_some()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Fully resolved invocation handed to a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub manifest_url: ManifestUrl,
    pub output: PathBuf,
    pub referer: String,
    pub tool: ToolType,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadResult {
    pub success: bool,
    pub output: PathBuf,
    /// Size of `output` after the tool exited, if the file exists
    pub file_size: Option<u64>,
    pub tool: ToolType,
    pub manifest_url: String,
}

impl DownloadResult {
    pub fn size_mib(&self) -> Option<f64> {
        self.file_size.map(|bytes| bytes as f64 / (1024.0 * 1024.0))
    }
}
