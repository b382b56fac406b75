use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::errors::DownloadError;
use super::utils::run_output_with_timeout;
use crate::config::AppConfig;

/// External downloaders, in preference order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ToolType {
    #[serde(rename = "yt-dlp")]
    YtDlp,
    #[serde(rename = "ffmpeg")]
    Ffmpeg,
}

impl ToolType {
    pub const ALL: [ToolType; 2] = [ToolType::YtDlp, ToolType::Ffmpeg];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "yt-dlp",
            ToolType::Ffmpeg => "ffmpeg",
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "--version",
            ToolType::Ffmpeg => "-version", // ffmpeg takes a single dash
        }
    }

    pub fn install_hint(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "pip install yt-dlp",
            ToolType::Ffmpeg => "winget install ffmpeg (or https://ffmpeg.org/download.html)",
        }
    }
}

impl fmt::Display for ToolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yt-dlp" | "ytdlp" => Ok(ToolType::YtDlp),
            "ffmpeg" => Ok(ToolType::Ffmpeg),
            other => Err(format!("Unknown tool type: {}", other)),
        }
    }
}

/// Which downloaders answered their version query during the last probe.
///
/// A snapshot: front ends probe once per run and hand the value to the
/// orchestrator instead of keeping a shared map around.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolAvailability {
    pub yt_dlp: bool,
    pub ffmpeg: bool,
}

impl ToolAvailability {
    pub fn new(yt_dlp: bool, ffmpeg: bool) -> Self {
        Self { yt_dlp, ffmpeg }
    }

    pub fn is_available(&self, tool: ToolType) -> bool {
        match tool {
            ToolType::YtDlp => self.yt_dlp,
            ToolType::Ffmpeg => self.ffmpeg,
        }
    }

    pub fn any(&self) -> bool {
        self.yt_dlp || self.ffmpeg
    }

    /// Pick the tool for a request.
    ///
    /// An explicit choice must be available. Otherwise the first available
    /// tool in [`ToolType::ALL`] order wins.
    pub fn select(&self, requested: Option<ToolType>) -> Result<ToolType, DownloadError> {
        if !self.any() {
            return Err(DownloadError::NoToolAvailable);
        }

        match requested {
            Some(tool) if self.is_available(tool) => Ok(tool),
            Some(tool) => Err(DownloadError::ToolUnavailable(tool)),
            None => ToolType::ALL
                .into_iter()
                .find(|tool| self.is_available(*tool))
                .ok_or(DownloadError::NoToolAvailable),
        }
    }

    /// One-line summary, e.g. `yt-dlp=[OK], ffmpeg=[X]`
    pub fn summary(&self) -> String {
        ToolType::ALL
            .iter()
            .map(|tool| {
                let mark = if self.is_available(*tool) { "[OK]" } else { "[X]" };
                format!("{}={}", tool, mark)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub tool_type: ToolType,
    pub version: Option<String>,
    pub path: String,
    pub is_available: bool,
}

/// Runs the version queries that decide tool availability.
#[derive(Debug, Clone)]
pub struct ToolManager {
    ytdlp_bin: String,
    ffmpeg_bin: String,
    probe_timeout_secs: u64,
}

impl ToolManager {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            ytdlp_bin: config.ytdlp_bin.clone(),
            ffmpeg_bin: config.ffmpeg_bin.clone(),
            probe_timeout_secs: config.probe_timeout_secs,
        }
    }

    pub fn binary(&self, tool: ToolType) -> &str {
        match tool {
            ToolType::YtDlp => &self.ytdlp_bin,
            ToolType::Ffmpeg => &self.ffmpeg_bin,
        }
    }

    pub async fn get_tool_info(&self, tool_type: ToolType) -> ToolInfo {
        let path = self.binary(tool_type).to_string();
        let version = self.get_version(tool_type).await;

        ToolInfo {
            name: tool_type.as_str().to_string(),
            tool_type,
            is_available: version.is_some(),
            version: version.filter(|v| !v.is_empty()),
            path,
        }
    }

    pub async fn get_all_tools(&self) -> Vec<ToolInfo> {
        let (ytdlp, ffmpeg) = tokio::join!(
            self.get_tool_info(ToolType::YtDlp),
            self.get_tool_info(ToolType::Ffmpeg),
        );
        vec![ytdlp, ffmpeg]
    }

    /// Probe both tools. Never fails: a missing binary, a non-zero exit or a
    /// timeout all count as "not available".
    pub async fn probe(&self) -> ToolAvailability {
        let (ytdlp, ffmpeg) = tokio::join!(
            self.get_version(ToolType::YtDlp),
            self.get_version(ToolType::Ffmpeg),
        );
        ToolAvailability::new(ytdlp.is_some(), ffmpeg.is_some())
    }

    /// `Some(first line of output)` when the version query exits 0.
    async fn get_version(&self, tool_type: ToolType) -> Option<String> {
        let program = self.binary(tool_type);
        let args = vec![tool_type.version_arg().to_string()];

        match run_output_with_timeout(program, args, self.probe_timeout_secs).await {
            Ok(output) if output.status.success() => {
                let out = String::from_utf8_lossy(&output.stdout);
                Some(out.lines().next().unwrap_or("").trim().to_string())
            }
            Ok(output) => {
                debug!(tool = %tool_type, status = %output.status, "version query failed");
                None
            }
            Err(e) => {
                debug!(tool = %tool_type, error = %e, "version query failed");
                None
            }
        }
    }
}
