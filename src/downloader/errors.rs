// Error types for the download pipeline

use super::tools::ToolType;

/// Terminal outcome of a failed run. Nothing in the pipeline retries.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DownloadError {
    /// Neither a page URL nor an m3u8 URL was supplied
    #[error("no video page URL or m3u8 URL was given")]
    NoTargetSpecified,

    /// Neither yt-dlp nor ffmpeg can be run on this host
    #[error(
        "yt-dlp or ffmpeg is required but neither was found.\n\n\
         Install yt-dlp: pip install yt-dlp\n\
         Install ffmpeg: winget install ffmpeg (or https://ffmpeg.org/download.html)"
    )]
    NoToolAvailable,

    /// The tool explicitly asked for is not usable on this host
    #[error("{0} was requested but is not available.\n\nInstall it with: {hint}", hint = ToolType::install_hint(.0))]
    ToolUnavailable(ToolType),

    /// Page request failed (transport error or non-success status)
    #[error("failed to fetch page: {0}")]
    FetchFailed(String),

    /// The fetched page holds no m3u8 URL
    #[error("could not find an m3u8 URL in the page")]
    ManifestNotFound,

    /// Page or manifest URL could not be parsed
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The external tool exited unsuccessfully
    #[error("download failed ({tool} {})", exit_label(.code))]
    DownloadFailed {
        tool: ToolType,
        code: Option<i32>,
        file_size: Option<u64>,
    },

    /// The external tool could not be started
    #[error("execution error: {0}")]
    ExecutionError(String),

    /// A download is already running in this session
    #[error("a download is already in progress")]
    Busy,
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with code {}", code),
        None => "was terminated by a signal".to_string(),
    }
}

impl From<reqwest::Error> for DownloadError {
    fn from(e: reqwest::Error) -> Self {
        Self::FetchFailed(e.to_string())
    }
}

impl From<url::ParseError> for DownloadError {
    fn from(e: url::ParseError) -> Self {
        Self::InvalidUrl(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_tool_message_has_install_guidance() {
        let msg = DownloadError::NoToolAvailable.to_string();
        assert!(msg.contains("pip install yt-dlp"));
        assert!(msg.contains("ffmpeg"));
    }

    #[test]
    fn test_tool_unavailable_names_the_tool() {
        let msg = DownloadError::ToolUnavailable(ToolType::Ffmpeg).to_string();
        assert!(msg.starts_with("ffmpeg was requested"));
    }

    #[test]
    fn test_download_failed_reports_exit_code() {
        let err = DownloadError::DownloadFailed {
            tool: ToolType::YtDlp,
            code: Some(2),
            file_size: None,
        };
        assert_eq!(err.to_string(), "download failed (yt-dlp exited with code 2)");
    }
}
