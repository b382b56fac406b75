//! Runtime configuration.
//!
//! Defaults are compiled in; a handful of environment variables override
//! them:
//!
//! | variable                    | effect                                   |
//! |-----------------------------|------------------------------------------|
//! | `M3U8_GRABBER_PROXY`        | proxy for the page fetch and for yt-dlp / ffmpeg |
//! | `M3U8_GRABBER_TIMEOUT`      | page fetch timeout in seconds            |
//! | `M3U8_GRABBER_YTDLP`        | yt-dlp executable (name or path)         |
//! | `M3U8_GRABBER_FFMPEG`       | ffmpeg executable (name or path)         |
//! | `M3U8_GRABBER_SYSTEM_PROXY` | `0`/`false` ignores `HTTP(S)_PROXY` for the page fetch |

use tracing::warn;

use crate::downloader::models::NetworkConfig;

pub const ENV_PROXY: &str = "M3U8_GRABBER_PROXY";
pub const ENV_TIMEOUT: &str = "M3U8_GRABBER_TIMEOUT";
pub const ENV_YTDLP: &str = "M3U8_GRABBER_YTDLP";
pub const ENV_FFMPEG: &str = "M3U8_GRABBER_FFMPEG";
pub const ENV_SYSTEM_PROXY: &str = "M3U8_GRABBER_SYSTEM_PROXY";

/// Browser user agent sent with the page request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub ytdlp_bin: String,
    pub ffmpeg_bin: String,
    /// Upper bound for each `--version` probe
    pub probe_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            ytdlp_bin: "yt-dlp".to_string(),
            ffmpeg_bin: "ffmpeg".to_string(),
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Empty values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();

        if let Some(proxy) = get(ENV_PROXY) {
            config.network.proxy = Some(proxy);
        }
        if let Some(raw) = get(ENV_TIMEOUT) {
            match raw.parse::<u32>() {
                Ok(secs) if secs > 0 => config.network.timeout = Some(secs),
                _ => warn!("ignoring {}={:?}: expected a positive number of seconds", ENV_TIMEOUT, raw),
            }
        }
        if let Some(bin) = get(ENV_YTDLP) {
            config.ytdlp_bin = bin;
        }
        if let Some(bin) = get(ENV_FFMPEG) {
            config.ffmpeg_bin = bin;
        }
        if let Some(raw) = get(ENV_SYSTEM_PROXY) {
            match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => config.network.use_system_proxy = true,
                "0" | "false" | "no" | "off" => config.network.use_system_proxy = false,
                _ => warn!("ignoring {}={:?}: expected true or false", ENV_SYSTEM_PROXY, raw),
            }
        }

        config
    }
}
