use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "m3u8_grabber=info,m3u8_grabber_lib=info";
const DEBUG_FILTER: &str = "m3u8_grabber=debug,m3u8_grabber_lib=debug";

/// Install the global subscriber. `RUST_LOG` wins over `debug` when set.
/// Logs go to stderr so stdout stays free for the result lines.
pub fn init(debug: bool) {
    let fallback = if debug { DEBUG_FILTER } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(debug)
        .with_writer(std::io::stderr)
        .try_init();
}
