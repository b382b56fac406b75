// Default output file names

use percent_encoding::percent_decode_str;
use url::Url;

pub const DEFAULT_OUTPUT_NAME: &str = "video.mp4";

/// Characters that are not allowed in a file name on common filesystems.
const RESERVED_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Derive a local file name from the page URL.
///
/// The last non-empty path segment (percent-decoded, minus `.html`) becomes
/// the base name and `.mp4` is appended whatever the stream actually carries.
/// Without a usable page URL the name is [`DEFAULT_OUTPUT_NAME`].
pub fn derive_output_name(page_url: &str, _manifest_url: &str) -> String {
    let page_url = page_url.trim();
    if page_url.is_empty() {
        return DEFAULT_OUTPUT_NAME.to_string();
    }

    let Ok(parsed) = Url::parse(page_url) else {
        return DEFAULT_OUTPUT_NAME.to_string();
    };

    let name = parsed.path_segments().and_then(|segments| {
        segments
            .map(|segment| percent_decode_str(segment).decode_utf8_lossy().replace(".html", ""))
            .filter(|segment| !segment.is_empty())
            .last()
    });

    match name {
        Some(name) => format!("{}.mp4", sanitize_file_name(&name)),
        None => DEFAULT_OUTPUT_NAME.to_string(),
    }
}

pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if RESERVED_CHARS.contains(&c) { '_' } else { c })
        .collect()
}
