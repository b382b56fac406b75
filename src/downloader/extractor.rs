// Manifest URL extraction from page text
//
// Pages embed their player config in many shapes. The matchers below are
// tried in order and the first one that finds anything wins; within a
// matcher the first occurrence in the document is used.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

lazy_static! {
    // "url": "https:\/\/cdn...\/index.m3u8?..."
    static ref JSON_DOUBLE_QUOTED_RE: Regex =
        Regex::new(r#""url"\s*:\s*"([^"]+\.(?i:m3u8)[^"]*)""#).unwrap();
    // 'url': '...m3u8...'
    static ref JSON_SINGLE_QUOTED_RE: Regex =
        Regex::new(r#"'url'\s*:\s*'([^']+\.(?i:m3u8)[^']*)'"#).unwrap();
    // https://host/path/index.m3u8 anywhere in the text
    static ref BARE_URL_RE: Regex =
        Regex::new(r#"https?://[^\s"'<>]+\.(?i:m3u8)[^\s"'<>]*"#).unwrap();
    // source: '...m3u8...' with the key optionally quoted
    static ref SOURCE_PROPERTY_RE: Regex =
        Regex::new(r#"["']?source["']?\s*:\s*["']([^"']+\.(?i:m3u8)[^"']*)["']"#).unwrap();
}

/// A matcher returns the raw (still escaped) text of its first match.
pub type Matcher = fn(&str) -> Option<String>;

/// Matchers in priority order.
pub const MATCHERS: [(&str, Matcher); 4] = [
    ("json-double-quoted", match_json_double_quoted),
    ("json-single-quoted", match_json_single_quoted),
    ("bare-url", match_bare_url),
    ("source-property", match_source_property),
];

pub fn match_json_double_quoted(html: &str) -> Option<String> {
    first_capture(&JSON_DOUBLE_QUOTED_RE, html)
}

pub fn match_json_single_quoted(html: &str) -> Option<String> {
    first_capture(&JSON_SINGLE_QUOTED_RE, html)
}

pub fn match_bare_url(html: &str) -> Option<String> {
    BARE_URL_RE.find(html).map(|m| m.as_str().to_string())
}

pub fn match_source_property(html: &str) -> Option<String> {
    first_capture(&SOURCE_PROPERTY_RE, html)
}

fn first_capture(re: &Regex, html: &str) -> Option<String> {
    re.captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// `\/` → `/`, as found in JSON embedded in script tags.
pub fn unescape_slashes(text: &str) -> String {
    text.replace("\\/", "/")
}

/// Best-guess manifest URL in `html`, or `None`.
///
/// The value is unescaped but not validated; it may still be relative to the
/// page. See [`ManifestUrl::resolve`](super::models::ManifestUrl::resolve).
pub fn extract_manifest_url(html: &str) -> Option<String> {
    MATCHERS.iter().find_map(|(name, matcher)| {
        matcher(html).map(|raw| {
            debug!(matcher = *name, "manifest URL candidate found");
            unescape_slashes(&raw)
        })
    })
}
