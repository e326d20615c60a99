//! Picks one usable image URL out of the catalog's raw `images` field.

use std::sync::LazyLock;

use regex::Regex;

static URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"https?://[^\s'",]+"#).expect("static regex"));

/// Returns a single image URL from a raw `images` value, or "" if none is found.
///
/// Handles pipe-delimited lists (`url1|url2`) and loose strings that embed a URL
/// somewhere, such as a stringified list (`['url1', 'url2']`).
pub fn first_image_url(raw: &str) -> String {
    let s = raw.trim();
    if s.contains('|') {
        let first = s.split('|').next().unwrap_or("").trim();
        if first.starts_with("http") {
            return first.to_string();
        }
    }
    URL.find(s).map(|m| m.as_str().to_string()).unwrap_or_default()
}
