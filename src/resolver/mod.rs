//! Query normalization: turning raw input into a canonical identifier.
//!
//! A query is either a literal 11-character video identifier, a URL that
//! embeds one, or free text that has to go through the metadata provider
//! chain. Extraction never fails; the absence of a literal identifier is
//! signalled with `None` and the caller falls back to search.

use std::sync::OnceLock;

use regex::Regex;

/// Length of a canonical video identifier.
pub const MEDIA_ID_LEN: usize = 11;

fn media_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("valid pattern"))
}

/// Extract a canonical media identifier from raw query text.
///
/// Recognizes a bare 11-character identifier, a watch-style URL carrying it
/// in the `v=` query parameter, and a short-link URL embedding it in the
/// path. Everything else returns `None`.
pub fn extract_media_id(raw: &str) -> Option<String> {
    let query = raw.trim();

    if media_id_pattern().is_match(query) {
        return Some(query.to_string());
    }

    if let Some((_, rest)) = query.split_once("v=") {
        return truncate_candidate(rest);
    }
    if let Some((_, rest)) = query.split_once("youtu.be/") {
        return truncate_candidate(rest);
    }

    None
}

/// Truncate a URL remainder to identifier length and validate it.
fn truncate_candidate(rest: &str) -> Option<String> {
    let candidate: String = rest.chars().take(MEDIA_ID_LEN).collect();
    media_id_pattern()
        .is_match(&candidate)
        .then_some(candidate)
}

/// Format a duration in seconds as `M:SS`, or `H:MM:SS` past the hour.
pub fn format_duration(seconds: u64) -> String {
    let (minutes, secs) = (seconds / 60, seconds % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}
