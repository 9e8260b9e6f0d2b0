//! Reply text sanitization.
//!
//! Replies arrive URL-encoded from the automation workflow and may
//! carry control characters or run far past a sensible length. The
//! pipeline is: percent-decode, strip C0/C1 controls (keeping tab,
//! newline, carriage return), then cap the length with a visible
//! truncation marker.

use percent_encoding::percent_decode_str;

/// Marker appended when a reply is truncated at the length cap.
pub const TRUNCATION_MARKER: &str = "…";

/// Percent-decode a reply body. Invalid UTF-8 sequences are replaced
/// rather than rejected; a reply that decodes badly is still a reply.
pub fn decode_reply(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// Strip C0 and C1 control characters, keeping common whitespace.
pub fn strip_controls(text: &str) -> String {
    text.chars()
        .filter(|&c| !c.is_control() || c == '\t' || c == '\n' || c == '\r')
        .collect()
}

/// Cap `text` at `max_chars` characters, appending the truncation
/// marker when anything was cut. Counts chars, not bytes, so the cut
/// always lands on a character boundary.
pub fn truncate_with_marker(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars).collect();
    format!("{kept}{TRUNCATION_MARKER}")
}

/// Full sanitization pipeline for an ingested reply.
pub fn clean_reply(raw: &str, max_chars: usize) -> String {
    let decoded = decode_reply(raw);
    let stripped = strip_controls(&decoded);
    truncate_with_marker(&stripped, max_chars)
}
