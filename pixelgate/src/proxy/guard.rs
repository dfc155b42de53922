//! Stateless checks applied to every origin response.
use hyper::StatusCode;
use smol_str::SmolStr;
use std::collections::HashSet;

/// True when the declared length is a number above `limit`.
///
/// A missing or unparsable header never counts as oversized.
pub fn is_oversized(content_length: Option<&str>, limit: u64) -> bool {
    content_length
        .and_then(|len| len.trim().parse::<u64>().ok())
        .map_or(false, |len| len > limit)
}

pub fn is_redirect_status(code: StatusCode) -> bool {
    matches!(code.as_u16(), 301 | 302 | 303 | 307 | 308)
}

pub fn is_not_modified(code: StatusCode) -> bool {
    code == StatusCode::NOT_MODIFIED
}

/// Matches the MIME essence of `content_type` (parameters stripped, case
/// folded) against `accepted`.
pub fn is_accepted_image_type(content_type: Option<&str>, accepted: &HashSet<SmolStr>) -> bool {
    match content_type.map(mime_essence) {
        Some(essence) if !essence.is_empty() => accepted.contains(essence.as_str()),
        _ => false,
    }
}

fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
