//! Stream ID extraction and local file naming

use crate::error::CoreError;
use civico_types::MediaKind;

/// Longest sanitized title, in characters
pub const MAX_FILENAME_CHARS: usize = 200;

const RESERVED: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Extract the numeric stream ID from a stream page URL.
///
/// The ID is the first run of digits that directly follows a `/` and is
/// directly followed by `-`, e.g. `https://civico.net/sandwell/23298-Safer-Streets`
/// yields `23298`. Only the path is searched when the URL parses.
pub fn extract_stream_id(page_url: &str) -> Result<u64, CoreError> {
    let trimmed = page_url.trim();
    let haystack = match url::Url::parse(trimmed) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => trimmed.to_string(),
    };

    find_id(&haystack).ok_or_else(|| CoreError::InvalidUrl(page_url.to_string()))
}

fn find_id(haystack: &str) -> Option<u64> {
    let bytes = haystack.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'/' {
            i += 1;
            continue;
        }
        let start = i + 1;
        let mut end = start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end > start && bytes.get(end) == Some(&b'-') {
            if let Ok(id) = haystack[start..end].parse() {
                return Some(id);
            }
        }
        i = end.max(start);
    }
    None
}

/// Map a stream title to a filesystem-safe name.
///
/// Each run of reserved characters, control characters and whitespace
/// becomes one `_`; leading/trailing `_` and `.` are trimmed and the result
/// is capped at [`MAX_FILENAME_CHARS`].
pub fn sanitize_filename(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut in_run = false;
    for c in title.chars() {
        if RESERVED.contains(&c) || c.is_whitespace() || c.is_control() {
            if !in_run {
                out.push('_');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }

    out.trim_matches(|c| c == '_' || c == '.')
        .chars()
        .take(MAX_FILENAME_CHARS)
        .collect()
}

/// `{id}_{safe_title}.{ext}`; an empty title falls back to `stream_{id}`
pub fn media_file_name(stream_id: u64, safe_title: &str, kind: MediaKind) -> String {
    if safe_title.is_empty() {
        format!("{}_stream_{}.{}", stream_id, stream_id, kind.extension())
    } else {
        format!("{}_{}.{}", stream_id, safe_title, kind.extension())
    }
}
