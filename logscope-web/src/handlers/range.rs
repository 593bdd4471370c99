//! HTTP Range request handling for log downloads
//!
//! Supports single `bytes=` ranges from RFC 7233, including open-ended
//! (`bytes=100-`) and suffix (`bytes=-500`) forms. Anything else is treated
//! as a request for the whole file.

use axum::http::{HeaderMap, StatusCode, header};

/// Inclusive byte range of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte offset.
    pub start: u64,
    /// Last byte offset (inclusive).
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered.
    pub fn length(&self) -> u64 {
        self.end.saturating_sub(self.start) + 1
    }

    /// Value for the `Content-Range` header of a 206 response.
    pub fn content_range(&self, total_size: u64) -> String {
        format!("bytes {}-{}/{total_size}", self.start, self.end)
    }
}

/// Parse an HTTP Range header against a file of `total_size` bytes.
///
/// Returns `None` if the header is not a single `bytes=` range, in which
/// case the whole file should be served.
///
/// # Examples
/// ```
/// use logscope_web::handlers::range::{ByteRange, parse_range_header};
/// let range = parse_range_header("bytes=100-199", 1000);
/// assert_eq!(range, Some(ByteRange { start: 100, end: 199 }));
/// ```
pub fn parse_range_header(range: &str, total_size: u64) -> Option<ByteRange> {
    let range_spec = range.strip_prefix("bytes=")?.trim();
    if range_spec.contains(',') {
        return None;
    }

    let (start_str, end_str) = range_spec.split_once('-')?;
    let last = total_size.saturating_sub(1);

    if start_str.is_empty() {
        // Suffix range: the last N bytes
        let suffix = end_str.parse::<u64>().ok()?;
        return Some(ByteRange {
            start: total_size.saturating_sub(suffix),
            end: last,
        });
    }

    let start = start_str.parse::<u64>().ok()?;
    if end_str.is_empty() {
        // Open-ended; a start past the end is left for validate_range_bounds
        return Some(ByteRange { start, end: last });
    }

    let end = end_str.parse::<u64>().ok()?;
    (start <= end).then_some(ByteRange { start, end })
}

/// Clamp `range` to a file of `available_size` bytes.
///
/// # Errors
/// Returns RANGE_NOT_SATISFIABLE if the range starts at or past the end of the file
pub fn validate_range_bounds(range: ByteRange, available_size: u64) -> Result<ByteRange, StatusCode> {
    if range.start >= available_size {
        return Err(StatusCode::RANGE_NOT_SATISFIABLE);
    }

    Ok(ByteRange {
        start: range.start,
        end: range.end.min(available_size - 1),
    })
}

/// Extract the Range header value, if present and valid UTF-8.
pub fn extract_range_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::RANGE)
        .and_then(|range| range.to_str().ok())
}
