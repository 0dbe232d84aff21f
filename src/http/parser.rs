use thiserror::Error;

use crate::http::request::ParsedRequest;
use crate::uri::UriComponents;

/// Maximum widths of the request-line tokens. Longer tokens are truncated.
pub const MAX_METHOD_LEN: usize = 9;
pub const MAX_PATH_LEN: usize = 511;
pub const MAX_VERSION_LEN: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Fewer than request line + blank separator were received.
    #[error("request has no blank line after its header")]
    MissingTerminator,
    #[error("empty request line")]
    EmptyRequestLine,
    #[error("request line has no path")]
    MissingPath,
    #[error("request target is not a path: {0:?}")]
    InvalidTarget(String),
}

/// Parses the request line and header lines out of `buf`.
///
/// The whole header must be present in `buf`; there is no incremental
/// re-read. Malformed input is rejected, never repaired.
pub fn parse_http_request(buf: &[u8]) -> Result<ParsedRequest, ParseError> {
    let headers_end = find_headers_end(buf).ok_or(ParseError::MissingTerminator)?;
    let head = String::from_utf8_lossy(&buf[..headers_end]);

    let mut lines = head.split("\r\n");

    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();

    let method = parts.next().ok_or(ParseError::EmptyRequestLine)?;
    let target = parts.next().ok_or(ParseError::MissingPath)?;
    let version = parts.next().unwrap_or_default();

    let target = truncate(target, MAX_PATH_LEN);
    let path = if target.starts_with('/') {
        target.to_string()
    } else {
        // absolute-form, e.g. "http://host/file"
        UriComponents::parse(target)
            .ok()
            .filter(|uri| uri.authority().is_some())
            .map(|uri| uri.request_target())
            .ok_or_else(|| ParseError::InvalidTarget(target.to_string()))?
    };

    let header_lines = lines
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    Ok(ParsedRequest {
        method: truncate(method, MAX_METHOD_LEN).to_string(),
        path,
        version: truncate(version, MAX_VERSION_LEN).to_string(),
        header_lines,
        payload_offset: headers_end + 4,
    })
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn truncate(token: &str, max: usize) -> &str {
    match token.char_indices().nth(max) {
        Some((idx, _)) => &token[..idx],
        None => token,
    }
}
