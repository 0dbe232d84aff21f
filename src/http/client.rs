//! Outgoing HTTP PUT.
//!
//! Used for directory-server registration and for relaying a buffer to any
//! remote URL. Only the status code of the reply is read.

use anyhow::{Context, Result, bail};
use tracing::{debug, trace};

use crate::net::socket::tcp_connect;
use crate::net::{read_some, write_exact};
use crate::uri::UriComponents;

/// Enough to hold any sane status line.
const STATUS_LINE_LIMIT: usize = 512;

/// Builds the request head for a PUT of `body_len` bytes to `target`.
///
/// Content-Length is only sent for a non-empty body.
pub fn build_put_request(target: &UriComponents, body_len: usize, operator_id: &str) -> Result<Vec<u8>> {
    let host = target.host().context("URL has no host")?;

    let mut buffer = Vec::new();
    buffer.extend_from_slice(format!("PUT {} HTTP/1.1\r\n", target.request_target()).as_bytes());
    buffer.extend_from_slice(format!("Host: {host}\r\n").as_bytes());
    buffer.extend_from_slice(b"Content-Type: text/plain\r\n");
    if body_len > 0 {
        buffer.extend_from_slice(format!("Content-Length: {body_len}\r\n").as_bytes());
    }
    buffer.extend_from_slice(b"Connection: close\r\n");
    buffer.extend_from_slice(format!("Iam: {operator_id}\r\n").as_bytes());
    buffer.extend_from_slice(b"\r\n");
    Ok(buffer)
}

/// Extracts the numeric code from an `HTTP/1.x NNN ...` status line.
pub fn parse_status_code(response: &[u8]) -> Option<u16> {
    let line_end = response
        .windows(2)
        .position(|w| w == b"\r\n")
        .unwrap_or(response.len());
    let line = std::str::from_utf8(&response[..line_end]).ok()?;
    let mut parts = line.split_whitespace();
    if !parts.next()?.starts_with("HTTP/") {
        return None;
    }
    let code = parts.next()?;
    if code.len() != 3 {
        return None;
    }
    code.parse().ok()
}

/// PUTs `body` to `url` and returns the reply's status code.
pub async fn put_buf(url: &str, body: &[u8], operator_id: &str) -> Result<u16> {
    let target = UriComponents::parse(url).with_context(|| format!("malformed URL: {url}"))?;
    let host = target.host().context("URL has no host")?;
    let port = target
        .port_or_default()
        .with_context(|| format!("URL has no usable port: {url}"))?;

    let head = build_put_request(&target, body.len(), operator_id)?;

    let mut stream = tcp_connect(host, &port.to_string()).await?;
    trace!(url, "Connected for PUT");

    write_exact(&mut stream, &head).await.context("failed to send request head")?;
    write_exact(&mut stream, body).await.context("failed to send request body")?;

    let mut response = vec![0u8; STATUS_LINE_LIMIT];
    let mut filled = 0;
    while filled < response.len() {
        let n = read_some(&mut stream, &mut response[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
        if response[..filled].windows(2).any(|w| w == b"\r\n") {
            break;
        }
    }

    let Some(code) = parse_status_code(&response[..filled]) else {
        bail!("no valid status line in reply from {url}");
    };
    debug!(url, status = code, "PUT completed");
    Ok(code)
}
