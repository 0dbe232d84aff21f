//! Byte-exact transfer primitives.
//!
//! Every read or write the server performs on a socket or a file goes
//! through these helpers. Interrupted calls are retried transparently;
//! writes drain their whole buffer or report the first hard error; reads
//! come up short only at end-of-stream.

use std::io::{self, ErrorKind};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Chunk size used for streaming copies.
pub const CHUNK_SIZE: usize = 8192;

/// Failure of [`copy_exact`], split by the side that failed.
#[derive(Debug, Error)]
pub enum CopyError {
    #[error("read failed: {0}")]
    Read(#[source] io::Error),
    #[error("write failed: {0}")]
    Write(#[source] io::Error),
    #[error("stream ended with {remaining} bytes still expected")]
    UnexpectedEof { remaining: u64 },
}

/// Single read that retries on `Interrupted`. Returns `Ok(0)` at end-of-stream.
pub async fn read_some<R>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    loop {
        match reader.read(buf).await {
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Fills as much of `buf` as the stream allows. The returned count is below
/// `buf.len()` only if the stream ended.
pub async fn read_exact<R>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = read_some(reader, &mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Writes all of `buf`, retrying on `Interrupted`.
pub async fn write_exact<W>(writer: &mut W, buf: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut written = 0;
    while written < buf.len() {
        match writer.write(&buf[written..]).await {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::WriteZero,
                    "connection closed while writing",
                ));
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    writer.flush().await
}

/// Copies exactly `len` bytes from `reader` to `writer` in bounded chunks.
///
/// Never reads past `len`, so the bytes following the payload on `reader`
/// are left untouched.
pub async fn copy_exact<R, W>(reader: &mut R, writer: &mut W, len: u64) -> Result<u64, CopyError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut remaining = len;
    while remaining > 0 {
        let want = remaining.min(CHUNK_SIZE as u64) as usize;
        let n = read_some(reader, &mut buf[..want]).await.map_err(CopyError::Read)?;
        if n == 0 {
            return Err(CopyError::UnexpectedEof { remaining });
        }
        write_exact(writer, &buf[..n]).await.map_err(CopyError::Write)?;
        remaining -= n as u64;
    }
    Ok(len)
}
