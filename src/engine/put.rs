use std::io;

use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use super::reply;
use crate::http::request::ParsedRequest;
use crate::http::response::{Response, StatusCode};
use crate::http::writer::send;
use crate::net::{CopyError, copy_exact, write_exact};
use crate::server::context::ServerContext;

/// Stores an upload of exactly `Content-Length` bytes.
///
/// `captured` is the part of the payload that arrived together with the
/// header; it is written first and the rest is streamed from the socket.
/// A peer that stops sending early gets 400, a local write failure 503.
pub async fn handle_put<S>(
    stream: &mut S,
    ctx: &ServerContext,
    req: &ParsedRequest,
    captured: &[u8],
) -> io::Result<StatusCode>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let content_length = match req.content_length() {
        Ok(len) => len,
        Err(e) => {
            debug!(path = %req.path, reason = ?e, "Rejecting PUT without usable Content-Length");
            return reply(stream, ctx, StatusCode::BadRequest).await;
        }
    };

    let Some(target) = ctx.resolve_path(&req.path) else {
        return reply(stream, ctx, StatusCode::Forbidden).await;
    };
    if fs::metadata(&target).await.map(|m| m.is_dir()).unwrap_or(false) {
        return reply(stream, ctx, StatusCode::Forbidden).await;
    }

    if req.expects_continue() {
        send(stream, &Response::interim(StatusCode::Continue, &ctx.operator_id)).await?;
    }

    let mut file = match OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&target)
        .await
    {
        Ok(f) => f,
        Err(e) => {
            warn!(path = %target.display(), error = %e, "Cannot create upload target");
            return reply(stream, ctx, StatusCode::InternalServerError).await;
        }
    };

    let initial_len = captured.len().min(usize::try_from(content_length).unwrap_or(usize::MAX));
    if let Err(e) = write_exact(&mut file, &captured[..initial_len]).await {
        warn!(path = %target.display(), error = %e, "Writing upload failed");
        return reply(stream, ctx, StatusCode::InternalServerError).await;
    }
    let remaining = content_length - initial_len as u64;

    match copy_exact(stream, &mut file, remaining).await {
        Ok(_) => {
            debug!(path = %target.display(), bytes = content_length, "Upload stored");
            reply(stream, ctx, StatusCode::Created).await
        }
        Err(CopyError::Write(e)) => {
            warn!(path = %target.display(), error = %e, "Writing upload failed");
            reply(stream, ctx, StatusCode::InternalServerError).await
        }
        Err(e) => {
            debug!(path = %target.display(), error = %e, "Upload cut short by peer");
            reply(stream, ctx, StatusCode::BadRequest).await
        }
    }
}
