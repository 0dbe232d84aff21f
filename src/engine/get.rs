use std::io::{self, ErrorKind};
use std::path::Path;

use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::reply;
use crate::http::response::{Response, StatusCode};
use crate::http::writer::send;
use crate::net::copy_exact;
use crate::server::context::ServerContext;

/// Serves a regular file or a directory listing.
///
/// Returns the status that was sent. Once the head of a file response is on
/// the wire a failing copy is only logged: the connection is closed and the
/// client sees a short body.
pub async fn handle_get<S>(stream: &mut S, ctx: &ServerContext, path: &str) -> io::Result<StatusCode>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let Some(target) = ctx.resolve_path(path) else {
        return reply(stream, ctx, StatusCode::Forbidden).await;
    };

    let metadata = match fs::metadata(&target).await {
        Ok(m) => m,
        Err(e) => return reply(stream, ctx, status_for(&e)).await,
    };

    if metadata.is_file() {
        send_file(stream, ctx, &target).await
    } else if metadata.is_dir() {
        send_listing(stream, ctx, &target).await
    } else {
        reply(stream, ctx, StatusCode::Forbidden).await
    }
}

async fn send_file<S>(stream: &mut S, ctx: &ServerContext, target: &Path) -> io::Result<StatusCode>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut file = match File::open(target).await {
        Ok(f) => f,
        Err(e) => return reply(stream, ctx, status_for(&e)).await,
    };
    let length = match file.metadata().await {
        Ok(m) => m.len(),
        Err(_) => return reply(stream, ctx, StatusCode::InternalServerError).await,
    };

    send(stream, &Response::streamed_head(&ctx.operator_id, length)).await?;

    if let Err(e) = copy_exact(&mut file, stream, length).await {
        debug!(path = %target.display(), error = %e, "File transfer aborted");
    }
    Ok(StatusCode::Ok)
}

async fn send_listing<S>(stream: &mut S, ctx: &ServerContext, target: &Path) -> io::Result<StatusCode>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match list_directory(target).await {
        Ok(listing) => {
            send(stream, &Response::text(StatusCode::Ok, &ctx.operator_id, listing)).await?;
            Ok(StatusCode::Ok)
        }
        Err(e) => {
            debug!(path = %target.display(), error = %e, "Directory listing failed");
            reply(stream, ctx, StatusCode::InternalServerError).await
        }
    }
}

/// Entry names, sorted, one per line.
pub async fn list_directory(dir: &Path) -> io::Result<String> {
    let mut entries = fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names.into_iter().map(|n| n + "\n").collect())
}

fn status_for(e: &io::Error) -> StatusCode {
    match e.kind() {
        ErrorKind::PermissionDenied => StatusCode::Forbidden,
        _ => StatusCode::NotFound,
    }
}
