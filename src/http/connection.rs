use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::engine;
use crate::http::parser::parse_http_request;
use crate::http::response::StatusCode;
use crate::http::router::dispatch;
use crate::net::read_some;
use crate::server::context::ServerContext;

/// Size of the single read that must capture the whole request header.
pub const REQUEST_BUFFER_SIZE: usize = 8192;

/// One accepted connection, handled end to end by its own task.
///
/// The request header is taken from a single read of up to
/// [`REQUEST_BUFFER_SIZE`] bytes; headers that do not fit are not supported.
/// Exactly one request is served, then the stream is closed.
pub struct Connection<S> {
    stream: S,
    peer: SocketAddr,
    ctx: Arc<ServerContext>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer: SocketAddr, ctx: Arc<ServerContext>) -> Self {
        Self { stream, peer, ctx }
    }

    /// Serves one request. The stream is dropped, and thereby closed, on
    /// every return path.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut buffer = vec![0u8; REQUEST_BUFFER_SIZE];
        let n = read_some(&mut self.stream, &mut buffer).await?;
        if n == 0 {
            debug!(peer = %self.peer, "Peer closed before sending a request");
            return Ok(());
        }
        buffer.truncate(n);

        let status = match parse_http_request(&buffer) {
            Ok(req) => {
                info!(peer = %self.peer, method = %req.method, path = %req.path, version = %req.version, "Request");
                dispatch(&mut self.stream, &self.ctx, &req, &buffer).await?
            }
            Err(e) => {
                debug!(peer = %self.peer, error = %e, bytes = n, "Bad request");
                engine::reply(&mut self.stream, &self.ctx, StatusCode::BadRequest).await?
            }
        };
        debug!(peer = %self.peer, status = status.as_u16(), "Response sent");

        // best effort; the peer may already be gone
        let _ = self.stream.shutdown().await;
        Ok(())
    }
}
