//! Per-method handlers invoked by the router.
//!
//! Each engine writes its own response and returns the status it sent, so
//! the connection can log it. An `Err` means the client socket failed.

pub mod dns_query;
pub mod get;
pub mod put;

use std::io;

use tokio::io::AsyncWrite;

use crate::http::response::{Response, StatusCode};
use crate::http::writer::send;
use crate::server::context::ServerContext;

pub use dns_query::handle_dns_query;
pub use get::handle_get;
pub use put::handle_put;

/// Sends a status-only reply.
pub(crate) async fn reply<S>(stream: &mut S, ctx: &ServerContext, status: StatusCode) -> io::Result<StatusCode>
where
    S: AsyncWrite + Unpin,
{
    send(stream, &Response::status_page(status, &ctx.operator_id)).await?;
    Ok(status)
}
