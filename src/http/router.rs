use std::io;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::engine::{self, handle_dns_query, handle_get, handle_put};
use crate::http::request::{Method, ParsedRequest};
use crate::http::response::StatusCode;
use crate::server::context::ServerContext;

/// Path served by the DNS relay engine.
pub const DNS_QUERY_PATH: &str = "/dns-query";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Get,
    Put,
    DnsQuery,
    MethodNotAllowed,
}

/// Picks the engine for `req`.
pub fn route(req: &ParsedRequest) -> Route {
    match req.method() {
        Some(Method::GET) => Route::Get,
        Some(Method::PUT) => Route::Put,
        Some(Method::POST) if req.path.eq_ignore_ascii_case(DNS_QUERY_PATH) => Route::DnsQuery,
        _ => Route::MethodNotAllowed,
    }
}

/// Runs the engine selected by [`route`]. `buf` is the buffer `req` was
/// parsed from.
pub async fn dispatch<S>(
    stream: &mut S,
    ctx: &ServerContext,
    req: &ParsedRequest,
    buf: &[u8],
) -> io::Result<StatusCode>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let captured = req.captured_payload(buf);
    match route(req) {
        Route::Get => handle_get(stream, ctx, &req.path).await,
        Route::Put => handle_put(stream, ctx, req, captured).await,
        Route::DnsQuery => handle_dns_query(stream, ctx, req, captured).await,
        Route::MethodNotAllowed => engine::reply(stream, ctx, StatusCode::MethodNotAllowed).await,
    }
}
