use std::io;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use super::reply;
use crate::dns::{DnsError, DnsQuery, RecordType};
use crate::http::request::{ContentLengthError, ParsedRequest};
use crate::http::response::{Response, StatusCode};
use crate::http::writer::send;
use crate::net::read_exact;
use crate::server::context::ServerContext;

/// Largest form body accepted on `/dns-query`.
pub const MAX_FORM_LEN: u64 = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("missing required field `name`")]
    MissingName,
    #[error("unsupported record type {0:?}")]
    UnsupportedType(String),
}

/// A decoded `/dns-query` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsForm {
    pub query: DnsQuery,
    /// Resolver override
    pub server: Option<String>,
}

/// Decodes `name=..&type=A|AAAA&server=..`. Keys are matched
/// case-insensitively; the last occurrence of a key wins.
pub fn parse_form(body: &[u8]) -> Result<DnsForm, FormError> {
    let mut name = None;
    let mut record_type = RecordType::default();
    let mut server = None;

    for (key, value) in url::form_urlencoded::parse(body) {
        if key.eq_ignore_ascii_case("name") {
            name = Some(value.into_owned());
        } else if key.eq_ignore_ascii_case("type") {
            record_type = value
                .parse()
                .map_err(|_| FormError::UnsupportedType(value.into_owned()))?;
        } else if key.eq_ignore_ascii_case("server") {
            server = Some(value.into_owned()).filter(|s| !s.is_empty());
        }
    }

    let name = name.filter(|n| !n.is_empty()).ok_or(FormError::MissingName)?;
    Ok(DnsForm {
        query: DnsQuery { record_type, name },
        server,
    })
}

/// Relays the form's query and answers with one address per line.
/// A name that cannot be encoded is a 400; any other relay failure,
/// including the wait running out, is a 404.
pub async fn handle_dns_query<S>(
    stream: &mut S,
    ctx: &ServerContext,
    req: &ParsedRequest,
    captured: &[u8],
) -> io::Result<StatusCode>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let body = match read_form_body(stream, req, captured).await? {
        Some(body) => body,
        None => return reply(stream, ctx, StatusCode::BadRequest).await,
    };

    let form = match parse_form(&body) {
        Ok(form) => form,
        Err(e) => {
            debug!(error = %e, "Rejecting DNS query form");
            return reply(stream, ctx, StatusCode::BadRequest).await;
        }
    };

    debug!(name = %form.query.name, record_type = %form.query.record_type, "DNS query");
    match ctx.dns.resolve(&form.query, form.server.as_deref()).await {
        Ok(answer) => {
            let body = answer.to_text();
            send(stream, &Response::text(StatusCode::Ok, &ctx.operator_id, body)).await?;
            Ok(StatusCode::Ok)
        }
        Err(e @ DnsError::InvalidName(_)) => {
            debug!(error = %e, "Rejecting DNS query name");
            reply(stream, ctx, StatusCode::BadRequest).await
        }
        Err(e) => {
            warn!(name = %form.query.name, error = %e, "DNS relay failed");
            reply(stream, ctx, StatusCode::NotFound).await
        }
    }
}

/// The form body: the captured bytes, completed from the socket when
/// `Content-Length` announces more. `None` means the body is unusable.
async fn read_form_body<S>(stream: &mut S, req: &ParsedRequest, captured: &[u8]) -> io::Result<Option<Vec<u8>>>
where
    S: AsyncRead + Unpin,
{
    let declared = match req.content_length() {
        Ok(len) => len,
        Err(ContentLengthError::Missing) => return Ok(Some(captured.to_vec())),
        Err(_) => return Ok(None),
    };
    if declared > MAX_FORM_LEN {
        return Ok(None);
    }
    let declared = declared as usize;
    if declared <= captured.len() {
        return Ok(Some(captured[..declared].to_vec()));
    }

    let mut body = vec![0u8; declared];
    body[..captured.len()].copy_from_slice(captured);
    let n = read_exact(stream, &mut body[captured.len()..]).await?;
    if captured.len() + n < declared {
        return Ok(None);
    }
    Ok(Some(body))
}
