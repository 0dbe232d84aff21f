//! URI field extraction.
//!
//! A small, allocation-light decomposition of a URI string into its RFC 3986
//! components:
//!
//! ```text
//!   http://user@host:8080/a/b?q=1#f
//!   └┬─┘   └┬─┘ └┬─┘ └┬─┘└┬┘ └┬┘ └┬┘
//! scheme userinfo host port path query fragment
//!          └──────┬──────┘
//!             authority
//! ```
//!
//! The input is scanned once by [`UriComponents::parse`]; every component is
//! kept as a byte span into the (trimmed) source string so accessors never
//! copy. A component the grammar does not find is `None`, which is distinct
//! from a component that is present but empty (`http://host/?` has an empty
//! query, `http://host/` has none).

use std::fmt;
use std::ops::Range;

use thiserror::Error;

/// Reasons a URI cannot be decomposed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UriError {
    #[error("empty URI")]
    Empty,
    #[error("authority present but host is empty")]
    EmptyHost,
    #[error("port is not numeric: {0:?}")]
    InvalidPort(String),
    #[error("unterminated IP literal in authority")]
    UnterminatedIpLiteral,
}

/// Selects a single component (or a composite of components) of a URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Scheme,
    Userinfo,
    Host,
    Port,
    Path,
    Query,
    Fragment,
    /// `userinfo@host:port`
    Authority,
    /// Everything between `scheme:` and the query, including a leading `//`.
    HierPart,
    /// The whole URI without its fragment.
    Absolute,
}

/// The decomposed form of one URI string. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriComponents {
    source: String,
    scheme: Option<Range<usize>>,
    authority: Option<Range<usize>>,
    userinfo: Option<Range<usize>>,
    host: Option<Range<usize>>,
    port: Option<Range<usize>>,
    path: Range<usize>,
    query: Option<Range<usize>>,
    fragment: Option<Range<usize>>,
}

impl UriComponents {
    /// Decomposes `input`. Leading and trailing whitespace is ignored.
    pub fn parse(input: &str) -> Result<Self, UriError> {
        let source = input.trim();
        if source.is_empty() {
            return Err(UriError::Empty);
        }
        let bytes = source.as_bytes();
        let end = bytes.len();

        let scheme = scan_scheme(bytes);
        let hier_start = scheme.as_ref().map_or(0, |s| s.end + 1);

        // hier-part ends at the first '?' or '#'
        let hier_end = find_from(bytes, hier_start, |b| b == b'?' || b == b'#').unwrap_or(end);

        let mut authority = None;
        let mut userinfo = None;
        let mut host = None;
        let mut port = None;
        let mut path_start = hier_start;

        if source[hier_start..hier_end].starts_with("//") {
            let auth_start = hier_start + 2;
            let auth_end = find_from(bytes, auth_start, |b| b == b'/').map_or(hier_end, |i| i.min(hier_end));
            authority = Some(auth_start..auth_end);
            path_start = auth_end;

            let mut host_start = auth_start;
            if let Some(at) = find_from(&bytes[..auth_end], auth_start, |b| b == b'@') {
                userinfo = Some(auth_start..at);
                host_start = at + 1;
            }

            let (host_span, port_span) = split_host_port(bytes, host_start, auth_end)?;
            if host_span.is_empty() {
                return Err(UriError::EmptyHost);
            }
            if let Some(p) = &port_span {
                let digits = &source[p.clone()];
                if !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(UriError::InvalidPort(digits.to_string()));
                }
            }
            host = Some(host_span);
            port = port_span;
        }

        let path = path_start..hier_end;

        let mut query = None;
        let mut fragment = None;
        let mut cursor = hier_end;
        if cursor < end && bytes[cursor] == b'?' {
            let q_end = find_from(bytes, cursor + 1, |b| b == b'#').unwrap_or(end);
            query = Some(cursor + 1..q_end);
            cursor = q_end;
        }
        if cursor < end && bytes[cursor] == b'#' {
            fragment = Some(cursor + 1..end);
        }

        Ok(Self {
            source: source.to_string(),
            scheme,
            authority,
            userinfo,
            host,
            port,
            path,
            query,
            fragment,
        })
    }

    fn span(&self, range: &Option<Range<usize>>) -> Option<&str> {
        range.as_ref().map(|r| &self.source[r.clone()])
    }

    pub fn scheme(&self) -> Option<&str> {
        self.span(&self.scheme)
    }

    pub fn authority(&self) -> Option<&str> {
        self.span(&self.authority)
    }

    pub fn userinfo(&self) -> Option<&str> {
        self.span(&self.userinfo)
    }

    /// Host without IP-literal brackets.
    pub fn host(&self) -> Option<&str> {
        self.span(&self.host)
            .map(|h| h.strip_prefix('[').and_then(|h| h.strip_suffix(']')).unwrap_or(h))
    }

    pub fn port(&self) -> Option<&str> {
        self.span(&self.port)
    }

    /// The path, possibly empty. Every URI has one.
    pub fn path(&self) -> &str {
        &self.source[self.path.clone()]
    }

    pub fn query(&self) -> Option<&str> {
        self.span(&self.query)
    }

    pub fn fragment(&self) -> Option<&str> {
        self.span(&self.fragment)
    }

    pub fn hier_part(&self) -> &str {
        let start = self.scheme.as_ref().map_or(0, |s| s.end + 1);
        &self.source[start..self.path.end]
    }

    pub fn absolute(&self) -> &str {
        match &self.fragment {
            Some(f) => &self.source[..f.start - 1],
            None => &self.source,
        }
    }

    /// Path suitable for an HTTP request line: `/` when the path is empty,
    /// followed by `?query` when present.
    pub fn request_target(&self) -> String {
        let mut target = match self.path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };
        if let Some(q) = self.query() {
            target.push('?');
            target.push_str(q);
        }
        target
    }

    /// Port to connect to, falling back to the scheme's well-known port.
    pub fn port_or_default(&self) -> Option<u16> {
        match self.port() {
            Some(p) if !p.is_empty() => p.parse().ok(),
            _ => match self.scheme()?.to_ascii_lowercase().as_str() {
                "http" => Some(80),
                "https" => Some(443),
                _ => None,
            },
        }
    }

    pub fn field(&self, field: Field) -> Option<&str> {
        match field {
            Field::Scheme => self.scheme(),
            Field::Userinfo => self.userinfo(),
            Field::Host => self.host(),
            Field::Port => self.port(),
            Field::Path => Some(self.path()),
            Field::Query => self.query(),
            Field::Fragment => self.fragment(),
            Field::Authority => self.authority(),
            Field::HierPart => Some(self.hier_part()),
            Field::Absolute => Some(self.absolute()),
        }
    }
}

impl fmt::Display for UriComponents {
    /// Reassembles the URI from its components.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = self.scheme() {
            write!(f, "{scheme}:")?;
        }
        if let Some(authority) = self.authority() {
            write!(f, "//{authority}")?;
        }
        f.write_str(self.path())?;
        if let Some(query) = self.query() {
            write!(f, "?{query}")?;
        }
        if let Some(fragment) = self.fragment() {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

/// Extracts one field from `uri`, or `None` when the URI does not parse or
/// does not carry that field.
pub fn get_field(uri: &str, field: Field) -> Option<String> {
    let parsed = UriComponents::parse(uri).ok()?;
    parsed.field(field).map(str::to_string)
}

// scheme = ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) ":"
fn scan_scheme(bytes: &[u8]) -> Option<Range<usize>> {
    if !bytes.first()?.is_ascii_alphabetic() {
        return None;
    }
    for (i, &b) in bytes.iter().enumerate().skip(1) {
        match b {
            b':' => return Some(0..i),
            b if b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.') => {}
            _ => return None,
        }
    }
    None
}

fn split_host_port(
    bytes: &[u8],
    start: usize,
    end: usize,
) -> Result<(Range<usize>, Option<Range<usize>>), UriError> {
    if bytes.get(start) == Some(&b'[') {
        let close = find_from(&bytes[..end], start, |b| b == b']').ok_or(UriError::UnterminatedIpLiteral)?;
        let host = start..close + 1;
        return match bytes.get(close + 1) {
            Some(b':') if close + 1 < end => Ok((host, Some(close + 2..end))),
            _ if close + 1 == end => Ok((host, None)),
            _ => Err(UriError::InvalidPort(
                String::from_utf8_lossy(&bytes[close + 1..end]).into_owned(),
            )),
        };
    }
    match bytes[start..end].iter().rposition(|&b| b == b':') {
        Some(i) => Ok((start..start + i, Some(start + i + 1..end))),
        None => Ok((start..end, None)),
    }
}

fn find_from(bytes: &[u8], from: usize, pred: impl Fn(u8) -> bool) -> Option<usize> {
    bytes.get(from..)?.iter().position(|&b| pred(b)).map(|i| from + i)
}
