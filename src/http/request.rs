/// HTTP request methods the router serves. Any other token is answered
/// with 405 Method Not Allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a file or a directory listing
    GET,
    /// POST - Submit a DNS query form
    POST,
    /// PUT - Upload a file
    PUT,
}

impl Method {
    /// Parses an HTTP method from its request-line token.
    ///
    /// # Example
    ///
    /// ```
    /// # use httpdnsd::http::request::Method;
    /// assert_eq!(Method::from_token("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_token("get"), None);
    /// ```
    pub fn from_token(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            _ => None,
        }
    }
}

/// A request as read from the wire.
///
/// Header lines are kept raw and in arrival order; lookups scan them
/// linearly. The payload itself is not copied: `payload_offset` points into
/// the buffer the request was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    /// Method token as sent (possibly truncated)
    pub method: String,
    /// Request path, always starting with `/`
    pub path: String,
    /// Protocol version token, e.g. "HTTP/1.1"
    pub version: String,
    /// Raw header lines, request line and blank separator excluded
    pub header_lines: Vec<String>,
    /// Offset of the first payload byte in the source buffer
    pub payload_offset: usize,
}

/// Why a Content-Length header could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentLengthError {
    Missing,
    Invalid(String),
    Negative(i64),
}

impl ParsedRequest {
    pub fn method(&self) -> Option<Method> {
        Method::from_token(&self.method)
    }

    /// Retrieves the value of the first header named `name`
    /// (ASCII case-insensitive), trimmed of surrounding whitespace.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_lines.iter().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }

    /// The declared payload size.
    pub fn content_length(&self) -> Result<u64, ContentLengthError> {
        let raw = self.header("Content-Length").ok_or(ContentLengthError::Missing)?;
        let value: i64 = raw
            .parse()
            .map_err(|_| ContentLengthError::Invalid(raw.to_string()))?;
        u64::try_from(value).map_err(|_| ContentLengthError::Negative(value))
    }

    /// Whether the client sent `Expect: 100-continue`.
    pub fn expects_continue(&self) -> bool {
        self.header("Expect")
            .map(|v| v.eq_ignore_ascii_case("100-continue"))
            .unwrap_or(false)
    }

    /// Payload bytes captured together with the header.
    pub fn captured_payload<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        buf.get(self.payload_offset..).unwrap_or(&[])
    }
}
