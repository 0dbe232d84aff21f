/// HTTP status codes the server sends.
///
/// - `Continue` (100): Interim reply to `Expect: 100-continue`
/// - `Ok` (200): File, listing or DNS answer follows
/// - `Created` (201): PUT stored the upload
/// - `BadRequest` (400): Malformed request or short upload
/// - `Forbidden` (403): Target is neither a file nor a directory
/// - `NotFound` (404): No such file, or the DNS relay got no answer
/// - `MethodNotAllowed` (405): Method not served
/// - `InternalServerError` (503): Local failure before the reply started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 100 Continue
    Continue,
    /// 200 OK
    Ok,
    /// 201 Created
    Created,
    /// 400 Bad Request
    BadRequest,
    /// 403 Forbidden
    Forbidden,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
    /// 503 Internal Server Error
    InternalServerError,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// Local failures are reported as 503, which is what directory-server
    /// peers of this daemon expect.
    ///
    /// # Example
    ///
    /// ```
    /// # use httpdnsd::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::InternalServerError.as_u16(), 503);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Continue => 100,
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::BadRequest => 400,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::InternalServerError => 503,
        }
    }

    /// Returns the reason phrase sent after the numeric code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Continue => "Continue",
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }

    /// `"404 Not Found"`: the status line text, also used as error body.
    pub fn status_text(&self) -> String {
        format!("{} {}", self.as_u16(), self.reason_phrase())
    }
}

/// A complete HTTP response, or just its head when the body is streamed
/// separately.
#[derive(Debug)]
pub struct Response {
    /// The HTTP status code
    pub status: StatusCode,
    /// Header fields in the order they are written
    pub headers: Vec<(String, String)>,
    /// Response body as bytes
    pub body: Vec<u8>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```
/// # use httpdnsd::http::response::{ResponseBuilder, StatusCode};
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "text/plain")
///     .body(b"hello".to_vec())
///     .build();
/// assert_eq!(response.header("Content-Length"), Some("5"));
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    content_length: bool,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
            content_length: true,
        }
    }

    /// Adds a header, replacing an earlier one with the same name
    /// (ASCII case-insensitive) in place.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&key)) {
            Some(slot) => slot.1 = value,
            None => self.headers.push((key, value)),
        }
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Omits the automatic Content-Length header (interim responses).
    pub fn without_content_length(mut self) -> Self {
        self.content_length = false;
        self
    }

    /// Builds the final Response.
    ///
    /// Adds a Content-Length header matching the body unless one was set
    /// explicitly or it was disabled.
    pub fn build(mut self) -> Response {
        let has_length = self
            .headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case("Content-Length"));
        if self.content_length && !has_length {
            let len = self.body.len().to_string();
            self.headers.push(("Content-Length".to_string(), len));
        }

        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    /// Looks up a header value by name (ASCII case-insensitive).
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// A `text/plain` response carrying `body`.
    pub fn text(status: StatusCode, operator_id: &str, body: impl Into<Vec<u8>>) -> Self {
        ResponseBuilder::new(status)
            .header("Iam", operator_id)
            .header("Content-Type", "text/plain")
            .header("Connection", "close")
            .body(body.into())
            .build()
    }

    /// A status-only reply whose body repeats the status line text.
    pub fn status_page(status: StatusCode, operator_id: &str) -> Self {
        Self::text(status, operator_id, status.status_text())
    }

    /// Head of a `200 OK` whose `length`-byte body is streamed afterwards.
    pub fn streamed_head(operator_id: &str, length: u64) -> Self {
        ResponseBuilder::new(StatusCode::Ok)
            .header("Iam", operator_id)
            .header("Content-Type", "text/plain")
            .header("Content-Length", length.to_string())
            .header("Connection", "close")
            .build()
    }

    /// Header-only reply such as `100 Continue`.
    pub fn interim(status: StatusCode, operator_id: &str) -> Self {
        ResponseBuilder::new(status)
            .header("Iam", operator_id)
            .header("Connection", "close")
            .without_content_length()
            .build()
    }
}
