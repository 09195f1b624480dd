//! Minimal HTTP/1.1 response framing.
//!
//! Responses are built as literal text: status line, `Content-Type`,
//! `Content-Length` (byte length of the body), a permissive CORS header
//! for browser-based tooling, a blank line, then the JSON body. No chunked
//! encoding, no compression, CRLF line terminators.

use crate::body::ErrorBody;
use serde::Serialize;

/// Status codes the bridge actually emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    BadRequest,
    NotFound,
}

impl StatusCode {
    /// Numeric code for the status line.
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::NotFound => 404,
        }
    }

    /// Reason phrase for the status line.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::BadRequest => "Bad Request",
            Self::NotFound => "Not Found",
        }
    }
}

/// A fully framed HTTP response ready to be written to the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    status: StatusCode,
    body: String,
}

impl HttpResponse {
    /// Builds a 200 response around a serializable body.
    pub fn ok<T: Serialize>(body: &T) -> Self {
        Self::json(StatusCode::Ok, body)
    }

    /// Builds an error response with the `{error, code}` body shape.
    pub fn error(status: StatusCode, message: &str) -> Self {
        let body = ErrorBody::new(message, status.code());
        Self::json(status, &body)
    }

    /// The canonical 404 for unroutable (method, path) pairs.
    pub fn not_found() -> Self {
        Self::error(StatusCode::NotFound, "Not Found")
    }

    /// Frames an arbitrary body at the given status.
    ///
    /// Serialization of the bridge's own body types cannot fail; should it
    /// ever, an empty object keeps the framing valid rather than panicking.
    pub fn json<T: Serialize>(status: StatusCode, body: &T) -> Self {
        let body = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
        Self { status, body }
    }

    /// Returns the status of this response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the JSON body text.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Renders the response as wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let head = format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Access-Control-Allow-Origin: *\r\n\
             \r\n",
            self.status.code(),
            self.status.reason(),
            self.body.len(),
        );

        let mut bytes = Vec::with_capacity(head.len() + self.body.len());
        bytes.extend_from_slice(head.as_bytes());
        bytes.extend_from_slice(self.body.as_bytes());
        bytes
    }
}
