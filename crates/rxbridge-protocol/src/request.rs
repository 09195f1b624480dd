//! Request-line parsing for the minimal HTTP surface.
//!
//! The bridge speaks a deliberately tiny dialect: one request line
//! (`METHOD PATH`, version token ignored) and, for POST routes, at most one
//! additional line holding an optional JSON body. There is no header
//! processing and no keep-alive; a full HTTP stack would be dead weight for
//! a fixed seven-route protocol.

use serde::Deserialize;
use thiserror::Error;
use std::fmt;

/// HTTP methods the bridge routes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    /// Parses a method token from the request line.
    pub fn parse(token: &str) -> Result<Self, RequestError> {
        match token {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "DELETE" => Ok(Self::Delete),
            other => Err(RequestError::UnsupportedMethod(other.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// A parsed request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    pub path: String,
}

impl RequestLine {
    /// Parses `METHOD PATH [VERSION]` from a raw request line.
    ///
    /// The HTTP version token, when present, is ignored. Fewer than two
    /// tokens is a protocol error; the connection handler drops such
    /// connections without a response.
    pub fn parse(line: &str) -> Result<Self, RequestError> {
        let mut tokens = line.split_whitespace();
        let method_token = tokens
            .next()
            .ok_or_else(|| RequestError::TooFewTokens(line.trim().to_string()))?;
        let path = tokens
            .next()
            .ok_or_else(|| RequestError::TooFewTokens(line.trim().to_string()))?;

        Ok(Self {
            method: Method::parse(method_token)?,
            path: path.to_string(),
        })
    }
}

impl fmt::Display for RequestLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Tolerantly parses an optional one-line JSON body.
///
/// Anything that does not look like a JSON object (header lines, blank
/// lines, garbage) yields `None` rather than an error: an absent body is a
/// legal request, so the server never punishes a client for omitting it.
pub fn parse_body_line(line: &str) -> Option<serde_json::Value> {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    serde_json::from_str(trimmed).ok().filter(serde_json::Value::is_object)
}

/// Deserializes the optional body into a typed request, defaulting on
/// absence or mismatch.
pub fn body_or_default<T>(body: Option<serde_json::Value>) -> T
where
    T: for<'de> Deserialize<'de> + Default,
{
    body.and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default()
}

/// Errors that can occur while parsing a request.
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    #[error("Request line has too few tokens: '{0}'")]
    TooFewTokens(String),

    #[error("Unsupported method: '{0}'")]
    UnsupportedMethod(String),
}
