//! rxbridge Protocol - Wire protocol for the automation bridge
//!
//! This crate provides request parsing, response framing, and the typed
//! JSON bodies exchanged between the bridge server and the desktop
//! automation client.

pub mod body;
pub mod request;
pub mod response;
pub mod version;

pub use body::{
    ClearBody, CompleteBody, CurrentBody, DrugsBody, ErrorBody, SendBody, SessionSummary,
    StartBody, StartRequest, StatusBody, ACTION_PASTE_AND_ENTER,
};
pub use request::{body_or_default, parse_body_line, Method, RequestError, RequestLine};
pub use response::{HttpResponse, StatusCode};
pub use version::ProtocolVersion;
