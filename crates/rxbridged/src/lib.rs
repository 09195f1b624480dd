//! rxbridge Daemon - the prescription automation bridge server
//!
//! This crate provides the server side of the bridge:
//! - `bind` - two-shot port binder and local address discovery
//! - `server` - `BridgeServer` lifecycle controller and accept loop
//! - `connection` - per-connection request/response handler
//! - `router` - (method, path) dispatch over the seven routes
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │   BridgeServer   │  start()/stop(), watch-published ServerStatus
//! │   TcpListener    │
//! └────────┬─────────┘
//!          │ accept()
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │ handle_connection│────▶│   SessionStore   │
//! │ (task per client)│     │ (shared snapshots)│
//! └────────┬─────────┘     └──────────────────┘
//!          │ one request, one response, close
//!          ▼
//! ┌──────────────────┐
//! │ automation client│
//! └──────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate is panic-free:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Per-connection failures are logged and never reach the accept loop

pub mod bind;
pub mod connection;
pub mod router;
pub mod server;

pub use bind::{bind_with_fallback, local_ipv4_addr, BindError};
pub use server::{BridgeServer, ServerError, DEFAULT_FALLBACK_PORT, DEFAULT_PORT};
