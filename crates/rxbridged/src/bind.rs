//! Two-shot port binding and local address discovery.

use std::net::Ipv4Addr;

use tokio::net::TcpListener;
use tracing::{debug, warn};

/// Binds a listener on `preferred`, falling back to `fallback`.
///
/// The two-shot policy is deliberate: the deployment is a single phone on
/// a single local network where only one app instance should ever run, so
/// anything beyond one fallback candidate hides a real conflict. The
/// reported port always comes from `local_addr()`, which also makes
/// OS-assigned port 0 binds work for tests.
pub async fn bind_with_fallback(
    preferred: u16,
    fallback: u16,
) -> Result<(TcpListener, u16), BindError> {
    match try_bind(preferred).await {
        Ok(bound) => Ok(bound),
        Err(preferred_error) => {
            warn!(
                port = preferred,
                error = %preferred_error,
                "Preferred port unavailable, trying fallback"
            );
            match try_bind(fallback).await {
                Ok(bound) => Ok(bound),
                Err(fallback_error) => Err(BindError::BothPortsFailed {
                    preferred,
                    preferred_error,
                    fallback,
                    fallback_error,
                }),
            }
        }
    }
}

async fn try_bind(port: u16) -> Result<(TcpListener, u16), String> {
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
        .await
        .map_err(|e| e.to_string())?;
    let bound = listener
        .local_addr()
        .map_err(|e| e.to_string())?
        .port();
    debug!(port = bound, "Listener bound");
    Ok((listener, bound))
}

/// Best-effort discovery of the host's outward-facing IPv4 address.
///
/// Connecting a UDP socket sends no packets; it only asks the OS which
/// local source address it would route through. Advisory information for
/// the UI and the automation client, never used for binding, so any
/// failure degrades to the loopback literal instead of an error.
pub fn local_ipv4_addr() -> String {
    discover_route_addr().unwrap_or_else(|| "127.0.0.1".to_string())
}

fn discover_route_addr() -> Option<String> {
    let socket = std::net::UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let addr = socket.local_addr().ok()?;
    match addr.ip() {
        std::net::IpAddr::V4(ip) if !ip.is_loopback() => Some(ip.to_string()),
        _ => None,
    }
}

/// Errors that can occur while acquiring the listening socket.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error(
        "Failed to bind port {preferred} ({preferred_error}) and fallback port {fallback} ({fallback_error})"
    )]
    BothPortsFailed {
        preferred: u16,
        preferred_error: String,
        fallback: u16,
        fallback_error: String,
    },
}
