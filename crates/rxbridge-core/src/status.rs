//! Server lifecycle status published to the embedding UI.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Current lifecycle state of the bridge server.
///
/// Mutated only by the server lifecycle controller; everyone else observes
/// it through a watch subscription. There is no terminal state: `Error` and
/// `Stopped` are both re-enterable via a new start attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ServerStatus {
    /// No socket bound.
    #[default]
    Stopped,

    /// Bind attempt in progress on the preferred port.
    Starting { port: u16 },

    /// Socket bound and accept loop active. `address` is the best-effort
    /// local network address to advertise to the automation client.
    Running { port: u16, address: String },

    /// Last start attempt failed; the server is otherwise stopped.
    Error { message: String },
}

impl ServerStatus {
    /// Returns the display label for this status.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting { .. } => "starting",
            Self::Running { .. } => "running",
            Self::Error { .. } => "error",
        }
    }

    /// Returns true if the accept loop is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    /// Returns the bound (or pending) port, if any.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        match self {
            Self::Starting { port } | Self::Running { port, .. } => Some(*port),
            _ => None,
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Starting { port } => write!(f, "starting on port {port}"),
            Self::Running { port, address } => write!(f, "running on {address}:{port}"),
            Self::Error { message } => write!(f, "error: {message}"),
        }
    }
}
