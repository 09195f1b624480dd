//! Bridge server lifecycle controller and accept loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rxbridge_core::{ServerStatus, SessionStore};
use tokio::net::TcpListener;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::bind::{bind_with_fallback, local_ipv4_addr, BindError};
use crate::connection::handle_connection;

/// Default preferred port the automation client tries first.
pub const DEFAULT_PORT: u16 = 8080;

/// Fixed secondary port used when the preferred one is taken.
pub const DEFAULT_FALLBACK_PORT: u16 = 8081;

/// The running half of the server: owned by `BridgeServer` between a
/// successful `start()` and the matching `stop()`.
struct AcceptorTask {
    port: u16,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owned lifecycle controller for the bridge server.
///
/// Explicitly constructed and owned rather than ambient global state, so
/// tests can run several independent instances on different ports in one
/// process. `start()`/`stop()` drive every `ServerStatus` transition; the
/// current status is published through a watch channel for the embedding
/// UI and any other subscriber.
pub struct BridgeServer {
    store: Arc<SessionStore>,
    preferred_port: u16,
    fallback_port: u16,
    status_tx: watch::Sender<ServerStatus>,
    acceptor: Mutex<Option<AcceptorTask>>,
    connection_counter: Arc<AtomicU64>,
}

impl BridgeServer {
    /// Creates a stopped server around the given store and port pair.
    pub fn new(store: Arc<SessionStore>, preferred_port: u16, fallback_port: u16) -> Self {
        let (status_tx, _) = watch::channel(ServerStatus::Stopped);
        Self {
            store,
            preferred_port,
            fallback_port,
            status_tx,
            acceptor: Mutex::new(None),
            connection_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Creates a server with the default 8080/8081 port pair.
    pub fn with_default_ports(store: Arc<SessionStore>) -> Self {
        Self::new(store, DEFAULT_PORT, DEFAULT_FALLBACK_PORT)
    }

    /// Returns the shared session store.
    pub fn store(&self) -> Arc<SessionStore> {
        Arc::clone(&self.store)
    }

    /// Returns a snapshot of the current status.
    pub fn status(&self) -> ServerStatus {
        self.status_tx.borrow().clone()
    }

    /// Subscribes to status transitions.
    pub fn subscribe(&self) -> watch::Receiver<ServerStatus> {
        self.status_tx.subscribe()
    }

    /// Starts the server and returns the bound port.
    ///
    /// No-op returning the current port when already running. On bind
    /// failure the status becomes `Error` and the server stays stopped;
    /// a later `start()` may succeed once a port frees up.
    pub async fn start(&self) -> Result<u16, ServerError> {
        let mut acceptor = self.acceptor.lock().await;
        if let Some(running) = acceptor.as_ref() {
            debug!(port = running.port, "Start requested while already running");
            return Ok(running.port);
        }

        self.publish(ServerStatus::Starting {
            port: self.preferred_port,
        });

        let (listener, port) =
            match bind_with_fallback(self.preferred_port, self.fallback_port).await {
                Ok(bound) => bound,
                Err(e) => {
                    self.publish(ServerStatus::Error {
                        message: e.to_string(),
                    });
                    return Err(e.into());
                }
            };

        let address = local_ipv4_addr();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.store),
            cancel.clone(),
            Arc::clone(&self.connection_counter),
        ));

        info!(port, address = %address, "Bridge server listening");
        self.publish(ServerStatus::Running {
            port,
            address,
        });

        *acceptor = Some(AcceptorTask {
            port,
            cancel,
            handle,
        });
        Ok(port)
    }

    /// Stops the server. Idempotent.
    ///
    /// Cancels the accept loop (which drops the listening socket when it
    /// exits) and waits for it to finish. In-flight connection handlers are
    /// not cancelled; they complete their single request/response cycle
    /// under their own deadlines.
    pub async fn stop(&self) {
        let mut acceptor = self.acceptor.lock().await;
        if let Some(running) = acceptor.take() {
            running.cancel.cancel();
            if let Err(e) = running.handle.await {
                error!(error = %e, "Accept loop task failed during shutdown");
            }
            info!(port = running.port, "Bridge server stopped");
        }
        self.publish(ServerStatus::Stopped);
    }

    fn publish(&self, status: ServerStatus) {
        debug!(status = %status, "Server status transition");
        let _ = self.status_tx.send(status);
    }
}

/// Accepts connections until cancelled, spawning one handler task each.
///
/// The loop never waits on a handler: a slow or malformed client cannot
/// stall later connections. A failed `accept()` while running is logged
/// and the loop continues; failures during shutdown are expected noise.
async fn accept_loop(
    listener: TcpListener,
    store: Arc<SessionStore>,
    cancel: CancellationToken,
    connection_counter: Arc<AtomicU64>,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Accept loop shutdown requested");
                break;
            }

            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let conn_num = connection_counter.fetch_add(1, Ordering::Relaxed);
                        let store = Arc::clone(&store);
                        tokio::spawn(handle_connection(stream, store, conn_num));
                    }
                    Err(e) => {
                        if cancel.is_cancelled() {
                            break;
                        }
                        error!(error = %e, "Failed to accept connection");
                    }
                }
            }
        }
    }
    // Listener drops here, releasing the port.
}

/// Errors that can occur in server lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Bind(#[from] BindError),
}
