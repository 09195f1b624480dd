//! rxbridge daemon - standalone bridge server host
//!
//! Runs the prescription automation bridge outside the mobile app, standing
//! in for the OCR capture pipeline: every non-empty stdin line is appended
//! to the pending drug queue, so the full loop can be exercised end-to-end
//! against a real automation client.
//!
//! # Usage
//!
//! ```bash
//! # Start on the default ports (8080, fallback 8081)
//! rxbridged
//!
//! # Custom ports
//! rxbridged --port 9090 --fallback-port 9091
//!
//! # Override the default preferred port via environment
//! RXBRIDGE_PORT=9090 rxbridged
//!
//! # Enable debug logging
//! RUST_LOG=rxbridged=debug rxbridged
//! ```
//!
//! # Signal Handling
//!
//! - SIGTERM/SIGINT: graceful shutdown

use std::env;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use rxbridge_core::SessionStore;
use rxbridged::{BridgeServer, DEFAULT_FALLBACK_PORT, DEFAULT_PORT};

/// rxbridge daemon - prescription automation bridge
#[derive(Parser, Debug)]
#[command(name = "rxbridged", version, about)]
struct Args {
    /// Preferred listening port (defaults to $RXBRIDGE_PORT or 8080)
    #[arg(long)]
    port: Option<u16>,

    /// Fallback port when the preferred one is taken
    #[arg(long, default_value_t = DEFAULT_FALLBACK_PORT)]
    fallback_port: u16,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    /// Resolves the preferred port: flag, then environment, then default.
    fn preferred_port(&self) -> u16 {
        if let Some(port) = self.port {
            return port;
        }
        env::var("RXBRIDGE_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "rxbridged={level},rxbridge_core={level},rxbridge_protocol={level}",
            level = args.log_level
        ))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "rxbridge daemon starting"
    );

    let store = Arc::new(SessionStore::new());
    let server = BridgeServer::new(Arc::clone(&store), args.preferred_port(), args.fallback_port);

    // Log every status transition for the lifetime of the process.
    let mut status_rx = server.subscribe();
    tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let status = status_rx.borrow_and_update().clone();
            info!(status = %status, "Server status");
        }
    });

    let port = server.start().await?;
    info!(port, "Bridge ready; type drug names on stdin to queue them");

    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    // Capture-pipeline stand-in: one pending drug per non-empty stdin line.
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => break,

            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        let drug = line.trim();
                        if !drug.is_empty() {
                            store.add_drug(drug);
                            info!(drug = %drug, "Queued drug from stdin");
                        }
                    }
                    Ok(None) => {
                        // stdin closed; keep serving until signalled
                        cancel_token.cancelled().await;
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to read stdin");
                        cancel_token.cancelled().await;
                        break;
                    }
                }
            }
        }
    }

    server.stop().await;
    info!("rxbridge daemon stopped");
    Ok(())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
