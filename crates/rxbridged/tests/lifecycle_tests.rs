//! Lifecycle tests for the bridge server: port fallback, bind failure and
//! recovery, and status transitions observed through the watch channel.
//!
//! Tests CAN use `.unwrap()` and `.expect()` - the panic-free policy applies
//! to production code only.

use std::sync::Arc;
use std::time::Duration;

use rxbridge_core::{ServerStatus, SessionStore};
use rxbridged::BridgeServer;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};

/// Grace period for the listening socket to be released after stop.
const RELEASE_GRACE_PERIOD: Duration = Duration::from_millis(100);

/// Upper bound for a status transition to become observable.
const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

fn server_on(preferred: u16, fallback: u16) -> BridgeServer {
    BridgeServer::new(Arc::new(SessionStore::new()), preferred, fallback)
}

/// Grabs an ephemeral port and holds it, returning the guard and the port.
async fn occupy_port() -> (TcpListener, u16) {
    let listener = TcpListener::bind("0.0.0.0:0").await.expect("bind blocker");
    let port = listener.local_addr().expect("local addr").port();
    (listener, port)
}

#[tokio::test]
async fn test_falls_back_when_preferred_port_is_taken() {
    let (_blocker, busy_port) = occupy_port().await;

    let server = server_on(busy_port, 0);
    let port = server.start().await.expect("fallback bind should succeed");
    assert_ne!(port, busy_port);

    match server.status() {
        ServerStatus::Running { port: p, .. } => assert_eq!(p, port),
        other => panic!("Expected Running, got {other:?}"),
    }

    server.stop().await;
}

#[tokio::test]
async fn test_both_ports_taken_reports_error_then_recovers() {
    let (blocker_a, busy_a) = occupy_port().await;
    let (_blocker_b, busy_b) = occupy_port().await;

    let server = server_on(busy_a, busy_b);
    let err = server.start().await.expect_err("both ports are taken");
    let message = err.to_string();
    assert!(message.contains(&busy_a.to_string()), "message: {message}");
    assert!(message.contains(&busy_b.to_string()), "message: {message}");

    match server.status() {
        ServerStatus::Error { message } => {
            assert!(message.contains(&busy_a.to_string()));
        }
        other => panic!("Expected Error, got {other:?}"),
    }

    // Free the preferred port; the same server can start afterwards.
    drop(blocker_a);
    sleep(RELEASE_GRACE_PERIOD).await;

    let port = server.start().await.expect("retry after port freed");
    assert_eq!(port, busy_a);

    server.stop().await;
}

#[tokio::test]
async fn test_stop_releases_the_port() {
    let server = server_on(0, 0);
    let port = server.start().await.expect("start");

    // Reachable while running...
    TcpStream::connect(("127.0.0.1", port))
        .await
        .expect("connect while running");

    server.stop().await;
    sleep(RELEASE_GRACE_PERIOD).await;

    // ...and refused once stopped.
    let result = TcpStream::connect(("127.0.0.1", port)).await;
    assert!(result.is_err(), "expected refused connection after stop");

    // The freed port can be rebound immediately.
    let listener = TcpListener::bind(("0.0.0.0", port)).await;
    assert!(listener.is_ok(), "port should be free after stop");
}

#[tokio::test]
async fn test_subscriber_observes_running_then_stopped() {
    let server = server_on(0, 0);
    let mut status_rx = server.subscribe();
    assert_eq!(*status_rx.borrow(), ServerStatus::Stopped);

    let port = server.start().await.expect("start");
    let running = timeout(STATUS_TIMEOUT, status_rx.wait_for(ServerStatus::is_running))
        .await
        .expect("running status within deadline")
        .expect("watch channel open");
    assert_eq!(running.port(), Some(port));
    drop(running);

    server.stop().await;
    timeout(
        STATUS_TIMEOUT,
        status_rx.wait_for(|s| *s == ServerStatus::Stopped),
    )
    .await
    .expect("stopped status within deadline")
    .expect("watch channel open");
}

#[tokio::test]
async fn test_status_transitions_arrive_in_lifecycle_order() {
    let server = server_on(0, 0);
    let mut status_rx = server.subscribe();
    assert_eq!(*status_rx.borrow(), ServerStatus::Stopped);

    // Record every transition the subscriber can see. The watch channel
    // keeps only the latest value, so a short-lived state (Starting lives
    // only for the duration of the bind) may be overwritten before the
    // recorder wakes; whatever is observed must still respect the
    // Starting -> Running -> Stopped order.
    let recorder = tokio::spawn(async move {
        let mut seen = Vec::new();
        while status_rx.changed().await.is_ok() {
            let status = status_rx.borrow_and_update().clone();
            let done = status == ServerStatus::Stopped;
            seen.push(status);
            if done {
                break;
            }
        }
        seen
    });

    let port = server.start().await.expect("start");
    server.stop().await;

    let seen = timeout(STATUS_TIMEOUT, recorder)
        .await
        .expect("recorder done within deadline")
        .expect("recorder task");

    let rank = |status: &ServerStatus| match status {
        ServerStatus::Starting { .. } => 0,
        ServerStatus::Running { .. } => 1,
        ServerStatus::Stopped => 2,
        ServerStatus::Error { message } => panic!("unexpected error status: {message}"),
    };
    let ranks: Vec<_> = seen.iter().map(rank).collect();
    assert!(
        ranks.windows(2).all(|pair| pair[0] < pair[1]),
        "transitions out of lifecycle order: {seen:?}"
    );
    assert_eq!(seen.last(), Some(&ServerStatus::Stopped));
    if let Some(ServerStatus::Running { port: p, .. }) = seen.iter().find(|s| s.is_running()) {
        assert_eq!(*p, port);
    }
}

#[tokio::test]
async fn test_restart_keeps_store_contents() {
    let server = server_on(0, 0);
    server.store().add_drug("Persisted 5mg");

    server.start().await.expect("first start");
    server.stop().await;
    server.start().await.expect("second start");

    let drugs = server.store().pending_drugs();
    assert_eq!(drugs.as_slice(), ["Persisted 5mg".to_string()]);

    server.stop().await;
}
