//! Per-connection request handler.
//!
//! Each accepted connection gets exactly one request/response cycle: read
//! the request line, optionally one JSON body line for POST routes, route,
//! write the framed response, close. No keep-alive. Protocol errors drop
//! the connection silently; nothing here ever propagates to the accept
//! loop.

use std::sync::Arc;
use std::time::Duration;

use rxbridge_core::SessionStore;
use rxbridge_protocol::{parse_body_line, HttpResponse, Method, RequestLine};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Read deadline per line; an idle client must not leak a handler task.
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Write deadline for the response.
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum request-line length (8 KiB).
const MAX_LINE_SIZE: usize = 8_192;

/// Serves a single connection to completion.
///
/// All failure modes are handled here: logged and swallowed, with the
/// socket closed on every path when the stream is dropped.
pub async fn handle_connection(stream: TcpStream, store: Arc<SessionStore>, connection_number: u64) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    debug!(connection = connection_number, peer = %peer, "Connection accepted");

    let port = stream
        .local_addr()
        .map(|a| a.port())
        .unwrap_or_default();

    match serve(stream, &store, port).await {
        Ok(request) => {
            debug!(connection = connection_number, request = %request, "Request served");
        }
        Err(e) => match e {
            ConnectionError::WriteFailed(_) | ConnectionError::WriteTimeout => {
                warn!(connection = connection_number, peer = %peer, error = %e, "Response write failed");
            }
            _ => {
                debug!(connection = connection_number, peer = %peer, error = %e, "Connection dropped");
            }
        },
    }
}

async fn serve(
    stream: TcpStream,
    store: &SessionStore,
    port: u16,
) -> Result<RequestLine, ConnectionError> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let line = read_line_bounded(&mut reader)
        .await?
        .ok_or(ConnectionError::Eof)?;
    let request = RequestLine::parse(&line)?;

    // POST routes may carry one optional body line; anything that does not
    // look like a JSON object (headers, blanks) counts as no body.
    let body = if request.method == Method::Post {
        read_line_bounded(&mut reader)
            .await?
            .as_deref()
            .and_then(parse_body_line)
    } else {
        None
    };

    let response = crate::router::route(&request, body, store, port);
    write_response(&mut write_half, &response).await?;

    Ok(request)
}

/// Reads one deadline-bounded, size-capped line. `None` means EOF.
///
/// The reader is capped at one byte past the limit before buffering, so an
/// unterminated line stops accumulating at the cap instead of growing until
/// the read deadline.
async fn read_line_bounded<R>(reader: &mut R) -> Result<Option<String>, ConnectionError>
where
    R: AsyncBufReadExt + Unpin,
{
    let mut limited = reader.take(MAX_LINE_SIZE as u64 + 1);
    let mut line = String::new();
    let bytes_read = timeout(READ_TIMEOUT, limited.read_line(&mut line))
        .await
        .map_err(|_| ConnectionError::ReadTimeout)?
        .map_err(|e| ConnectionError::ReadFailed(e.to_string()))?;

    if bytes_read == 0 {
        return Ok(None);
    }
    if line.len() > MAX_LINE_SIZE {
        return Err(ConnectionError::LineTooLong {
            size: line.len(),
            max: MAX_LINE_SIZE,
        });
    }

    Ok(Some(line))
}

async fn write_response(
    writer: &mut (impl AsyncWriteExt + Unpin),
    response: &HttpResponse,
) -> Result<(), ConnectionError> {
    let bytes = response.to_bytes();

    match timeout(WRITE_TIMEOUT, async {
        writer.write_all(&bytes).await?;
        writer.flush().await?;
        writer.shutdown().await?;
        Ok::<(), std::io::Error>(())
    })
    .await
    {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ConnectionError::WriteFailed(e.to_string())),
        Err(_) => Err(ConnectionError::WriteTimeout),
    }
}

/// Errors that can occur during connection handling.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Malformed request: {0}")]
    Malformed(#[from] rxbridge_protocol::RequestError),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Connection closed before request line")]
    Eof,

    #[error("Read timeout")]
    ReadTimeout,

    #[error("Write timeout")]
    WriteTimeout,

    #[error("Request line too long: {size} bytes (max: {max})")]
    LineTooLong { size: usize, max: usize },
}
