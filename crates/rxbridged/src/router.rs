//! (method, path) dispatch over the bridge's seven routes.

use rxbridge_core::SessionStore;
use rxbridge_protocol::{
    body_or_default, ClearBody, CompleteBody, CurrentBody, DrugsBody, HttpResponse, Method,
    RequestLine, SendBody, SessionSummary, StartBody, StartRequest, StatusBody, StatusCode,
};
use tracing::{debug, info};

/// Routes a parsed request to its handler and returns the framed response.
///
/// Never fails: precondition failures (no session, empty queue) become 4xx
/// responses and unmatched routes become the canonical 404. `port` is the
/// bound listening port, echoed in `/status`.
pub fn route(
    request: &RequestLine,
    body: Option<serde_json::Value>,
    store: &SessionStore,
    port: u16,
) -> HttpResponse {
    match (request.method, request.path.as_str()) {
        (Method::Get, "/status") => status(store, port),
        (Method::Get, "/prescription/current") => current(store),
        (Method::Get, "/prescription/drugs") => drugs(store),
        (Method::Post, "/prescription/start") => start(store, body),
        (Method::Post, "/prescription/complete") => complete(store),
        (Method::Post, "/prescription/send") => send(store),
        (Method::Delete, "/prescription/clear") => clear(store),
        _ => {
            debug!(request = %request, "Unroutable request");
            HttpResponse::not_found()
        }
    }
}

fn status(store: &SessionStore, port: u16) -> HttpResponse {
    let session = store
        .current()
        .map(|session| SessionSummary::new(&session, store.pending_drugs().len()));
    HttpResponse::ok(&StatusBody::new(port, session))
}

fn current(store: &SessionStore) -> HttpResponse {
    match store.current() {
        Some(session) => {
            let drugs = store.pending_drugs().as_ref().clone();
            HttpResponse::ok(&CurrentBody::new(&session, drugs))
        }
        None => HttpResponse::error(StatusCode::NotFound, "No active prescription session"),
    }
}

fn drugs(store: &SessionStore) -> HttpResponse {
    HttpResponse::ok(&DrugsBody::new(store.pending_drugs().as_ref().clone()))
}

fn start(store: &SessionStore, body: Option<serde_json::Value>) -> HttpResponse {
    let request: StartRequest = body_or_default(body);
    let session_id = store.start_session(request.patient_info.clone());
    HttpResponse::ok(&StartBody::new(session_id, request.patient_info))
}

fn complete(store: &SessionStore) -> HttpResponse {
    match store.complete() {
        Some(completed) => HttpResponse::ok(&CompleteBody::new(&completed)),
        None => HttpResponse::error(StatusCode::BadRequest, "No active prescription session"),
    }
}

fn send(store: &SessionStore) -> HttpResponse {
    let drugs = store.pending_drugs();
    if drugs.is_empty() {
        return HttpResponse::error(StatusCode::BadRequest, "No drugs to send");
    }

    info!(count = drugs.len(), "Drug list handed to automation client");
    HttpResponse::ok(&SendBody::new(drugs.as_ref().clone()))
}

fn clear(store: &SessionStore) -> HttpResponse {
    store.clear();
    HttpResponse::ok(&ClearBody::new())
}
