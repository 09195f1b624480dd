//! rxbridge Core - Shared types for the prescription automation bridge
//!
//! This crate provides the domain types and the concurrent session store
//! shared between the bridge server (rxbridged) and the embedding host
//! (OCR capture pipeline).
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod session;
pub mod status;
pub mod store;

// Re-exports for convenience
pub use session::{CompletedPrescription, PrescriptionSession, SessionId};
pub use status::ServerStatus;
pub use store::SessionStore;
