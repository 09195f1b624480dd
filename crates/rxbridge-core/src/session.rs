//! Prescription session domain entities and value objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Unique identifier for a prescription session.
///
/// Wraps the session's creation timestamp in epoch milliseconds rendered
/// as a string (e.g., "1700000000000"). Uniqueness within a process run
/// is sufficient; sessions are never persisted across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a new SessionId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates a SessionId from a creation timestamp in epoch milliseconds.
    pub fn from_millis(millis: i64) -> Self {
        Self(millis.to_string())
    }

    /// Returns the underlying string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Domain Entities
// ============================================================================

/// A live prescription-writing session.
///
/// Immutable once created; drugs accumulate in the store's pending queue,
/// not on the session itself, and are attached to the session only when
/// it is completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescriptionSession {
    /// Unique session identifier (creation timestamp in millis)
    pub id: SessionId,

    /// Free-form patient descriptor; empty when none was provided
    pub patient_info: String,

    /// When the session started
    pub started_at: DateTime<Utc>,
}

impl PrescriptionSession {
    /// Creates a new session starting at the given instant.
    pub fn new(id: SessionId, patient_info: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            patient_info: patient_info.into(),
            started_at,
        }
    }

    /// Returns the start time in epoch milliseconds (the wire representation).
    pub fn start_millis(&self) -> i64 {
        self.started_at.timestamp_millis()
    }
}

/// A finalized prescription session with its drug list snapshot.
///
/// Produced by [`crate::SessionStore::complete`]; carries the pending-drug
/// queue as it stood at completion, in scan order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPrescription {
    /// Identifier of the completed session
    pub id: SessionId,

    /// Patient descriptor carried over from the live session
    pub patient_info: String,

    /// When the session started
    pub started_at: DateTime<Utc>,

    /// When the session completed
    pub ended_at: DateTime<Utc>,

    /// Final drug list, in the order the drugs were scanned
    pub drugs: Vec<String>,
}

impl CompletedPrescription {
    /// Finalizes a live session with the given drug snapshot.
    pub fn new(session: &PrescriptionSession, drugs: Vec<String>, ended_at: DateTime<Utc>) -> Self {
        Self {
            id: session.id.clone(),
            patient_info: session.patient_info.clone(),
            started_at: session.started_at,
            ended_at,
            drugs,
        }
    }

    /// Session duration in milliseconds, clamped to zero.
    ///
    /// Clock adjustments between start and end could otherwise produce a
    /// negative duration; the wire contract promises non-negative values.
    pub fn duration_ms(&self) -> u64 {
        self.ended_at
            .signed_duration_since(self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }

    /// Number of drugs in the final snapshot.
    pub fn drug_count(&self) -> usize {
        self.drugs.len()
    }
}
