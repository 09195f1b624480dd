//! Concurrent prescription session store.
//!
//! The store holds the only state shared between the capture pipeline and
//! the per-connection request handlers: at most one live session and the
//! pending-drug queue. Both slots are lock-free copy-on-write references;
//! every mutation replaces the whole value, so a concurrent reader always
//! observes a complete, consistent snapshot and never a torn one.

use arc_swap::{ArcSwap, ArcSwapOption};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::session::{CompletedPrescription, PrescriptionSession, SessionId};

/// Shared session and pending-drug state.
///
/// Safe for concurrent use from any number of tasks or threads. The queue
/// is deliberately independent of the session: drugs can accumulate before
/// a session has been explicitly started (the session is optional context;
/// the queue is the primary unit of work).
pub struct SessionStore {
    /// The live session, if any
    session: ArcSwapOption<PrescriptionSession>,

    /// Pending drug names in scan order
    pending: ArcSwap<Vec<String>>,

    /// Last issued session-id millis, for uniqueness within a run
    last_issued_millis: AtomicI64,
}

impl SessionStore {
    /// Creates an empty store: no session, no pending drugs.
    pub fn new() -> Self {
        Self {
            session: ArcSwapOption::const_empty(),
            pending: ArcSwap::from_pointee(Vec::new()),
            last_issued_millis: AtomicI64::new(0),
        }
    }

    /// Appends a recognized drug name to the pending queue.
    ///
    /// This is the single entry point for the capture pipeline. Appends are
    /// atomic: the replacement-compare loop retries until the new snapshot
    /// lands, so concurrent appends never lose entries.
    pub fn add_drug(&self, name: impl Into<String>) {
        let name = name.into();
        self.pending.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(name.clone());
            next
        });
        debug!(drug = %name, "Drug added to pending queue");
    }

    /// Starts a new session, discarding any previous one.
    ///
    /// The pending queue is reset, so a new session always begins with an
    /// effective drug count of zero regardless of prior queue contents.
    pub fn start_session(&self, patient_info: impl Into<String>) -> SessionId {
        let (id, started_at) = self.allocate_session_id();
        let session = PrescriptionSession::new(id.clone(), patient_info, started_at);

        self.session.store(Some(Arc::new(session)));
        self.pending.store(Arc::new(Vec::new()));

        info!(session_id = %id, "Prescription session started");
        id
    }

    /// Returns a snapshot of the live session, if any.
    pub fn current(&self) -> Option<Arc<PrescriptionSession>> {
        self.session.load_full()
    }

    /// Returns a snapshot of the pending drug queue in scan order.
    pub fn pending_drugs(&self) -> Arc<Vec<String>> {
        self.pending.load_full()
    }

    /// Completes the live session.
    ///
    /// Snapshots the pending queue into the finalized prescription, clears
    /// the queue, and drops the session. Returns `None` (leaving the queue
    /// untouched) when no session is live.
    pub fn complete(&self) -> Option<CompletedPrescription> {
        let session = self.session.swap(None)?;
        let drugs = self.pending.swap(Arc::new(Vec::new()));

        let completed =
            CompletedPrescription::new(&session, drugs.as_ref().clone(), Utc::now());

        info!(
            session_id = %completed.id,
            drug_count = completed.drug_count(),
            duration_ms = completed.duration_ms(),
            "Prescription session completed"
        );
        Some(completed)
    }

    /// Drops the session and the pending queue. Idempotent.
    pub fn clear(&self) {
        self.session.store(None);
        self.pending.store(Arc::new(Vec::new()));
        debug!("Prescription data cleared");
    }

    /// Allocates a timestamp-derived session id unique within this run.
    ///
    /// Two starts in the same millisecond would collide on the raw clock
    /// value, so the candidate is bumped past the last issued value and the
    /// session's start time is derived from the issued millis.
    fn allocate_session_id(&self) -> (SessionId, DateTime<Utc>) {
        let candidate = Utc::now().timestamp_millis();
        let issued = self
            .last_issued_millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(candidate.max(last + 1))
            })
            .map(|last| candidate.max(last + 1))
            .unwrap_or(candidate);

        let started_at = DateTime::from_timestamp_millis(issued).unwrap_or_else(Utc::now);
        (SessionId::from_millis(issued), started_at)
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_add_drug_preserves_scan_order() {
        let store = SessionStore::new();
        store.add_drug("Paracetamol 500mg");
        store.add_drug("Amoxicillin 250mg");
        store.add_drug("Ibuprofen 400mg");

        let drugs = store.pending_drugs();
        assert_eq!(
            drugs.as_slice(),
            ["Paracetamol 500mg", "Amoxicillin 250mg", "Ibuprofen 400mg"]
        );
    }

    #[test]
    fn test_drugs_accumulate_without_session() {
        let store = SessionStore::new();
        store.add_drug("Aspirin 100mg");

        assert!(store.current().is_none());
        assert_eq!(store.pending_drugs().len(), 1);
    }

    #[test]
    fn test_start_session_resets_queue() {
        let store = SessionStore::new();
        store.add_drug("Leftover 10mg");

        let id = store.start_session("Patient A");
        assert!(!id.as_str().is_empty());
        assert!(store.pending_drugs().is_empty());

        let session = store.current().expect("session should be live");
        assert_eq!(session.id, id);
        assert_eq!(session.patient_info, "Patient A");
    }

    #[test]
    fn test_start_session_replaces_previous() {
        let store = SessionStore::new();
        let first = store.start_session("Patient A");
        store.add_drug("Drug 1");

        let second = store.start_session("Patient B");
        assert_ne!(first, second);
        assert!(store.pending_drugs().is_empty());

        let session = store.current().expect("session should be live");
        assert_eq!(session.patient_info, "Patient B");
    }

    #[test]
    fn test_session_ids_unique_and_increasing() {
        let store = SessionStore::new();
        let a = store.start_session("");
        let b = store.start_session("");
        let c = store.start_session("");

        let a: i64 = a.as_str().parse().unwrap();
        let b: i64 = b.as_str().parse().unwrap();
        let c: i64 = c.as_str().parse().unwrap();
        assert!(a < b && b < c, "ids should be strictly increasing");
    }

    #[test]
    fn test_complete_snapshots_and_clears() {
        let store = SessionStore::new();
        store.start_session("Patient A");
        store.add_drug("A");
        store.add_drug("B");

        let completed = store.complete().expect("should complete");
        assert_eq!(completed.drugs, ["A", "B"]);
        assert_eq!(completed.patient_info, "Patient A");

        assert!(store.current().is_none());
        assert!(store.pending_drugs().is_empty());
    }

    #[test]
    fn test_complete_without_session_leaves_queue() {
        let store = SessionStore::new();
        store.add_drug("Orphan 5mg");

        assert!(store.complete().is_none());
        assert_eq!(store.pending_drugs().len(), 1);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = SessionStore::new();
        store.start_session("Patient A");
        store.add_drug("A");

        store.clear();
        store.clear();

        assert!(store.current().is_none());
        assert!(store.pending_drugs().is_empty());
    }

    #[test]
    fn test_concurrent_appends_lose_nothing() {
        let store = Arc::new(SessionStore::new());
        let mut handles = Vec::new();

        for producer in 0..4 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for i in 0..100 {
                    store.add_drug(format!("p{producer}-{i}"));
                }
            }));
        }
        for handle in handles {
            handle.join().expect("producer thread");
        }

        let drugs = store.pending_drugs();
        assert_eq!(drugs.len(), 400);

        // Within a single producer, order must be preserved.
        for producer in 0..4 {
            let prefix = format!("p{producer}-");
            let seen: Vec<usize> = drugs
                .iter()
                .filter_map(|d| d.strip_prefix(&prefix))
                .map(|n| n.parse().unwrap())
                .collect();
            assert_eq!(seen, (0..100).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_concurrent_reads_see_prefix_consistent_snapshots() {
        let store = Arc::new(SessionStore::new());
        let reader_store = Arc::clone(&store);

        let reader = thread::spawn(move || {
            let mut last_len = 0;
            for _ in 0..1000 {
                let snapshot = reader_store.pending_drugs();
                assert!(snapshot.len() >= last_len, "queue length must not shrink");
                for (i, drug) in snapshot.iter().enumerate() {
                    assert_eq!(drug, &format!("drug-{i}"), "snapshot must be in call order");
                }
                last_len = snapshot.len();
            }
        });

        for i in 0..500 {
            store.add_drug(format!("drug-{i}"));
        }
        reader.join().expect("reader thread");
    }
}
