//! bulwark-audit: Tamper-evident records of risk simulations.
//!
//! Every simulation can leave an [`AuditRecord`] describing the diagram
//! snapshot it ran against (by BLAKE3 fingerprint), the stages it went
//! through, and the outcome it produced. Records are content-hashed on
//! finalization so any later edit is detectable, and stored as JSON files
//! under the diagram they belong to.

pub mod hash;
pub mod session;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use hash::fingerprint;
pub use session::AuditSession;
pub use store::{AuditEntry, AuditError, AuditQuery, AuditStore, FileAuditStore};

// ── Core Types ───────────────────────────────────────────────────

/// Unique identifier for an audit record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AuditId(pub Uuid);

impl AuditId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AuditId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AuditId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One stage of a simulation run (profile, traverse, quantify, persist).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditStep {
    pub stage: String,
    pub description: String,
    /// Structured stage output (counts, scores).
    pub details: serde_json::Value,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

/// The complete audit trail of one simulation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditRecord {
    pub id: AuditId,
    pub diagram_id: Uuid,
    pub project_id: Uuid,
    /// Diagram version the simulation read.
    pub diagram_version: u64,
    /// BLAKE3 fingerprint of the diagram snapshot.
    pub snapshot_fingerprint: String,
    pub steps: Vec<AuditStep>,
    /// Final result summary, set before finalization.
    pub outcome: serde_json::Value,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// BLAKE3 content hash (hex), set on finalization.
    pub content_hash: Option<String>,
}

impl AuditRecord {
    /// Compute the BLAKE3 hash over every field except `content_hash`.
    pub fn compute_hash(&self) -> String {
        hash::compute_record_hash(self)
    }

    /// Verify that the stored content_hash matches a freshly computed hash.
    pub fn verify_integrity(&self) -> bool {
        match &self.content_hash {
            Some(stored) => stored == &self.compute_hash(),
            None => false,
        }
    }
}
