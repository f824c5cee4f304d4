//! Builder for recording a simulation audit trail incrementally.
//!
//! ```no_run
//! # use bulwark_audit::AuditSession;
//! # use uuid::Uuid;
//! let mut session = AuditSession::new(Uuid::new_v4(), Uuid::new_v4(), 7, "9f2c...");
//! session.record_step("profile", "Profiled 3 components", serde_json::json!({"nodes": 3}), true);
//! session.set_outcome(serde_json::json!({"impactScore": 66}));
//! let record = session.finalize();
//! assert!(record.verify_integrity());
//! ```

use chrono::Utc;
use uuid::Uuid;

use crate::{AuditId, AuditRecord, AuditStep};

/// Records the stages of a simulation and seals them into an [`AuditRecord`].
pub struct AuditSession {
    record: AuditRecord,
}

impl AuditSession {
    /// Start recording against the given diagram snapshot.
    pub fn new(diagram_id: Uuid, project_id: Uuid, diagram_version: u64, fingerprint: &str) -> Self {
        Self {
            record: AuditRecord {
                id: AuditId::new(),
                diagram_id,
                project_id,
                diagram_version,
                snapshot_fingerprint: fingerprint.to_string(),
                steps: Vec::new(),
                outcome: serde_json::Value::Null,
                started_at: Utc::now(),
                completed_at: None,
                content_hash: None,
            },
        }
    }

    /// Record one completed stage.
    pub fn record_step(
        &mut self,
        stage: &str,
        description: &str,
        details: serde_json::Value,
        success: bool,
    ) {
        self.record.steps.push(AuditStep {
            stage: stage.to_string(),
            description: description.to_string(),
            details,
            success,
            timestamp: Utc::now(),
        });
    }

    pub fn set_outcome(&mut self, outcome: serde_json::Value) {
        self.record.outcome = outcome;
    }

    /// The record ID (available before finalization).
    pub fn id(&self) -> AuditId {
        self.record.id
    }

    /// Set completed_at and seal the record with its content hash.
    pub fn finalize(mut self) -> AuditRecord {
        self.record.completed_at = Some(Utc::now());
        let hash = self.record.compute_hash();
        self.record.content_hash = Some(hash);
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_seals_steps_and_outcome() {
        let mut session = AuditSession::new(Uuid::new_v4(), Uuid::new_v4(), 1, "fp");
        let id = session.id();
        session.record_step("traverse", "2 compromised", serde_json::json!({"compromised": 2}), true);
        session.set_outcome(serde_json::json!({"impactScore": 88}));

        let record = session.finalize();
        assert_eq!(record.id, id);
        assert_eq!(record.steps.len(), 1);
        assert_eq!(record.outcome["impactScore"], 88);
        assert!(record.completed_at.is_some());
        assert!(record.verify_integrity());
    }

    #[test]
    fn edited_record_fails_integrity() {
        let mut record = AuditSession::new(Uuid::new_v4(), Uuid::new_v4(), 1, "fp").finalize();
        record.snapshot_fingerprint = "forged".to_string();
        assert!(!record.verify_integrity());
    }
}
