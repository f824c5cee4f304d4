//! Audit trail helpers for simulations.

use bulwark_audit::{AuditEntry, AuditQuery, AuditRecord, AuditSession, AuditStore, FileAuditStore};
use bulwark_core::DiagramId;
use bulwark_store::{CommitReceipt, StoreError};

use crate::error::Result;
use crate::types::{SimulationResult, SnapshotRef};

/// Open a session against the snapshot being simulated.
pub fn start_session(snapshot: &SnapshotRef) -> AuditSession {
    AuditSession::new(
        snapshot.diagram_id.0,
        snapshot.project_id.0,
        snapshot.version,
        &snapshot.fingerprint,
    )
}

/// Record the profile, traverse and quantify stages of an evaluation.
pub fn record_evaluation(session: &mut AuditSession, result: &SimulationResult) {
    let stats = &result.stats;

    session.record_step(
        "profile",
        &format!(
            "Profiled {} components (total risk {})",
            stats.node_count, stats.total_system_risk
        ),
        serde_json::json!({
            "nodes": stats.node_count,
            "total_system_risk": stats.total_system_risk,
            "findings": result.findings.len(),
        }),
        true,
    );

    session.record_step(
        "traverse",
        &format!(
            "{} of {} components compromised from {} entry points",
            stats.compromised_count, stats.node_count, stats.entry_point_count
        ),
        serde_json::json!({
            "entry_points": stats.entry_point_count,
            "visited": stats.visited_count,
            "compromised": result.compromised_nodes,
            "dangling_edges": stats.dangling_edge_count,
        }),
        true,
    );

    session.record_step(
        "quantify",
        &format!("Impact score {}", result.impact_score),
        serde_json::json!({
            "impact_score": result.impact_score,
            "blast_radius_pct": stats.blast_radius_pct,
        }),
        true,
    );

    session.set_outcome(serde_json::json!({
        "impact_score": result.impact_score,
        "compromised_nodes": result.compromised_nodes,
    }));
}

/// Record the outcome of the score commit.
pub fn record_commit(
    session: &mut AuditSession,
    risk_score: u32,
    outcome: std::result::Result<&CommitReceipt, &StoreError>,
) {
    match outcome {
        Ok(receipt) => session.record_step(
            "persist",
            &format!("Committed risk score {risk_score}"),
            serde_json::json!({
                "risk_score": risk_score,
                "diagram_version": receipt.diagram_version,
            }),
            true,
        ),
        Err(e) => session.record_step(
            "persist",
            "Risk score commit failed",
            serde_json::json!({ "risk_score": risk_score, "error": e.to_string() }),
            false,
        ),
    }
}

/// Seal the session and save it under `audit_dir`.
///
/// Storage failures are logged; the sealed record is returned either way.
pub fn finalize_and_store(session: AuditSession, audit_dir: &str) -> AuditRecord {
    let record = session.finalize();

    match FileAuditStore::new(audit_dir) {
        Ok(store) => match store.save(&record) {
            Ok(path) => {
                tracing::info!(
                    audit_id = %record.id,
                    path = %path.display(),
                    "Audit record stored for simulation"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to store audit record");
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "Failed to initialize audit store");
        }
    }

    record
}

/// Read back a diagram's audit trail from `audit_dir`, newest first, with
/// each record checked against its content hash.
pub fn history(audit_dir: &str, diagram_id: &DiagramId, query: &AuditQuery) -> Result<Vec<AuditEntry>> {
    let store = FileAuditStore::new(audit_dir)?;
    Ok(store.history(diagram_id.0, query)?)
}
