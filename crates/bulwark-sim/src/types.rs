//! Simulation result types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use bulwark_core::{DiagramId, ProjectId, Severity};

use crate::propagate::Compromise;
use crate::quantify::FindingReport;

/// Complete result of one simulation, tied to the diagram snapshot it was
/// computed from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    /// Compromised component ids in the order they fell.
    pub compromised_nodes: Vec<String>,
    /// Quantified risk in `0..=min(max_impact_score, 100)`.
    pub impact_score: u32,
    pub findings: Vec<FindingReport>,
    pub compromise_details: Vec<Compromise>,
    pub stats: SimulationStats,
    pub snapshot: SnapshotRef,
    pub computation_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_id: Option<String>,
}

/// Graph and scoring statistics. Reported, never persisted.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub dangling_edge_count: usize,
    pub entry_point_count: usize,
    pub visited_count: usize,
    pub compromised_count: usize,
    pub total_system_risk: u32,
    pub blast_radius_pct: f64,
    pub findings_by_severity: BTreeMap<Severity, usize>,
}

/// The diagram snapshot a result belongs to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRef {
    pub diagram_id: DiagramId,
    pub project_id: ProjectId,
    /// Diagram version that was read.
    pub version: u64,
    /// BLAKE3 over the canonical JSON of nodes and edges.
    pub fingerprint: String,
    pub computed_at: DateTime<Utc>,
    /// Diagram version after the score was committed; `None` when nothing
    /// was persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub committed_version: Option<u64>,
}
