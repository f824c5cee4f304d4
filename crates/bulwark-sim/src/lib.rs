//! bulwark-sim: Attack-surface risk simulation for infrastructure diagrams.
//!
//! Profiles every component against the rule table, walks the diagram from
//! its entry points to find what an attacker could compromise, folds the
//! result into a 0–100 impact score, and commits that score back to the
//! diagram and its project under an optimistic-concurrency check.

pub mod audit;
pub mod config;
pub mod error;
pub mod graph;
pub mod profile;
pub mod propagate;
pub mod quantify;
pub mod rules;
pub mod types;

pub use config::{AppConfig, SimulationConfig};
pub use error::SimError;
pub use types::{SimulationResult, SimulationStats, SnapshotRef};

use std::time::Instant;

use chrono::Utc;
use serde::Serialize;

use bulwark_core::{Component, Connection, Diagram, DiagramId};
use bulwark_store::{DiagramStore, RiskCommit};

use crate::graph::ComponentGraph;
use crate::profile::{profile_component, NodeProfile};

/// The part of a diagram a result depends on.
#[derive(Serialize)]
struct SnapshotView<'a> {
    nodes: &'a [Component],
    edges: &'a [Connection],
}

/// Run profile → traverse → quantify over an in-memory diagram.
///
/// Pure apart from the clock: nothing is read or written.
pub fn evaluate(diagram: &Diagram, config: &SimulationConfig) -> error::Result<SimulationResult> {
    let start = Instant::now();

    let fingerprint = bulwark_audit::fingerprint(&SnapshotView {
        nodes: &diagram.nodes,
        edges: &diagram.edges,
    })?;

    let profiles: Vec<NodeProfile> = diagram
        .nodes
        .iter()
        .map(|node| profile_component(node, config))
        .collect();

    let graph = ComponentGraph::from_diagram(diagram);
    let entry_points = graph.entry_points();
    let propagation = propagate::propagate(&graph, &profiles, &entry_points, config.compromise_threshold);

    let node_count = graph.node_count();
    let compromised_count = propagation.compromised.len();
    let total_system_risk = quantify::total_system_risk(&profiles);
    let impact_score = quantify::impact_score(
        total_system_risk,
        compromised_count,
        node_count,
        config.max_impact_score,
    );
    let findings = quantify::findings_report(&diagram.nodes, &profiles);

    let stats = SimulationStats {
        node_count,
        edge_count: graph.edge_count(),
        dangling_edge_count: graph.dangling_edge_count(),
        entry_point_count: entry_points.len(),
        visited_count: propagation.visited,
        compromised_count,
        total_system_risk,
        blast_radius_pct: quantify::blast_radius_pct(compromised_count, node_count),
        findings_by_severity: quantify::count_by_severity(&findings),
    };

    tracing::debug!(
        diagram_id = %diagram.id,
        nodes = node_count,
        entry_points = stats.entry_point_count,
        compromised = compromised_count,
        impact_score,
        "Diagram evaluated"
    );

    Ok(SimulationResult {
        compromised_nodes: propagation.compromised_ids(),
        impact_score,
        findings,
        compromise_details: propagation.compromised,
        stats,
        snapshot: SnapshotRef {
            diagram_id: diagram.id,
            project_id: diagram.project_id,
            version: diagram.version,
            fingerprint,
            computed_at: Utc::now(),
            committed_version: None,
        },
        computation_ms: start.elapsed().as_millis() as u64,
        audit_id: None,
    })
}

/// The simulation engine: evaluation plus read-compute-write persistence.
pub struct SimulationEngine<S> {
    store: S,
    config: SimulationConfig,
}

impl<S: DiagramStore> SimulationEngine<S> {
    /// Create a new engine with the default scoring policy.
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: SimulationConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SimulationConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable audit trail recording.
    pub fn with_audit_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.audit_dir = Some(dir.into());
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Evaluate without touching the store.
    pub fn evaluate(&self, diagram: &Diagram) -> error::Result<SimulationResult> {
        evaluate(diagram, &self.config)
    }

    /// Load the diagram, evaluate it, and commit the impact score to the
    /// diagram and its project.
    ///
    /// The commit is conditional on the diagram version read here; if the
    /// diagram changed in between, nothing is written and the call fails
    /// with a conflict.
    pub async fn simulate(&self, diagram_id: &DiagramId) -> error::Result<SimulationResult> {
        let start = Instant::now();

        let diagram = self.store.load_diagram(diagram_id).await?;
        let mut result = self.evaluate(&diagram)?;

        let mut session = self
            .config
            .audit_dir
            .as_ref()
            .map(|_| audit::start_session(&result.snapshot));
        if let Some(session) = session.as_mut() {
            audit::record_evaluation(session, &result);
        }

        let commit = RiskCommit {
            diagram_id: diagram.id,
            project_id: diagram.project_id,
            expected_version: diagram.version,
            risk_score: result.impact_score,
        };
        let committed = self.store.commit_risk_score(&commit).await;

        if let Some(mut session) = session {
            audit::record_commit(&mut session, result.impact_score, committed.as_ref());
            if let Some(dir) = self.config.audit_dir.as_deref() {
                let record = audit::finalize_and_store(session, dir);
                result.audit_id = Some(record.id.to_string());
            }
        }

        let receipt = match committed {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!(
                    diagram_id = %diagram.id,
                    error = %e,
                    "Risk score not committed"
                );
                return Err(e.into());
            }
        };

        result.snapshot.committed_version = Some(receipt.diagram_version);
        result.computation_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            diagram_id = %diagram.id,
            project_id = %diagram.project_id,
            compromised = result.stats.compromised_count,
            impact_score = result.impact_score,
            duration_ms = result.computation_ms,
            "Simulation complete"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulwark_audit::{AuditId, AuditQuery, AuditStore, FileAuditStore};
    use bulwark_core::{ComponentConfig, Project};
    use bulwark_store::{CommitReceipt, MemoryStore, StoreError};

    fn public_api(id: &str) -> Component {
        Component::new(
            id,
            "api",
            ComponentConfig::default()
                .with("componentType", "api")
                .with("authType", "None")
                .with("exposure", "Public")
                .with("sensitivityLevel", 1),
        )
    }

    fn hardened_db(id: &str) -> Component {
        Component::new(
            id,
            "database",
            ComponentConfig::default()
                .with("componentType", "db")
                .with("encryptionAtRest", true)
                .with("auditLoggingEnabled", true),
        )
    }

    fn insecure_firewall(id: &str) -> Component {
        Component::new(
            id,
            "firewall",
            ComponentConfig::default()
                .with("componentType", "firewall")
                .with("defaultPolicy", "Allow All (Insecure)")
                .with("enableIDS", false),
        )
    }

    fn diagram(nodes: Vec<Component>, edges: Vec<Connection>) -> Diagram {
        let mut diagram = Diagram::empty(bulwark_core::ProjectId::new());
        diagram.nodes = nodes;
        diagram.edges = edges;
        diagram
    }

    async fn seeded(diagram: &Diagram) -> MemoryStore {
        let store = MemoryStore::new();
        let mut project = Project::new("payments");
        project.id = diagram.project_id;
        store.insert_project(project).await;
        store.insert_diagram(diagram.clone()).await;
        store
    }

    #[test]
    fn single_public_api() {
        let d = diagram(vec![public_api("a")], vec![]);
        let result = evaluate(&d, &SimulationConfig::default()).unwrap();

        assert_eq!(result.compromised_nodes, ["a"]);
        assert_eq!(result.stats.total_system_risk, 44);
        assert_eq!(result.stats.blast_radius_pct, 1.0);
        assert_eq!(result.impact_score, 88);
        assert_eq!(result.findings.len(), 2);
    }

    #[test]
    fn empty_diagram_scores_zero() {
        let d = diagram(vec![], vec![]);
        let result = evaluate(&d, &SimulationConfig::default()).unwrap();

        assert!(result.compromised_nodes.is_empty());
        assert_eq!(result.impact_score, 0);
        assert!(result.findings.is_empty());
    }

    #[test]
    fn hardened_database_blocks_propagation() {
        let d = diagram(
            vec![public_api("a"), hardened_db("b")],
            vec![Connection::new("e1", "a", "b")],
        );
        let result = evaluate(&d, &SimulationConfig::default()).unwrap();

        assert_eq!(result.compromised_nodes, ["a"]);
        assert_eq!(result.stats.blast_radius_pct, 0.5);
        assert_eq!(result.impact_score, 66);
    }

    #[test]
    fn firewall_scores_like_public_api() {
        let d = diagram(vec![insecure_firewall("fw")], vec![]);
        let result = evaluate(&d, &SimulationConfig::default()).unwrap();

        // Not an entry point on its own.
        assert!(result.compromised_nodes.is_empty());
        assert_eq!(result.stats.total_system_risk, 44);
        assert_eq!(result.impact_score, 44);
    }

    #[test]
    fn internet_node_opens_the_path() {
        let internet = Component::new(
            "net",
            "internet",
            ComponentConfig::default().with("componentType", "internet"),
        );
        let d = diagram(
            vec![internet, insecure_firewall("fw"), hardened_db("db")],
            vec![Connection::new("e1", "net", "fw"), Connection::new("e2", "fw", "db")],
        );
        let result = evaluate(&d, &SimulationConfig::default()).unwrap();

        assert_eq!(result.compromised_nodes, ["net", "fw"]);
        // 44 × (1 + 2/3) = 73.3
        assert_eq!(result.impact_score, 73);
        assert_eq!(result.compromise_details[1].via.as_deref(), Some("net"));
    }

    #[test]
    fn impact_score_is_clamped() {
        let nodes: Vec<_> = (0..4).map(|i| public_api(&format!("api-{i}"))).collect();
        let result = evaluate(&diagram(nodes, vec![]), &SimulationConfig::default()).unwrap();
        assert_eq!(result.stats.total_system_risk, 176);
        assert_eq!(result.impact_score, 100);
    }

    #[test]
    fn configured_maximum_above_hundred_is_capped() {
        let nodes: Vec<_> = (0..4).map(|i| public_api(&format!("api-{i}"))).collect();
        let config = SimulationConfig {
            max_impact_score: 150,
            ..Default::default()
        };
        let result = evaluate(&diagram(nodes, vec![]), &config).unwrap();
        assert_eq!(result.impact_score, 100);
    }

    #[test]
    fn dangling_edges_are_tolerated_and_counted() {
        let d = diagram(
            vec![public_api("a")],
            vec![Connection::new("e1", "a", "ghost"), Connection::new("e2", "ghost", "a")],
        );
        let result = evaluate(&d, &SimulationConfig::default()).unwrap();
        assert_eq!(result.compromised_nodes, ["a"]);
        assert_eq!(result.stats.dangling_edge_count, 2);
        assert_eq!(result.stats.edge_count, 2);
    }

    #[test]
    fn editor_json_without_edge_ids_evaluates() {
        let mut d: Diagram = serde_json::from_value(serde_json::json!({
            "nodes": [
                {"id": "a", "type": "api", "configuration": {
                    "componentType": "api", "authType": "None", "exposure": "Public"
                }},
                {"id": "b", "type": "server", "configuration": {"instanceCount": 1}}
            ],
            "edges": [{"source": "a", "target": "b"}]
        }))
        .unwrap();
        d.fill_missing_edge_ids();

        let result = evaluate(&d, &SimulationConfig::default()).unwrap();
        assert_eq!(result.compromised_nodes, ["a", "b"]);
        assert_eq!(result.stats.edge_count, 1);
        assert_eq!(d.edges[0].id, "edge-0");
    }

    #[test]
    fn evaluation_is_deterministic() {
        let d = diagram(
            vec![public_api("a"), hardened_db("b"), insecure_firewall("c")],
            vec![Connection::new("e1", "a", "c"), Connection::new("e2", "c", "b")],
        );
        let config = SimulationConfig::default();
        let first = evaluate(&d, &config).unwrap();
        let second = evaluate(&d, &config).unwrap();

        assert_eq!(first.compromised_nodes, second.compromised_nodes);
        assert_eq!(first.impact_score, second.impact_score);
        assert_eq!(first.snapshot.fingerprint, second.snapshot.fingerprint);
    }

    #[test]
    fn threshold_is_configurable() {
        let d = diagram(vec![public_api("a")], vec![]);
        let config = SimulationConfig {
            compromise_threshold: 50,
            ..Default::default()
        };
        let result = evaluate(&d, &config).unwrap();
        assert!(result.compromised_nodes.is_empty());
        assert_eq!(result.impact_score, 44);
    }

    #[tokio::test]
    async fn simulate_commits_to_diagram_and_project() {
        let d = diagram(
            vec![public_api("a"), hardened_db("b")],
            vec![Connection::new("e1", "a", "b")],
        );
        let store = seeded(&d).await;
        let engine = SimulationEngine::new(store.clone());

        let result = engine.simulate(&d.id).await.unwrap();
        assert_eq!(result.impact_score, 66);
        assert_eq!(result.snapshot.version, 0);
        assert_eq!(result.snapshot.committed_version, Some(1));

        assert_eq!(store.diagram(&d.id).await.unwrap().risk_score, Some(66));
        assert_eq!(store.project(&d.project_id).await.unwrap().risk_score, Some(66));
    }

    #[tokio::test]
    async fn simulate_twice_gives_identical_results() {
        let d = diagram(vec![public_api("a")], vec![]);
        let engine = SimulationEngine::new(seeded(&d).await);

        let first = engine.simulate(&d.id).await.unwrap();
        let second = engine.simulate(&d.id).await.unwrap();
        assert_eq!(first.compromised_nodes, second.compromised_nodes);
        assert_eq!(first.impact_score, second.impact_score);
        assert_eq!(second.snapshot.version, 1);
    }

    #[tokio::test]
    async fn missing_diagram_is_not_found() {
        let engine = SimulationEngine::new(MemoryStore::new());
        let result = engine.simulate(&DiagramId::new()).await;
        assert!(matches!(
            result,
            Err(SimError::Store(StoreError::NotFound { .. }))
        ));
    }

    /// Edits the diagram between the read and the commit.
    struct RacingStore {
        inner: MemoryStore,
    }

    impl DiagramStore for RacingStore {
        async fn load_diagram(&self, id: &DiagramId) -> bulwark_store::error::Result<Diagram> {
            let diagram = self.inner.load_diagram(id).await?;
            self.inner
                .update_diagram(id, |d| d.name = Some("edited".to_string()))
                .await?;
            Ok(diagram)
        }

        async fn commit_risk_score(
            &self,
            commit: &RiskCommit,
        ) -> bulwark_store::error::Result<CommitReceipt> {
            self.inner.commit_risk_score(commit).await
        }
    }

    #[tokio::test]
    async fn concurrent_edit_conflicts_without_writes() {
        let d = diagram(vec![public_api("a")], vec![]);
        let store = seeded(&d).await;
        let engine = SimulationEngine::new(RacingStore {
            inner: store.clone(),
        });

        let result = engine.simulate(&d.id).await;
        assert!(matches!(
            result,
            Err(SimError::Store(StoreError::Conflict {
                expected: 0,
                actual: 1,
                ..
            }))
        ));
        assert_eq!(store.diagram(&d.id).await.unwrap().risk_score, None);
        assert_eq!(store.project(&d.project_id).await.unwrap().risk_score, None);
    }

    #[tokio::test]
    async fn simulate_records_audit_trail() {
        let dir = tempfile::tempdir().unwrap();
        let d = diagram(vec![public_api("a")], vec![]);
        let engine = SimulationEngine::new(seeded(&d).await)
            .with_audit_dir(dir.path().to_string_lossy().into_owned());

        let result = engine.simulate(&d.id).await.unwrap();
        let audit_id = result.audit_id.expect("audit id");
        let id = AuditId(uuid::Uuid::parse_str(&audit_id).unwrap());

        let record = FileAuditStore::new(dir.path())
            .unwrap()
            .get(d.id.0, id)
            .unwrap();
        let stages: Vec<_> = record.steps.iter().map(|s| s.stage.as_str()).collect();
        assert_eq!(stages, ["profile", "traverse", "quantify", "persist"]);
        assert!(record.steps.iter().all(|s| s.success));
        assert_eq!(record.snapshot_fingerprint, result.snapshot.fingerprint);
        assert_eq!(record.diagram_id, d.id.0);
    }

    #[tokio::test]
    async fn audit_history_reads_back_every_run() {
        let dir = tempfile::tempdir().unwrap();
        let audit_dir = dir.path().to_string_lossy().into_owned();
        let d = diagram(vec![public_api("a")], vec![]);
        let engine = SimulationEngine::new(seeded(&d).await).with_audit_dir(audit_dir.clone());

        engine.simulate(&d.id).await.unwrap();
        let latest = engine.simulate(&d.id).await.unwrap();

        let entries = audit::history(&audit_dir, &d.id, &AuditQuery::default()).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.intact));
        assert_eq!(Some(entries[0].record.id.to_string()), latest.audit_id);
        assert_eq!(entries[0].record.diagram_version, 1);
        assert_eq!(entries[1].record.diagram_version, 0);
    }

    #[tokio::test]
    async fn failed_commit_is_audited_as_unsuccessful() {
        let dir = tempfile::tempdir().unwrap();
        let audit_dir = dir.path().to_string_lossy().into_owned();
        let d = diagram(vec![public_api("a")], vec![]);
        let engine = SimulationEngine::new(RacingStore {
            inner: seeded(&d).await,
        })
        .with_audit_dir(audit_dir.clone());

        assert!(engine.simulate(&d.id).await.is_err());

        let entries = audit::history(&audit_dir, &d.id, &AuditQuery::default()).unwrap();
        assert_eq!(entries.len(), 1);
        let persist = entries[0].record.steps.last().unwrap();
        assert_eq!(persist.stage, "persist");
        assert!(!persist.success);
    }
}
