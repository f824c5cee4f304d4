//! Write operations against the Neo4j diagram schema.

use chrono::Utc;
use neo4rs::query;

use bulwark_core::{Diagram, Project};

use crate::client::GraphClient;
use crate::error::{Result, StoreError};
use crate::store::{CommitReceipt, RiskCommit};

/// Version-checked score commit.
///
/// The leading `SET` takes the diagram's write lock before its version is
/// read, so two concurrent commits serialize and the loser sees the bumped
/// version. Both records are written inside the `FOREACH` or neither is.
const COMMIT_RISK_SCORE: &str = "MATCH (d:Diagram {id: $diagram_id})
     SET d._lock = true
     WITH d
     OPTIONAL MATCH (p:Project {id: $project_id})
     WITH d, p, coalesce(d.version, 0) AS current
     FOREACH (_ IN CASE WHEN current = $expected AND p IS NOT NULL THEN [1] ELSE [] END |
       SET d.risk_score = $score, d.version = current + 1, d.updated_at = $now,
           p.risk_score = $score, p.updated_at = $now)
     REMOVE d._lock
     RETURN current, p IS NOT NULL AS project_exists";

impl GraphClient {
    /// Upsert a project record (name only; the score is engine-owned).
    pub async fn upsert_project(&self, project: &Project) -> Result<()> {
        let q = query(
            "MERGE (p:Project {id: $id})
             ON CREATE SET p.name = $name, p.updated_at = $now
             ON MATCH SET p.name = $name, p.updated_at = $now",
        )
        .param("id", project.id.to_string())
        .param("name", project.name.clone())
        .param("now", Utc::now().to_rfc3339());

        self.run(q).await
    }

    /// Replace a diagram's components and connections and bump its version.
    ///
    /// Runs in one transaction. Returns the new version.
    pub async fn save_diagram(&self, diagram: &Diagram) -> Result<u64> {
        let diagram_id = diagram.id.to_string();
        let now = Utc::now().to_rfc3339();
        let mut txn = self.start_txn().await?;

        txn.run(
            query(
                "MERGE (d:Diagram {id: $id})
                 SET d.project_id = $project_id, d.name = $name, d.updated_at = $now,
                     d.version = coalesce(d.version, 0) + 1
                 WITH d
                 OPTIONAL MATCH (d)-[:HAS_COMPONENT|HAS_CONNECTION]->(old)
                 DETACH DELETE old",
            )
            .param("id", diagram_id.clone())
            .param("project_id", diagram.project_id.to_string())
            .param("name", diagram.name.clone().unwrap_or_default())
            .param("now", now.clone()),
        )
        .await?;

        for (position, component) in diagram.nodes.iter().enumerate() {
            let configuration = serde_json::to_string(&component.configuration)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            txn.run(
                query(
                    "MATCH (d:Diagram {id: $diagram_id})
                     CREATE (d)-[:HAS_COMPONENT]->(:Component {
                       diagram_id: $diagram_id, id: $id, type: $kind, label: $label,
                       configuration: $configuration, position: $position
                     })",
                )
                .param("diagram_id", diagram_id.clone())
                .param("id", component.id.clone())
                .param("kind", component.kind.clone())
                .param("label", component.label.clone().unwrap_or_default())
                .param("configuration", configuration)
                .param("position", position as i64),
            )
            .await?;
        }

        for (position, connection) in diagram.edges.iter().enumerate() {
            txn.run(
                query(
                    "MATCH (d:Diagram {id: $diagram_id})
                     CREATE (d)-[:HAS_CONNECTION]->(:Connection {
                       diagram_id: $diagram_id, id: $id, source: $source, target: $target,
                       position: $position
                     })",
                )
                .param("diagram_id", diagram_id.clone())
                .param("id", connection.id.clone())
                .param("source", connection.source.clone())
                .param("target", connection.target.clone())
                .param("position", position as i64),
            )
            .await?;
        }

        txn.commit().await?;

        let version = self.fetch_diagram(&diagram.id).await?.version;
        tracing::info!(
            diagram_id = %diagram.id,
            nodes = diagram.nodes.len(),
            edges = diagram.edges.len(),
            version,
            "Diagram saved"
        );
        Ok(version)
    }

    /// Write a computed risk score to a diagram and its project.
    pub async fn commit_scores(&self, commit: &RiskCommit) -> Result<CommitReceipt> {
        let now = Utc::now();
        let q = query(COMMIT_RISK_SCORE)
            .param("diagram_id", commit.diagram_id.to_string())
            .param("project_id", commit.project_id.to_string())
            .param("expected", commit.expected_version as i64)
            .param("score", commit.risk_score as i64)
            .param("now", now.to_rfc3339());

        let row = self
            .query_one(q)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                diagram_id: commit.diagram_id.to_string(),
            })?;

        let current = decode_version(row.get::<i64>("current").map_err(|e| {
            StoreError::Serialization(format!("Failed to decode diagram version: {e}"))
        })?)?;
        let project_exists = row.get::<bool>("project_exists").map_err(|e| {
            StoreError::Serialization(format!("Failed to decode project existence: {e}"))
        })?;

        if current != commit.expected_version {
            return Err(StoreError::Conflict {
                diagram_id: commit.diagram_id.to_string(),
                expected: commit.expected_version,
                actual: current,
            });
        }
        if !project_exists {
            return Err(StoreError::ProjectNotFound {
                project_id: commit.project_id.to_string(),
            });
        }

        tracing::debug!(
            diagram_id = %commit.diagram_id,
            risk_score = commit.risk_score,
            version = current + 1,
            "Risk score committed"
        );

        Ok(CommitReceipt {
            diagram_version: current + 1,
            committed_at: now,
        })
    }
}

/// Stored versions start at 0 and only grow.
fn decode_version(raw: i64) -> Result<u64> {
    u64::try_from(raw).map_err(|_| StoreError::Serialization(format!("Negative diagram version {raw}")))
}
