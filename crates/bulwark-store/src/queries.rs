//! Read operations against the Neo4j diagram schema.
//!
//! Schema:
//! ```text
//! (:Project {id, name, risk_score, updated_at})
//! (:Diagram {id, project_id, name, version, risk_score, updated_at})
//!   -[:HAS_COMPONENT]->  (:Component  {diagram_id, id, type, label, configuration, position})
//!   -[:HAS_CONNECTION]-> (:Connection {diagram_id, id, source, target, position})
//! ```
//! Connections are nodes rather than relationships because their endpoints
//! may name components that do not exist. `configuration` is stored as a
//! JSON string.

use chrono::{DateTime, Utc};
use neo4rs::query;
use serde::Deserialize;
use uuid::Uuid;

use bulwark_core::{Component, ComponentConfig, Connection, Diagram, DiagramId, Project, ProjectId};

use crate::client::GraphClient;
use crate::error::{Result, StoreError};

/// Diagram properties as projected by [`LOAD_DIAGRAM`].
#[derive(Debug, Clone, Deserialize)]
pub struct DiagramRow {
    pub id: String,
    pub project_id: String,
    pub name: Option<String>,
    pub version: Option<i64>,
    pub risk_score: Option<i64>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComponentRow {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub label: Option<String>,
    pub configuration: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionRow {
    pub id: Option<String>,
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ProjectRow {
    id: String,
    name: Option<String>,
    risk_score: Option<i64>,
    updated_at: Option<String>,
}

/// One statement, so the diagram, its components and its connections come
/// from the same committed state.
const LOAD_DIAGRAM: &str = "MATCH (d:Diagram {id: $id})
     OPTIONAL MATCH (d)-[:HAS_COMPONENT]->(c:Component)
     WITH d, c ORDER BY c.position
     WITH d, collect(c {.id, .type, .label, .configuration}) AS components
     OPTIONAL MATCH (d)-[:HAS_CONNECTION]->(e:Connection)
     WITH d, components, e ORDER BY e.position
     RETURN d {.id, .project_id, .name, .version, .risk_score, .updated_at} AS diagram,
            components,
            collect(e {.id, .source, .target}) AS connections";

impl GraphClient {
    /// Load a diagram snapshot with components and connections in stored order.
    pub async fn fetch_diagram(&self, id: &DiagramId) -> Result<Diagram> {
        let q = query(LOAD_DIAGRAM).param("id", id.to_string());

        let row = self
            .query_one(q)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                diagram_id: id.to_string(),
            })?;

        let header: DiagramRow = row.get("diagram").map_err(|e| {
            StoreError::Serialization(format!("Failed to deserialize diagram: {e}"))
        })?;
        let components: Vec<ComponentRow> = row.get("components").map_err(|e| {
            StoreError::Serialization(format!("Failed to deserialize components: {e}"))
        })?;
        let connections: Vec<ConnectionRow> = row.get("connections").map_err(|e| {
            StoreError::Serialization(format!("Failed to deserialize connections: {e}"))
        })?;

        let diagram = assemble_diagram(header, components, connections)?;
        tracing::debug!(
            diagram_id = %diagram.id,
            nodes = diagram.nodes.len(),
            edges = diagram.edges.len(),
            version = diagram.version,
            "Diagram loaded"
        );
        Ok(diagram)
    }

    /// Look up a project by id.
    pub async fn fetch_project(&self, id: &ProjectId) -> Result<Option<Project>> {
        let q = query(
            "MATCH (p:Project {id: $id})
             RETURN p {.id, .name, .risk_score, .updated_at} AS project",
        )
        .param("id", id.to_string());

        let Some(row) = self.query_one(q).await? else {
            return Ok(None);
        };
        let record: ProjectRow = row.get("project").map_err(|e| {
            StoreError::Serialization(format!("Failed to deserialize project: {e}"))
        })?;

        Ok(Some(Project {
            id: ProjectId(parse_uuid(&record.id, "project id")?),
            name: record.name.unwrap_or_default(),
            risk_score: record.risk_score.map(score_from_i64),
            updated_at: parse_timestamp(record.updated_at.as_deref()),
        }))
    }
}

/// Build a [`Diagram`] from projected rows.
pub fn assemble_diagram(
    header: DiagramRow,
    components: Vec<ComponentRow>,
    connections: Vec<ConnectionRow>,
) -> Result<Diagram> {
    let nodes = components
        .into_iter()
        .map(|row| {
            let configuration = match row.configuration.as_deref() {
                Some(raw) if !raw.is_empty() => {
                    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| {
                        StoreError::Serialization(format!(
                            "Invalid configuration on component {}: {e}",
                            row.id
                        ))
                    })?;
                    ComponentConfig::from_value(value)
                }
                _ => ComponentConfig::default(),
            };
            Ok(Component {
                id: row.id,
                kind: row.kind.unwrap_or_default(),
                label: row.label,
                configuration,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let edges = connections
        .into_iter()
        .map(|row| Connection {
            id: row.id.unwrap_or_default(),
            source: row.source,
            target: row.target,
        })
        .collect();

    let mut diagram = Diagram {
        id: DiagramId(parse_uuid(&header.id, "diagram id")?),
        project_id: ProjectId(parse_uuid(&header.project_id, "project id")?),
        name: header.name,
        nodes,
        edges,
        risk_score: header.risk_score.map(score_from_i64),
        version: header.version.unwrap_or(0).max(0) as u64,
        updated_at: parse_timestamp(header.updated_at.as_deref()),
    };
    diagram.fill_missing_edge_ids();
    Ok(diagram)
}

fn parse_uuid(raw: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Serialization(format!("Invalid {what} {raw:?}: {e}")))
}

fn parse_timestamp(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

fn score_from_i64(score: i64) -> u32 {
    score.clamp(0, u32::MAX as i64) as u32
}
