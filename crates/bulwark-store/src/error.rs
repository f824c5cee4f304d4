//! Error types for the bulwark-store crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Diagram not found: {diagram_id}")]
    NotFound { diagram_id: String },

    #[error("Project not found: {project_id}")]
    ProjectNotFound { project_id: String },

    #[error("Diagram {diagram_id} changed during simulation: expected version {expected}, found {actual}")]
    Conflict {
        diagram_id: String,
        expected: u64,
        actual: u64,
    },

    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(#[from] neo4rs::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
