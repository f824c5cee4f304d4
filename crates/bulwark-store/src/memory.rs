//! In-process diagram store.
//!
//! Holds diagrams and projects behind a single async lock so a score commit
//! observes and updates both records atomically. Clone is cheap (inner Arc).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use bulwark_core::{Diagram, DiagramId, Project, ProjectId};

use crate::error::{Result, StoreError};
use crate::store::{CommitReceipt, DiagramStore, RiskCommit};

#[derive(Debug, Default)]
struct MemoryState {
    diagrams: HashMap<DiagramId, Diagram>,
    projects: HashMap<ProjectId, Project>,
}

/// Thread-safe in-memory [`DiagramStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a project.
    pub async fn insert_project(&self, project: Project) {
        self.state.write().await.projects.insert(project.id, project);
    }

    /// Insert or replace a diagram as-is, keeping its version.
    pub async fn insert_diagram(&self, diagram: Diagram) {
        self.state.write().await.diagrams.insert(diagram.id, diagram);
    }

    /// Apply an edit to a stored diagram and bump its version.
    pub async fn update_diagram<F>(&self, id: &DiagramId, edit: F) -> Result<u64>
    where
        F: FnOnce(&mut Diagram),
    {
        let mut state = self.state.write().await;
        let diagram = state
            .diagrams
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound {
                diagram_id: id.to_string(),
            })?;
        edit(diagram);
        diagram.version += 1;
        diagram.updated_at = Utc::now();
        Ok(diagram.version)
    }

    pub async fn diagram(&self, id: &DiagramId) -> Option<Diagram> {
        self.state.read().await.diagrams.get(id).cloned()
    }

    pub async fn project(&self, id: &ProjectId) -> Option<Project> {
        self.state.read().await.projects.get(id).cloned()
    }
}

impl DiagramStore for MemoryStore {
    async fn load_diagram(&self, id: &DiagramId) -> Result<Diagram> {
        self.diagram(id).await.ok_or_else(|| StoreError::NotFound {
            diagram_id: id.to_string(),
        })
    }

    async fn commit_risk_score(&self, commit: &RiskCommit) -> Result<CommitReceipt> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let diagram = state
            .diagrams
            .get_mut(&commit.diagram_id)
            .ok_or_else(|| StoreError::NotFound {
                diagram_id: commit.diagram_id.to_string(),
            })?;

        if diagram.version != commit.expected_version {
            return Err(StoreError::Conflict {
                diagram_id: commit.diagram_id.to_string(),
                expected: commit.expected_version,
                actual: diagram.version,
            });
        }

        let project = state
            .projects
            .get_mut(&commit.project_id)
            .ok_or_else(|| StoreError::ProjectNotFound {
                project_id: commit.project_id.to_string(),
            })?;

        let now = Utc::now();
        diagram.risk_score = Some(commit.risk_score);
        diagram.version += 1;
        diagram.updated_at = now;
        project.risk_score = Some(commit.risk_score);
        project.updated_at = now;

        tracing::debug!(
            diagram_id = %commit.diagram_id,
            project_id = %commit.project_id,
            risk_score = commit.risk_score,
            version = diagram.version,
            "Risk score committed"
        );

        Ok(CommitReceipt {
            diagram_version: diagram.version,
            committed_at: now,
        })
    }
}
