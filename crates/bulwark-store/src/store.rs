//! The persistence boundary consumed by the simulation engine.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bulwark_core::{Diagram, DiagramId, ProjectId};

use crate::error::Result;

/// A computed score to write back to a diagram and its project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskCommit {
    pub diagram_id: DiagramId,
    pub project_id: ProjectId,
    /// Diagram version the score was computed from.
    pub expected_version: u64,
    pub risk_score: u32,
}

/// Outcome of a successful commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Diagram version after the write.
    pub diagram_version: u64,
    pub committed_at: DateTime<Utc>,
}

/// Read and write access to diagram records.
pub trait DiagramStore: Send + Sync {
    /// Load a diagram with its components and connections, in stored order.
    ///
    /// Fails with [`StoreError::NotFound`](crate::StoreError::NotFound) when
    /// the id does not resolve.
    fn load_diagram(&self, id: &DiagramId) -> impl Future<Output = Result<Diagram>> + Send;

    /// Write `risk_score` to the diagram and its project as one unit.
    ///
    /// Both records are updated or neither is. The write is refused with
    /// [`StoreError::Conflict`](crate::StoreError::Conflict) when the diagram
    /// version no longer equals `expected_version`.
    fn commit_risk_score(
        &self,
        commit: &RiskCommit,
    ) -> impl Future<Output = Result<CommitReceipt>> + Send;
}

impl DiagramStore for crate::client::GraphClient {
    async fn load_diagram(&self, id: &DiagramId) -> Result<Diagram> {
        self.fetch_diagram(id).await
    }

    async fn commit_risk_score(&self, commit: &RiskCommit) -> Result<CommitReceipt> {
        self.commit_scores(commit).await
    }
}
