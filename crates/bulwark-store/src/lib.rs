//! bulwark-store: Diagram and project persistence.
//!
//! The simulation engine reads a diagram snapshot and writes the computed
//! risk score back to the diagram and its project through the
//! [`DiagramStore`] trait. Two backends are provided: [`MemoryStore`] for
//! tests and embedding, and [`GraphClient`] for Neo4j.
//!
//! Score commits are guarded by the diagram's version token so concurrent
//! simulations cannot silently overwrite each other.

pub mod client;
pub mod error;
pub mod memory;
pub mod mutations;
pub mod queries;
pub mod store;

pub use client::{GraphClient, GraphConfig};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use store::{CommitReceipt, DiagramStore, RiskCommit};
