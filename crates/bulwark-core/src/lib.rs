//! bulwark-core: Shared types, configuration, and error handling for Bulwark.
//!
//! This crate provides the foundational types used across all Bulwark crates:
//! - Diagram, component (node) and connection (edge) types
//! - Vulnerability findings with severity, MITRE ATT&CK labels and compliance tags
//! - Layered configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use error::BulwarkError;
pub use types::{
    Component, ComponentConfig, Connection, Diagram, DiagramId, Finding, MitreTactic, Project,
    ProjectId, Severity,
};
