//! Error types for the bulwark-sim crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Store error: {0}")]
    Store(#[from] bulwark_store::StoreError),

    #[error("Audit error: {0}")]
    Audit(#[from] bulwark_audit::AuditError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
