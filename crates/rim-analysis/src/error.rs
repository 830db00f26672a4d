//! Error types for the rim-analysis crate.

use thiserror::Error;

/// Input that cannot form a valid analysis graph. Raised before any
/// computation starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructuralError {
    #[error("{relation} record references unknown {expected} '{node_id}'")]
    UnknownNode {
        relation: &'static str,
        expected: &'static str,
        node_id: String,
    },

    #[error("Duplicate node identifier '{node_id}'")]
    DuplicateNode { node_id: String },

    #[error("Influence self-loop on risk '{risk_id}'")]
    SelfLoop { risk_id: String },

    #[error("Invalid {field} on '{node_id}': {value} (expected {expected})")]
    InvalidValue {
        node_id: String,
        field: &'static str,
        value: f64,
        expected: &'static str,
    },
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),

    #[error("Config error: {0}")]
    Config(#[from] rim_core::RimError),

    #[error("Computation timeout: exceeded {max_seconds}s limit")]
    Timeout { max_seconds: u64 },

    #[error("Analysis task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
