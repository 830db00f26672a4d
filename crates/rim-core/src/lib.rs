//! rim-core: Shared record types, configuration, and error handling for the RIM engine.
//!
//! This crate provides the foundational types used by the analysis engine:
//! - Risk, mitigation, and objective records supplied by the persistence layer
//! - Relationship records (influences, mitigations, objective impacts)
//! - Closed scoring vocabularies (tier, effectiveness, strength, impact level)
//! - Layered configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::AnalysisConfig;
pub use error::RimError;
pub use types::{
    Effectiveness, GraphInput, ImpactLevel, InfluenceRecord, InfluenceStrength, MitigatesRecord,
    MitigationRecord, MitigationStatus, MitigationType, ObjectiveImpactRecord, ObjectiveRecord,
    RiskOrigin, RiskRecord, RiskStatus, RiskTier,
};
