//! Core domain records for the risk influence map.
//!
//! These types mirror the records handed over by the persistence layer.
//! Categorical fields are closed enums so every scoring table is matched
//! exhaustively.

use serde::{Deserialize, Serialize};

// ── Risk ──────────────────────────────────────────────────────────

/// Position of a risk in the cause → consequence hierarchy.
///
/// Ordered: `Operational` (cause-oriented) sorts before `Strategic`
/// (consequence-oriented).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RiskTier {
    Operational,
    Strategic,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RiskStatus {
    #[default]
    Active,
    Contingent,
    Archived,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RiskOrigin {
    #[default]
    New,
    Legacy,
}

/// A risk item in the influence network.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub tier: RiskTier,
    /// Likelihood on a 0–10 scale. `None` when not yet assessed.
    #[serde(default)]
    pub likelihood: Option<f64>,
    /// Impact on a 0–10 scale. `None` when not yet assessed.
    #[serde(default)]
    pub impact: Option<f64>,
    #[serde(default)]
    pub status: RiskStatus,
    #[serde(default)]
    pub origin: RiskOrigin,
    /// Domain tags ("Programme", "Supply Chain", ...).
    #[serde(default)]
    pub categories: Vec<String>,
}

// ── Mitigation ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MitigationType {
    #[default]
    Dedicated,
    Inherited,
    Baseline,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MitigationStatus {
    #[default]
    Proposed,
    #[serde(alias = "In Progress")]
    InProgress,
    Implemented,
    Deferred,
}

impl MitigationStatus {
    /// Whether the control is actually in force.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Implemented)
    }
}

/// A mitigating control.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MitigationRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mitigation_type: MitigationType,
    #[serde(default)]
    pub status: MitigationStatus,
}

// ── Objective ─────────────────────────────────────────────────────

/// A top program objective that risks can impact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectiveRecord {
    pub id: String,
    /// Short reference code, e.g. "TPO-03".
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub name: String,
}

// ── Relationships ─────────────────────────────────────────────────

/// How much of a risk a single mitigation link removes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Effectiveness {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Effectiveness {
    /// Fraction of the risk a link leaves in place. The reductions are
    /// 30 / 50 / 70 / 90 %, stored as exact remainders so `High` leaves
    /// exactly 0.30.
    pub fn remaining(&self) -> f64 {
        match self {
            Self::Low => 0.70,
            Self::Medium => 0.50,
            Self::High => 0.30,
            Self::Critical => 0.10,
        }
    }
}

/// Strength of a risk → risk influence.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InfluenceStrength {
    Weak,
    #[default]
    Moderate,
    Strong,
    Critical,
}

impl InfluenceStrength {
    /// Normalized strength score (0.25 – 1.0).
    pub fn score(&self) -> f64 {
        match self {
            Self::Weak => 0.25,
            Self::Moderate => 0.50,
            Self::Strong => 0.75,
            Self::Critical => 1.00,
        }
    }
}

/// Severity of a risk's impact on an objective.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImpactLevel {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl ImpactLevel {
    /// Normalized impact score, on the same scale as [`InfluenceStrength::score`].
    pub fn score(&self) -> f64 {
        match self {
            Self::Low => 0.25,
            Self::Medium => 0.50,
            Self::High => 0.75,
            Self::Critical => 1.00,
        }
    }
}

/// Directed influence: the source risk makes the target risk more likely or worse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InfluenceRecord {
    pub source_id: String,
    pub target_id: String,
    #[serde(default)]
    pub strength: InfluenceStrength,
    /// Advisory confidence (0.0 – 1.0). Not used in exposure arithmetic.
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

/// A mitigation → risk link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MitigatesRecord {
    pub mitigation_id: String,
    pub risk_id: String,
    #[serde(default)]
    pub effectiveness: Effectiveness,
}

/// A risk → objective impact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectiveImpactRecord {
    pub risk_id: String,
    pub objective_id: String,
    #[serde(default)]
    pub impact_level: ImpactLevel,
}

fn default_confidence() -> f64 {
    0.8
}

/// Everything needed to build one analysis graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphInput {
    #[serde(default)]
    pub risks: Vec<RiskRecord>,
    #[serde(default)]
    pub mitigations: Vec<MitigationRecord>,
    #[serde(default)]
    pub objectives: Vec<ObjectiveRecord>,
    #[serde(default)]
    pub influences: Vec<InfluenceRecord>,
    #[serde(default)]
    pub mitigates: Vec<MitigatesRecord>,
    #[serde(default)]
    pub objective_impacts: Vec<ObjectiveImpactRecord>,
}
