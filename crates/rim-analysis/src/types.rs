//! Result types produced by the analyzers.

use chrono::{DateTime, Utc};
use rim_core::types::{MitigationStatus, MitigationType, RiskTier};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Report ────────────────────────────────────────────────────────

/// Complete result of one analysis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub id: Uuid,
    pub computed_at: DateTime<Utc>,
    /// BLAKE3 hex digest of the input records.
    pub fingerprint: String,
    pub graph_stats: GraphStats,
    pub exposure: ExposureResult,
    pub influence: InfluenceReport,
    pub coverage: CoverageReport,
    pub warnings: Vec<AnalysisWarning>,
    pub computation_ms: u64,
}

/// Statistics about the in-memory graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub risk_count: usize,
    pub mitigation_count: usize,
    pub objective_count: usize,
    pub influence_count: usize,
    pub mitigation_link_count: usize,
    pub objective_impact_count: usize,
}

/// Non-fatal conditions surfaced alongside results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "warning")]
pub enum AnalysisWarning {
    /// The risk lacks likelihood and/or impact and is left out of aggregates.
    IncompleteData {
        risk_id: String,
        missing: Vec<String>,
    },
    /// Relaxation hit its pass limit before settling.
    NonConvergence { iterations: usize, max_delta: f64 },
    /// Path enumeration stopped at the sample cap.
    PathSampleTruncated { max_paths: usize },
}

// ── Exposure ──────────────────────────────────────────────────────

/// Per-risk exposure breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskExposure {
    pub risk_id: String,
    pub name: String,
    pub tier: RiskTier,
    pub likelihood: Option<f64>,
    pub impact: Option<f64>,
    /// Likelihood × impact (0–100), `None` without both inputs.
    pub base_exposure: Option<f64>,
    /// ∏(1 − effectiveness) over mitigation links; 1.0 = unmitigated.
    pub mitigation_factor: f64,
    pub mitigation_count: usize,
    pub mitigated_exposure: Option<f64>,
    /// Upstream blindness penalty in [0, 1].
    pub influence_limitation: f64,
    pub effective_mitigation_factor: f64,
    pub upstream_count: usize,
    pub final_exposure: Option<f64>,
    /// Final ÷ base; 1.0 = nothing removed.
    pub residual: f64,
}

/// Health bucket derived from the weighted risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Excellent,
    Good,
    AttentionNeeded,
    Critical,
}

impl HealthStatus {
    pub fn from_score(weighted_risk_score: f64) -> Self {
        if weighted_risk_score <= 25.0 {
            Self::Excellent
        } else if weighted_risk_score <= 50.0 {
            Self::Good
        } else if weighted_risk_score <= 75.0 {
            Self::AttentionNeeded
        } else {
            Self::Critical
        }
    }
}

/// Portfolio-level aggregates over risks with computable exposure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    /// True when no risk has both likelihood and impact; all figures are zero.
    pub no_data: bool,
    pub residual_risk_percent: f64,
    pub weighted_risk_score: f64,
    pub max_single_exposure: f64,
    pub max_exposure_risk_id: Option<String>,
    pub health: Option<HealthStatus>,
    pub total_risks: usize,
    pub risks_with_data: usize,
    pub total_base_exposure: f64,
    pub total_final_exposure: f64,
    pub strategic_exposure: f64,
    pub operational_exposure: f64,
    pub mitigated_risks: usize,
    pub unmitigated_risks: usize,
}

/// Output of the exposure calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureResult {
    /// One entry per risk, in graph index order.
    pub risks: Vec<RiskExposure>,
    pub metrics: PortfolioMetrics,
    pub iterations: usize,
    pub converged: bool,
    /// Largest residual change observed in the last pass.
    pub max_delta: f64,
    pub warnings: Vec<AnalysisWarning>,
}

impl ExposureResult {
    pub fn get(&self, risk_id: &str) -> Option<&RiskExposure> {
        self.risks.iter().find(|r| r.risk_id == risk_id)
    }
}

// ── Influence ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Risk,
    Objective,
}

/// A risk ranked by downstream propagation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Propagator {
    pub risk_id: String,
    pub name: String,
    pub tier: RiskTier,
    pub score: f64,
    pub risks_reached: usize,
    pub objectives_reached: Vec<String>,
    /// Strongest of the fewest-hop chains to each reached objective.
    pub supporting_paths: Vec<CriticalPath>,
}

/// A node where several influences land.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergencePoint {
    pub node_id: String,
    pub name: String,
    pub kind: NodeKind,
    pub score: f64,
    pub incoming_count: usize,
    pub source_count: usize,
    pub average_strength: f64,
}

/// A simple chain from an operational risk to an objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalPath {
    /// Risks along the chain, origin first.
    pub risk_ids: Vec<String>,
    pub objective_id: String,
    /// Short objective code, e.g. "TPO-03".
    pub objective_reference: String,
    /// ∏ influence strengths × final impact score.
    pub strength: f64,
    /// Edge count, including the final objective impact.
    pub length: usize,
}

/// A risk many risk → objective chains pass through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bottleneck {
    pub risk_id: String,
    pub name: String,
    pub tier: RiskTier,
    pub score: f64,
    pub path_count: usize,
    pub total_paths: usize,
    pub percentage: f64,
    pub average_strength: f64,
}

/// A densely connected group of risks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskCluster {
    /// Member ids, sorted.
    pub risk_ids: Vec<String>,
    pub size: usize,
    pub edge_count: usize,
    pub density: f64,
    pub operational_count: usize,
    pub strategic_count: usize,
    pub primary_category: String,
}

/// All influence network analyses for one graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluenceReport {
    pub top_propagators: Vec<Propagator>,
    pub convergence_points: Vec<ConvergencePoint>,
    pub critical_paths: Vec<CriticalPath>,
    pub bottlenecks: Vec<Bottleneck>,
    pub clusters: Vec<RiskCluster>,
    /// Size of the path sample behind critical paths and bottlenecks.
    pub total_paths: usize,
    pub paths_truncated: bool,
}

// ── Coverage ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoverageStatus {
    /// No mitigation links at all.
    None,
    /// Linked mitigations exist but none is implemented.
    ProposedOnly,
    Partial,
    WellCovered,
}

impl CoverageStatus {
    pub fn is_gap(&self) -> bool {
        matches!(self, Self::None | Self::ProposedOnly)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InfluenceFlag {
    TopPropagator,
    ConvergencePoint,
    Bottleneck,
}

/// Mitigation state of one risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskCoverage {
    pub risk_id: String,
    pub name: String,
    pub tier: RiskTier,
    pub status: CoverageStatus,
    pub mitigation_count: usize,
    pub implemented_count: usize,
    /// Links to mitigations that are proposed or in progress.
    pub proposed_count: usize,
    pub effective_mitigation_factor: f64,
    pub final_exposure: Option<f64>,
    pub influence_flags: Vec<InfluenceFlag>,
    pub high_priority_gap: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupCoverage {
    pub total: usize,
    pub mitigated: usize,
    pub unmitigated: usize,
    pub coverage_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierCoverage {
    pub operational: GroupCoverage,
    pub strategic: GroupCoverage,
}

/// Link counts per effectiveness class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivenessDistribution {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageStats {
    pub total_risks: usize,
    pub mitigated_risks: usize,
    pub unmitigated_risks: usize,
    pub coverage_percent: f64,
    pub total_mitigations: usize,
    pub total_links: usize,
}

/// Output of the mitigation coverage analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    /// One entry per risk, in graph index order.
    pub risks: Vec<RiskCoverage>,
    /// High-priority gaps, highest final exposure first.
    pub gaps: Vec<RiskCoverage>,
    pub stats: CoverageStats,
    pub by_tier: TierCoverage,
    /// Keyed by category name.
    pub by_category: std::collections::BTreeMap<String, GroupCoverage>,
    pub effectiveness: EffectivenessDistribution,
}

/// What a single mitigation contributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MitigationImpact {
    pub mitigation_id: String,
    pub name: String,
    pub mitigation_type: MitigationType,
    pub status: MitigationStatus,
    pub risk_ids: Vec<String>,
    pub operational_count: usize,
    pub strategic_count: usize,
    pub total_final_exposure: f64,
    /// Addressed risks carrying at least one influence flag.
    pub high_priority_risk_ids: Vec<String>,
    pub addresses_high_priority: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_buckets_are_closed_on_the_right() {
        assert_eq!(HealthStatus::from_score(0.0), HealthStatus::Excellent);
        assert_eq!(HealthStatus::from_score(25.0), HealthStatus::Excellent);
        assert_eq!(HealthStatus::from_score(25.01), HealthStatus::Good);
        assert_eq!(HealthStatus::from_score(50.0), HealthStatus::Good);
        assert_eq!(HealthStatus::from_score(75.0), HealthStatus::AttentionNeeded);
        assert_eq!(HealthStatus::from_score(75.5), HealthStatus::Critical);
        assert_eq!(HealthStatus::from_score(100.0), HealthStatus::Critical);
    }

    #[test]
    fn gap_statuses() {
        assert!(CoverageStatus::None.is_gap());
        assert!(CoverageStatus::ProposedOnly.is_gap());
        assert!(!CoverageStatus::Partial.is_gap());
        assert!(!CoverageStatus::WellCovered.is_gap());
    }

    #[test]
    fn warning_serializes_tagged() {
        let warning = AnalysisWarning::NonConvergence {
            iterations: 50,
            max_delta: 0.01,
        };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["warning"], "NonConvergence");
        assert_eq!(json["iterations"], 50);
    }
}
