//! rim-analysis: Exposure scoring and influence-network analysis for the
//! risk influence map.
//!
//! Builds an in-memory graph from the flat records, then computes residual
//! exposure with upstream influence limitation, ranks the influence network
//! (propagators, convergence points, critical paths, bottlenecks, clusters)
//! and cross-references both with mitigation coverage.

pub mod clusters;
pub mod convergence;
pub mod coverage;
pub mod error;
pub mod exposure;
pub mod fingerprint;
pub mod graph;
pub mod paths;
pub mod propagation;
pub mod types;
pub mod watchdog;

pub use error::{AnalysisError, StructuralError};
pub use graph::RiskGraph;
pub use types::{AnalysisReport, CoverageReport, ExposureResult, InfluenceReport};

use chrono::Utc;
use rim_core::types::GraphInput;
use rim_core::AnalysisConfig;
use uuid::Uuid;

use crate::types::{AnalysisWarning, MitigationImpact};

/// The analysis engine. Stateless apart from its configuration, so one
/// instance can serve concurrent requests.
#[derive(Debug, Clone, Default)]
pub struct RiskAnalysisEngine {
    config: AnalysisConfig,
}

impl RiskAnalysisEngine {
    /// Create a new engine with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom configuration.
    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run every analysis over one input.
    ///
    /// Orchestrates: fingerprint → build graph → exposure → influence →
    /// coverage → report.
    pub fn analyze(&self, input: &GraphInput) -> error::Result<AnalysisReport> {
        let start = std::time::Instant::now();

        let fingerprint = fingerprint::input_fingerprint(input)?;
        let graph = RiskGraph::build(input)?;
        let graph_stats = graph.stats();
        tracing::info!(
            %fingerprint,
            risks = graph_stats.risk_count,
            influences = graph_stats.influence_count,
            "Graph built"
        );

        let exposure = exposure::compute_exposure(&graph, &self.config.exposure);
        tracing::info!(
            iterations = exposure.iterations,
            converged = exposure.converged,
            residual_risk_percent = exposure.metrics.residual_risk_percent,
            "Exposure computed"
        );

        let influence = self.influence_report(&graph);
        tracing::info!(
            propagators = influence.top_propagators.len(),
            convergence_points = influence.convergence_points.len(),
            paths = influence.total_paths,
            clusters = influence.clusters.len(),
            "Influence analyzed"
        );

        let coverage =
            coverage::coverage_report(&graph, &exposure, &influence, &self.config.coverage);
        tracing::info!(
            coverage_percent = coverage.stats.coverage_percent,
            gaps = coverage.gaps.len(),
            "Coverage analyzed"
        );

        let mut warnings = exposure.warnings.clone();
        if influence.paths_truncated {
            warnings.push(AnalysisWarning::PathSampleTruncated {
                max_paths: self.config.influence.max_paths,
            });
        }

        Ok(AnalysisReport {
            id: Uuid::new_v4(),
            computed_at: Utc::now(),
            fingerprint,
            graph_stats,
            exposure,
            influence,
            coverage,
            warnings,
            computation_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Exposure only.
    pub fn compute_exposure(&self, input: &GraphInput) -> error::Result<ExposureResult> {
        let graph = RiskGraph::build(input)?;
        Ok(exposure::compute_exposure(&graph, &self.config.exposure))
    }

    /// Influence network analysis only.
    pub fn analyze_influence(&self, input: &GraphInput) -> error::Result<InfluenceReport> {
        let graph = RiskGraph::build(input)?;
        Ok(self.influence_report(&graph))
    }

    /// Contribution of one mitigation; `None` if the id is unknown.
    pub fn mitigation_impact(
        &self,
        input: &GraphInput,
        mitigation_id: &str,
    ) -> error::Result<Option<MitigationImpact>> {
        let graph = RiskGraph::build(input)?;
        let exposure = exposure::compute_exposure(&graph, &self.config.exposure);
        let influence = self.influence_report(&graph);
        let coverage =
            coverage::coverage_report(&graph, &exposure, &influence, &self.config.coverage);
        Ok(coverage::mitigation_impact(&graph, &coverage, mitigation_id))
    }

    /// All influence analyses over an already built graph.
    pub fn influence_report(&self, graph: &RiskGraph) -> InfluenceReport {
        let cfg = &self.config.influence;

        let sample = paths::enumerate_paths(graph, cfg.max_path_length, cfg.max_paths);

        InfluenceReport {
            top_propagators: propagation::top_propagators(graph, cfg),
            convergence_points: convergence::convergence_points(graph, cfg.convergence_limit),
            critical_paths: paths::critical_paths(graph, &sample, cfg.critical_path_limit),
            bottlenecks: paths::bottlenecks(graph, &sample, cfg.bottleneck_limit),
            clusters: clusters::risk_clusters(graph, cfg.min_cluster_density),
            total_paths: sample.paths.len(),
            paths_truncated: sample.truncated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::*;
    use rim_core::types::*;

    fn input() -> GraphInput {
        GraphInput {
            risks: vec![op("o1"), op("o2"), strat("s1")],
            mitigations: vec![mitigation("m1", MitigationStatus::Implemented)],
            objectives: vec![objective("t1")],
            influences: vec![
                influence("o1", "s1", InfluenceStrength::Strong),
                influence("o2", "s1", InfluenceStrength::Moderate),
            ],
            mitigates: vec![mitigates("m1", "s1", Effectiveness::High)],
            objective_impacts: vec![impact("s1", "t1", ImpactLevel::Critical)],
        }
    }

    #[test]
    fn test_analyze_full_report() {
        let engine = RiskAnalysisEngine::new();
        let report = engine.analyze(&input()).unwrap();

        assert_eq!(report.graph_stats.risk_count, 3);
        assert_eq!(report.exposure.risks.len(), 3);
        assert_eq!(report.influence.total_paths, 2);
        assert_eq!(report.influence.bottlenecks[0].risk_id, "s1");
        assert_eq!(report.influence.convergence_points[0].node_id, "s1");
        assert_eq!(report.coverage.stats.mitigated_risks, 1);
        assert!(report.warnings.is_empty());
        assert_eq!(report.fingerprint.len(), 64);
    }

    #[test]
    fn test_structural_error_surfaces() {
        let mut bad = input();
        bad.influences.push(influence("o1", "ghost", InfluenceStrength::Weak));
        let err = RiskAnalysisEngine::new().analyze(&bad).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Structural(StructuralError::UnknownNode { .. })
        ));
    }

    #[test]
    fn test_truncation_warning() {
        let mut config = AnalysisConfig::default();
        config.influence.max_paths = 1;
        let engine = RiskAnalysisEngine::new().with_config(config);
        let report = engine.analyze(&input()).unwrap();
        assert!(report.influence.paths_truncated);
        assert!(report
            .warnings
            .contains(&AnalysisWarning::PathSampleTruncated { max_paths: 1 }));
    }

    #[test]
    fn test_partial_entry_points_agree_with_full_report() {
        let engine = RiskAnalysisEngine::new();
        let report = engine.analyze(&input()).unwrap();
        assert_eq!(engine.compute_exposure(&input()).unwrap(), report.exposure);
        assert_eq!(engine.analyze_influence(&input()).unwrap(), report.influence);
    }

    #[test]
    fn test_mitigation_impact_entry_point() {
        let engine = RiskAnalysisEngine::new();
        let impact = engine.mitigation_impact(&input(), "m1").unwrap().unwrap();
        assert_eq!(impact.risk_ids, vec!["s1"]);
        assert!(impact.addresses_high_priority);
        assert!(engine.mitigation_impact(&input(), "nope").unwrap().is_none());
    }
}
