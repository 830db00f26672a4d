//! Mitigation coverage and gap analysis.
//!
//! Cross-references each risk's mitigation links with its exposure and its
//! role in the influence network. A risk that is uncovered (or covered only by
//! controls not yet in force) while also being a top propagator, convergence
//! point or bottleneck is a high-priority gap.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use rim_core::config::CoverageConfig;
use rim_core::types::{Effectiveness, MitigationStatus, RiskTier};

use crate::graph::RiskGraph;
use crate::types::{
    CoverageReport, CoverageStats, CoverageStatus, EffectivenessDistribution, ExposureResult,
    GroupCoverage, InfluenceFlag, InfluenceReport, MitigationImpact, NodeKind, RiskCoverage,
    TierCoverage,
};

/// Build the coverage report from the exposure and influence results of the
/// same graph.
pub fn coverage_report(
    graph: &RiskGraph,
    exposure: &ExposureResult,
    influence: &InfluenceReport,
    config: &CoverageConfig,
) -> CoverageReport {
    let exposures: HashMap<&str, (f64, Option<f64>)> = exposure
        .risks
        .iter()
        .map(|r| {
            (
                r.risk_id.as_str(),
                (r.effective_mitigation_factor, r.final_exposure),
            )
        })
        .collect();

    let propagators: HashSet<&str> = influence
        .top_propagators
        .iter()
        .map(|p| p.risk_id.as_str())
        .collect();
    let convergence: HashSet<&str> = influence
        .convergence_points
        .iter()
        .filter(|p| p.kind == NodeKind::Risk)
        .map(|p| p.node_id.as_str())
        .collect();
    let bottlenecks: HashSet<&str> = influence
        .bottlenecks
        .iter()
        .map(|b| b.risk_id.as_str())
        .collect();

    let mut by_tier = TierCoverage::default();
    let mut by_category: BTreeMap<String, GroupCoverage> = BTreeMap::new();
    let mut effectiveness = EffectivenessDistribution::default();

    let risks: Vec<RiskCoverage> = graph
        .risks
        .iter()
        .map(|node| {
            let links = graph.mitigation_links(node.index);
            let implemented_count = links
                .iter()
                .filter(|l| graph.mitigations[l.mitigation].status.is_active())
                .count();
            let proposed_count = links
                .iter()
                .filter(|l| {
                    matches!(
                        graph.mitigations[l.mitigation].status,
                        MitigationStatus::Proposed | MitigationStatus::InProgress
                    )
                })
                .count();
            for link in links {
                effectiveness.record(link.effectiveness);
            }

            let (effective_mitigation_factor, final_exposure) = exposures
                .get(node.id.as_str())
                .copied()
                .unwrap_or((1.0, node.base_exposure()));

            let status = if links.is_empty() {
                CoverageStatus::None
            } else if implemented_count == 0 {
                CoverageStatus::ProposedOnly
            } else if effective_mitigation_factor > config.well_covered_threshold {
                CoverageStatus::Partial
            } else {
                CoverageStatus::WellCovered
            };

            let id = node.id.as_str();
            let mut influence_flags = Vec::new();
            if propagators.contains(id) {
                influence_flags.push(InfluenceFlag::TopPropagator);
            }
            if convergence.contains(id) {
                influence_flags.push(InfluenceFlag::ConvergencePoint);
            }
            if bottlenecks.contains(id) {
                influence_flags.push(InfluenceFlag::Bottleneck);
            }

            let mitigated = !links.is_empty();
            match node.tier {
                RiskTier::Operational => by_tier.operational.record(mitigated),
                RiskTier::Strategic => by_tier.strategic.record(mitigated),
            }
            let categories: BTreeSet<&String> = node.categories.iter().collect();
            for category in categories {
                by_category
                    .entry(category.clone())
                    .or_default()
                    .record(mitigated);
            }

            RiskCoverage {
                risk_id: node.id.clone(),
                name: node.name.clone(),
                tier: node.tier,
                status,
                mitigation_count: links.len(),
                implemented_count,
                proposed_count,
                effective_mitigation_factor,
                final_exposure,
                high_priority_gap: status.is_gap() && !influence_flags.is_empty(),
                influence_flags,
            }
        })
        .collect();

    by_tier.operational.finish();
    by_tier.strategic.finish();
    for group in by_category.values_mut() {
        group.finish();
    }

    let total_risks = risks.len();
    let mitigated_risks = risks.iter().filter(|r| r.mitigation_count > 0).count();
    let stats = CoverageStats {
        total_risks,
        mitigated_risks,
        unmitigated_risks: total_risks - mitigated_risks,
        coverage_percent: percent(mitigated_risks, total_risks),
        total_mitigations: graph.mitigations.len(),
        total_links: graph.stats().mitigation_link_count,
    };

    let mut gaps: Vec<RiskCoverage> = risks.iter().filter(|r| r.high_priority_gap).cloned().collect();
    gaps.sort_by(|a, b| {
        by_exposure_desc(a.final_exposure, b.final_exposure).then_with(|| a.risk_id.cmp(&b.risk_id))
    });

    tracing::debug!(
        risks = total_risks,
        mitigated = mitigated_risks,
        gaps = gaps.len(),
        "Computed mitigation coverage"
    );

    CoverageReport {
        risks,
        gaps,
        stats,
        by_tier,
        by_category,
        effectiveness,
    }
}

/// What a single mitigation contributes, or `None` for an unknown id.
pub fn mitigation_impact(
    graph: &RiskGraph,
    coverage: &CoverageReport,
    mitigation_id: &str,
) -> Option<MitigationImpact> {
    let m = graph.mitigation_by_id(mitigation_id)?;
    let mitigation = &graph.mitigations[m];

    let addressed: BTreeSet<usize> = graph.mitigated_risks(m).iter().copied().collect();

    let mut risk_ids = Vec::with_capacity(addressed.len());
    let mut high_priority_risk_ids = Vec::new();
    let mut operational_count = 0;
    let mut total_final_exposure = 0.0;

    for &r in &addressed {
        let node = &graph.risks[r];
        risk_ids.push(node.id.clone());
        if node.tier == RiskTier::Operational {
            operational_count += 1;
        }
        if let Some(entry) = coverage.risks.iter().find(|c| c.risk_id == node.id) {
            total_final_exposure += entry.final_exposure.unwrap_or(0.0);
            if !entry.influence_flags.is_empty() {
                high_priority_risk_ids.push(node.id.clone());
            }
        }
    }

    Some(MitigationImpact {
        mitigation_id: mitigation.id.clone(),
        name: mitigation.name.clone(),
        mitigation_type: mitigation.mitigation_type,
        status: mitigation.status,
        operational_count,
        strategic_count: risk_ids.len() - operational_count,
        risk_ids,
        total_final_exposure,
        addresses_high_priority: !high_priority_risk_ids.is_empty(),
        high_priority_risk_ids,
    })
}

impl GroupCoverage {
    fn record(&mut self, mitigated: bool) {
        self.total += 1;
        if mitigated {
            self.mitigated += 1;
        } else {
            self.unmitigated += 1;
        }
    }

    fn finish(&mut self) {
        self.coverage_percent = percent(self.mitigated, self.total);
    }
}

impl EffectivenessDistribution {
    fn record(&mut self, effectiveness: Effectiveness) {
        match effectiveness {
            Effectiveness::Low => self.low += 1,
            Effectiveness::Medium => self.medium += 1,
            Effectiveness::High => self.high += 1,
            Effectiveness::Critical => self.critical += 1,
        }
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

/// Highest exposure first; risks without data last.
fn by_exposure_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
