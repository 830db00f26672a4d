//! Exposure calculation with upstream influence limitation.
//!
//! Per risk:
//! `final = base × (mf + (1 − mf) × limitation)` where `mf` is the product of
//! `(1 − effectiveness)` over mitigation links and `limitation` is the
//! strength-weighted average residual of upstream risks. Upstream residuals
//! depend on their own upstream, so the residuals are relaxed to a fixed
//! point in topological order; acyclic graphs need a single pass.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rim_core::config::ExposureConfig;
use rim_core::types::RiskTier;

use crate::graph::RiskGraph;
use crate::types::{
    AnalysisWarning, ExposureResult, HealthStatus, PortfolioMetrics, RiskExposure,
};

/// Compute per-risk exposure and portfolio metrics.
pub fn compute_exposure(graph: &RiskGraph, config: &ExposureConfig) -> ExposureResult {
    let n = graph.risk_count();
    let (order, acyclic) = kahn_order(graph);

    let mitigation_factors: Vec<f64> = (0..n).map(|r| mitigation_factor(graph, r)).collect();

    // residual[r] = final ÷ base, which equals the effective mitigation factor.
    let mut residual = vec![1.0_f64; n];
    let mut limitation = vec![0.0_f64; n];

    let mut iterations = 0;
    let mut max_delta = 0.0_f64;
    let mut converged = n == 0;

    while !converged && iterations < config.max_iterations {
        iterations += 1;
        max_delta = 0.0;

        for &r in &order {
            let lim = influence_limitation(graph, r, &residual);
            let mf = mitigation_factors[r];
            let updated = mf + (1.0 - mf) * lim;

            max_delta = max_delta.max((updated - residual[r]).abs());
            residual[r] = updated;
            limitation[r] = lim;
        }

        // In topological order every upstream residual is final before it is
        // read, so an acyclic graph is exact after one pass.
        converged = acyclic || max_delta < config.epsilon;
    }

    let mut warnings = Vec::new();
    if !converged {
        tracing::warn!(iterations, max_delta, "Exposure relaxation did not converge");
        warnings.push(AnalysisWarning::NonConvergence {
            iterations,
            max_delta,
        });
    }

    let risks: Vec<RiskExposure> = graph
        .risks
        .iter()
        .map(|node| {
            let r = node.index;
            let base = node.base_exposure();
            let mf = mitigation_factors[r];
            RiskExposure {
                risk_id: node.id.clone(),
                name: node.name.clone(),
                tier: node.tier,
                likelihood: node.likelihood,
                impact: node.impact,
                base_exposure: base,
                mitigation_factor: mf,
                mitigation_count: graph.mitigation_links(r).len(),
                mitigated_exposure: base.map(|b| b * mf),
                influence_limitation: limitation[r],
                effective_mitigation_factor: residual[r],
                upstream_count: graph.incoming_count(r),
                final_exposure: base.map(|b| b * residual[r]),
                residual: residual[r],
            }
        })
        .collect();

    for node in &graph.risks {
        let mut missing = Vec::new();
        if node.likelihood.is_none() {
            missing.push("likelihood".to_string());
        }
        if node.impact.is_none() {
            missing.push("impact".to_string());
        }
        if !missing.is_empty() {
            tracing::warn!(risk_id = %node.id, ?missing, "Risk excluded from exposure aggregates");
            warnings.push(AnalysisWarning::IncompleteData {
                risk_id: node.id.clone(),
                missing,
            });
        }
    }

    let metrics = portfolio_metrics(&risks);

    tracing::debug!(
        risks = n,
        iterations,
        converged,
        max_delta,
        residual_risk_percent = metrics.residual_risk_percent,
        "Computed exposure"
    );

    ExposureResult {
        risks,
        metrics,
        iterations,
        converged,
        max_delta,
        warnings,
    }
}

/// Risk processing order for relaxation.
///
/// Kahn's algorithm over influence edges, always releasing the lowest ready
/// index first. Risks left on cycles are appended in index order.
pub fn calculation_order(graph: &RiskGraph) -> Vec<usize> {
    kahn_order(graph).0
}

/// Processing order plus whether every risk was released (no cycles).
fn kahn_order(graph: &RiskGraph) -> (Vec<usize>, bool) {
    let n = graph.risk_count();
    let mut in_degree: Vec<usize> = (0..n).map(|r| graph.incoming_count(r)).collect();
    let mut placed = vec![false; n];
    let mut order = Vec::with_capacity(n);

    let mut ready: BinaryHeap<Reverse<usize>> =
        (0..n).filter(|&r| in_degree[r] == 0).map(Reverse).collect();

    while let Some(Reverse(r)) = ready.pop() {
        placed[r] = true;
        order.push(r);
        for edge in graph.outgoing(r) {
            in_degree[edge.target] -= 1;
            if in_degree[edge.target] == 0 {
                ready.push(Reverse(edge.target));
            }
        }
    }

    let acyclic = order.len() == n;
    order.extend((0..n).filter(|&r| !placed[r]));
    (order, acyclic)
}

/// ∏(1 − effectiveness) over every mitigation link of the risk.
pub fn mitigation_factor(graph: &RiskGraph, risk: usize) -> f64 {
    graph
        .mitigation_links(risk)
        .iter()
        .map(|link| link.effectiveness.remaining())
        .product()
}

/// Average of `residual(source) × strength` over incoming edges, 0 without any.
fn influence_limitation(graph: &RiskGraph, risk: usize, residual: &[f64]) -> f64 {
    let count = graph.incoming_count(risk);
    if count == 0 {
        return 0.0;
    }
    let total: f64 = graph
        .incoming(risk)
        .map(|edge| residual[edge.source] * edge.strength.score())
        .sum();
    (total / count as f64).clamp(0.0, 1.0)
}

fn portfolio_metrics(risks: &[RiskExposure]) -> PortfolioMetrics {
    let total_risks = risks.len();
    let mitigated_risks = risks.iter().filter(|r| r.mitigation_count > 0).count();

    let mut risks_with_data = 0;
    let mut total_base = 0.0;
    let mut total_final = 0.0;
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    let mut strategic = 0.0;
    let mut operational = 0.0;
    let mut max_single = 0.0;
    let mut max_id: Option<&str> = None;

    for risk in risks {
        let (Some(base), Some(fin), Some(impact)) =
            (risk.base_exposure, risk.final_exposure, risk.impact)
        else {
            continue;
        };
        risks_with_data += 1;
        total_base += base;
        total_final += fin;
        weighted_sum += fin * impact * impact;
        weight_total += impact * impact;
        match risk.tier {
            RiskTier::Strategic => strategic += fin,
            RiskTier::Operational => operational += fin,
        }
        if max_id.is_none() || fin > max_single {
            max_single = fin;
            max_id = Some(risk.risk_id.as_str());
        }
    }

    if risks_with_data == 0 {
        return PortfolioMetrics {
            no_data: true,
            residual_risk_percent: 0.0,
            weighted_risk_score: 0.0,
            max_single_exposure: 0.0,
            max_exposure_risk_id: None,
            health: None,
            total_risks,
            risks_with_data: 0,
            total_base_exposure: 0.0,
            total_final_exposure: 0.0,
            strategic_exposure: 0.0,
            operational_exposure: 0.0,
            mitigated_risks,
            unmitigated_risks: total_risks - mitigated_risks,
        };
    }

    let residual_risk_percent = if total_base > 0.0 {
        100.0 * total_final / total_base
    } else {
        0.0
    };
    let weighted_risk_score = if weight_total > 0.0 {
        weighted_sum / weight_total
    } else {
        0.0
    };

    PortfolioMetrics {
        no_data: false,
        residual_risk_percent,
        weighted_risk_score,
        max_single_exposure: max_single,
        max_exposure_risk_id: max_id.map(str::to_string),
        health: Some(HealthStatus::from_score(weighted_risk_score)),
        total_risks,
        risks_with_data,
        total_base_exposure: total_base,
        total_final_exposure: total_final,
        strategic_exposure: strategic,
        operational_exposure: operational,
        mitigated_risks,
        unmitigated_risks: total_risks - mitigated_risks,
    }
}
