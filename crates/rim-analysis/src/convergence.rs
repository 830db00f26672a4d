//! Convergence points: nodes where several influences land.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::graph::RiskGraph;
use crate::types::{ConvergencePoint, NodeKind};

/// Risks and objectives with at least two incoming edges, ranked by
/// `incoming_count × average incoming strength`.
///
/// Risk candidates count influence edges. Objective candidates count
/// objective-impact edges, weighted by impact level.
pub fn convergence_points(graph: &RiskGraph, limit: usize) -> Vec<ConvergencePoint> {
    let mut points = Vec::new();

    for node in &graph.risks {
        let weights: Vec<(usize, f64)> = graph
            .incoming(node.index)
            .map(|edge| (edge.source, edge.strength.score()))
            .collect();
        if let Some(point) = score_point(&node.id, &node.name, NodeKind::Risk, &weights) {
            points.push(point);
        }
    }

    for node in &graph.objectives {
        let weights: Vec<(usize, f64)> = graph
            .impacts_into(node.index)
            .map(|impact| (impact.risk, impact.level.score()))
            .collect();
        if let Some(point) = score_point(&node.id, &node.name, NodeKind::Objective, &weights) {
            points.push(point);
        }
    }

    points.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.node_id.cmp(&b.node_id))
    });
    points.truncate(limit);

    tracing::debug!(returned = points.len(), "Ranked convergence points");
    points
}

/// `weights` holds one `(source_risk, weight)` pair per incoming edge.
fn score_point(
    id: &str,
    name: &str,
    kind: NodeKind,
    weights: &[(usize, f64)],
) -> Option<ConvergencePoint> {
    if weights.len() < 2 {
        return None;
    }

    let total: f64 = weights.iter().map(|&(_, w)| w).sum();
    let average_strength = total / weights.len() as f64;
    let sources: HashSet<usize> = weights.iter().map(|&(s, _)| s).collect();

    Some(ConvergencePoint {
        node_id: id.to_string(),
        name: name.to_string(),
        kind,
        score: weights.len() as f64 * average_strength,
        incoming_count: weights.len(),
        source_count: sources.len(),
        average_strength,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::*;
    use rim_core::types::*;

    fn fan_in() -> RiskGraph {
        RiskGraph::build(&GraphInput {
            risks: vec![op("a"), op("b"), op("c"), strat("hub"), strat("pair")],
            objectives: vec![objective("t1"), objective("t2")],
            influences: vec![
                influence("a", "hub", InfluenceStrength::Strong),
                influence("b", "hub", InfluenceStrength::Moderate),
                influence("c", "hub", InfluenceStrength::Weak),
                influence("a", "pair", InfluenceStrength::Critical),
                influence("a", "pair", InfluenceStrength::Critical),
                influence("hub", "c", InfluenceStrength::Weak),
            ],
            objective_impacts: vec![
                impact("hub", "t1", ImpactLevel::Critical),
                impact("pair", "t1", ImpactLevel::High),
                impact("pair", "t2", ImpactLevel::Low),
            ],
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_scores_and_ordering() {
        let points = convergence_points(&fan_in(), 10);
        let ids: Vec<_> = points.iter().map(|p| p.node_id.as_str()).collect();
        // pair 2.0, t1 1.75, hub 1.5
        assert_eq!(ids, vec!["pair", "t1", "hub"]);

        let hub = &points[2];
        assert!((hub.score - 1.5).abs() < 1e-9);
        assert!((hub.average_strength - 0.5).abs() < 1e-9);
        assert_eq!(hub.incoming_count, 3);
        assert_eq!(hub.kind, NodeKind::Risk);
    }

    #[test]
    fn test_parallel_edges_share_a_source() {
        let points = convergence_points(&fan_in(), 10);
        let pair = points.iter().find(|p| p.node_id == "pair").unwrap();
        assert_eq!(pair.incoming_count, 2);
        assert_eq!(pair.source_count, 1);
    }

    #[test]
    fn test_objectives_are_candidates() {
        let points = convergence_points(&fan_in(), 10);
        let t1 = points.iter().find(|p| p.node_id == "t1").unwrap();
        assert_eq!(t1.kind, NodeKind::Objective);
        assert!((t1.score - 1.75).abs() < 1e-9);
        assert_eq!(t1.source_count, 2);
        // Single-impact objective is not a convergence point.
        assert!(points.iter().all(|p| p.node_id != "t2"));
    }

    #[test]
    fn test_limit_and_empty() {
        assert_eq!(convergence_points(&fan_in(), 1).len(), 1);
        let empty = RiskGraph::build(&GraphInput::default()).unwrap();
        assert!(convergence_points(&empty, 10).is_empty());
    }
}
