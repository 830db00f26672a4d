//! Downstream propagation scoring.
//!
//! BFS from each risk over outgoing influence edges. Every edge that reaches
//! a not-yet-visited risk contributes `strength × decay^hop`, where `hop` is
//! the depth of the edge's source (0 for edges leaving the root).

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use rim_core::config::InfluenceConfig;

use crate::graph::RiskGraph;
use crate::paths::describe_chain;
use crate::types::{CriticalPath, Propagator};

/// Supporting chains kept per propagator.
const SUPPORTING_PATHS: usize = 3;

/// What a single root reaches.
#[derive(Debug, Clone, PartialEq)]
pub struct Reach {
    pub score: f64,
    /// Risks reached, in BFS order (root excluded).
    pub risks: Vec<usize>,
    /// BFS tree: reached risk -> (parent risk, ∏ strengths from the root).
    pub via: HashMap<usize, (usize, f64)>,
}

impl Reach {
    /// Risk indices from the root down to `risk` along the BFS tree.
    pub fn chain_to(&self, root: usize, risk: usize) -> Vec<usize> {
        let mut chain = vec![risk];
        let mut current = risk;
        while current != root {
            match self.via.get(&current) {
                Some(&(parent, _)) => {
                    chain.push(parent);
                    current = parent;
                }
                None => break,
            }
        }
        chain.reverse();
        chain
    }

    /// ∏ influence strengths from the root to `risk` (1.0 for the root).
    pub fn chain_strength(&self, risk: usize) -> f64 {
        self.via.get(&risk).map_or(1.0, |&(_, strength)| strength)
    }
}

/// Propagation score of one root risk.
pub fn propagation_score(graph: &RiskGraph, root: usize, max_depth: usize, decay: f64) -> Reach {
    let mut visited = HashSet::new();
    visited.insert(root);

    let mut score = 0.0;
    let mut reached = Vec::new();
    let mut via = HashMap::new();

    // BFS queue: (risk_index, hops, ∏ strengths so far)
    let mut queue: VecDeque<(usize, usize, f64)> = VecDeque::new();
    queue.push_back((root, 0, 1.0));

    while let Some((risk, hops, strength)) = queue.pop_front() {
        if hops >= max_depth {
            continue;
        }

        for edge in graph.outgoing(risk) {
            if !visited.insert(edge.target) {
                continue;
            }
            let carried = strength * edge.strength.score();
            score += edge.strength.score() * decay.powi(hops as i32);
            reached.push(edge.target);
            via.insert(edge.target, (risk, carried));
            queue.push_back((edge.target, hops + 1, carried));
        }
    }

    Reach {
        score,
        risks: reached,
        via,
    }
}

/// Fewest-hop chain from the root to each objective it reaches, strongest first.
///
/// Each objective is credited to the first impacting risk met in BFS order.
fn supporting_paths(graph: &RiskGraph, root: usize, reach: &Reach) -> Vec<CriticalPath> {
    let mut seen = HashSet::new();
    let mut chains: Vec<CriticalPath> = std::iter::once(root)
        .chain(reach.risks.iter().copied())
        .flat_map(move |r| graph.impacts_from(r))
        .filter(|impact| seen.insert(impact.objective))
        .map(|impact| {
            describe_chain(
                graph,
                &reach.chain_to(root, impact.risk),
                impact.objective,
                reach.chain_strength(impact.risk) * impact.level.score(),
            )
        })
        .collect();

    chains.sort_by(|a, b| {
        b.strength
            .partial_cmp(&a.strength)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.objective_id.cmp(&b.objective_id))
    });
    chains.truncate(SUPPORTING_PATHS);
    chains
}

/// Risks ranked by how far and how strongly they propagate downstream.
///
/// Zero-score risks (no outgoing influence) are omitted.
pub fn top_propagators(graph: &RiskGraph, config: &InfluenceConfig) -> Vec<Propagator> {
    let mut ranked: Vec<Propagator> = graph
        .risks
        .iter()
        .filter_map(|node| {
            let reach = propagation_score(graph, node.index, config.max_depth, config.decay);
            if reach.score <= 0.0 {
                return None;
            }

            let objectives: BTreeSet<&str> = std::iter::once(node.index)
                .chain(reach.risks.iter().copied())
                .flat_map(move |r| graph.impacts_from(r))
                .map(|impact| graph.objectives[impact.objective].id.as_str())
                .collect();

            Some(Propagator {
                risk_id: node.id.clone(),
                name: node.name.clone(),
                tier: node.tier,
                score: reach.score,
                risks_reached: reach.risks.len(),
                objectives_reached: objectives.into_iter().map(str::to_string).collect(),
                supporting_paths: supporting_paths(graph, node.index, &reach),
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.risk_id.cmp(&b.risk_id))
    });
    ranked.truncate(config.propagator_limit);

    tracing::debug!(
        candidates = graph.risk_count(),
        returned = ranked.len(),
        max_depth = config.max_depth,
        "Ranked top propagators"
    );
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::*;
    use rim_core::types::*;

    /// A --Strong--> B --Moderate--> C
    fn chain() -> RiskGraph {
        RiskGraph::build(&GraphInput {
            risks: vec![op("A"), op("B"), strat("C")],
            objectives: vec![objective("t1")],
            influences: vec![
                influence("A", "B", InfluenceStrength::Strong),
                influence("B", "C", InfluenceStrength::Moderate),
            ],
            objective_impacts: vec![impact("C", "t1", ImpactLevel::High)],
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_chain_scores() {
        let graph = chain();
        let a = propagation_score(&graph, 0, 2, 0.85);
        let b = propagation_score(&graph, 1, 2, 0.85);
        let c = propagation_score(&graph, 2, 2, 0.85);

        assert!((a.score - 1.175).abs() < 1e-9);
        assert_eq!(a.risks, vec![1, 2]);
        assert!((b.score - 0.50).abs() < 1e-9);
        assert_eq!(c.score, 0.0);
        assert!(c.risks.is_empty());
    }

    #[test]
    fn test_depth_limit() {
        let graph = chain();
        let a = propagation_score(&graph, 0, 1, 0.85);
        assert!((a.score - 0.75).abs() < 1e-9);
        assert_eq!(a.risks, vec![1]);

        let none = propagation_score(&graph, 0, 0, 0.85);
        assert_eq!(none.score, 0.0);
    }

    #[test]
    fn test_ranking_omits_sinks() {
        let graph = chain();
        let config = InfluenceConfig {
            max_depth: 2,
            ..Default::default()
        };
        let ranked = top_propagators(&graph, &config);

        let ids: Vec<_> = ranked.iter().map(|p| p.risk_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(ranked[0].risks_reached, 2);
        assert_eq!(ranked[0].objectives_reached, vec!["t1".to_string()]);
    }

    #[test]
    fn test_supporting_path_follows_bfs_tree() {
        let graph = chain();
        let config = InfluenceConfig {
            max_depth: 2,
            ..Default::default()
        };
        let ranked = top_propagators(&graph, &config);

        let a = &ranked[0].supporting_paths;
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].risk_ids, vec!["A", "B", "C"]);
        assert_eq!(a[0].objective_id, "t1");
        assert_eq!(a[0].objective_reference, "T1");
        assert_eq!(a[0].length, 3);
        // Strong × Moderate × High
        assert!((a[0].strength - 0.75 * 0.5 * 0.75).abs() < 1e-9);

        // Below the depth limit the objective is not reached at all.
        let shallow = InfluenceConfig {
            max_depth: 1,
            ..Default::default()
        };
        let ranked = top_propagators(&graph, &shallow);
        assert!(ranked.iter().all(|p| p.supporting_paths.is_empty()));
    }

    #[test]
    fn test_supporting_paths_capped_and_ordered() {
        let graph = RiskGraph::build(&GraphInput {
            risks: vec![op("root"), op("x")],
            objectives: vec![
                objective("t1"),
                objective("t2"),
                objective("t3"),
                objective("t4"),
            ],
            influences: vec![influence("root", "x", InfluenceStrength::Critical)],
            objective_impacts: vec![
                impact("root", "t4", ImpactLevel::Low),
                impact("x", "t1", ImpactLevel::Medium),
                impact("x", "t2", ImpactLevel::Critical),
                impact("x", "t3", ImpactLevel::Medium),
                // Already credited via root's own impact.
                impact("x", "t4", ImpactLevel::Critical),
            ],
            ..Default::default()
        })
        .unwrap();
        let ranked = top_propagators(&graph, &InfluenceConfig::default());
        let root = ranked.iter().find(|p| p.risk_id == "root").unwrap();

        assert_eq!(root.objectives_reached.len(), 4);
        let targets: Vec<_> = root
            .supporting_paths
            .iter()
            .map(|p| p.objective_id.as_str())
            .collect();
        assert_eq!(targets, vec!["t2", "t1", "t3"]);
        assert_eq!(root.supporting_paths[0].risk_ids, vec!["root", "x"]);
    }

    #[test]
    fn test_cycle_terminates() {
        let graph = RiskGraph::build(&GraphInput {
            risks: vec![op("a"), op("b"), op("c")],
            influences: vec![
                influence("a", "b", InfluenceStrength::Critical),
                influence("b", "c", InfluenceStrength::Critical),
                influence("c", "a", InfluenceStrength::Critical),
            ],
            ..Default::default()
        })
        .unwrap();

        // Root is pre-visited, so the closing edge back to it adds nothing.
        let a = propagation_score(&graph, 0, 10, 0.5);
        assert!((a.score - 1.5).abs() < 1e-9);
        assert_eq!(a.risks.len(), 2);
    }

    #[test]
    fn test_parallel_edges_count_once() {
        let graph = RiskGraph::build(&GraphInput {
            risks: vec![op("a"), op("b")],
            influences: vec![
                influence("a", "b", InfluenceStrength::Weak),
                influence("a", "b", InfluenceStrength::Critical),
            ],
            ..Default::default()
        })
        .unwrap();
        let a = propagation_score(&graph, 0, 5, 0.85);
        assert!((a.score - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_ties_broken_by_id_and_limit() {
        let graph = RiskGraph::build(&GraphInput {
            risks: vec![op("z"), op("y"), op("x"), strat("s")],
            influences: vec![
                influence("z", "s", InfluenceStrength::Strong),
                influence("y", "s", InfluenceStrength::Strong),
                influence("x", "s", InfluenceStrength::Strong),
            ],
            ..Default::default()
        })
        .unwrap();
        let config = InfluenceConfig {
            propagator_limit: 2,
            ..Default::default()
        };
        let ids: Vec<_> = top_propagators(&graph, &config)
            .into_iter()
            .map(|p| p.risk_id)
            .collect();
        assert_eq!(ids, vec!["x".to_string(), "y".to_string()]);
    }
}
