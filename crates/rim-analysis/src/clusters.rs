//! Dense risk clusters over the undirected influence graph.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use rim_core::types::RiskTier;

use crate::graph::RiskGraph;
use crate::types::RiskCluster;

const MIXED_CATEGORY: &str = "Mixed";

/// Connected components (size ≥ 2) whose density
/// `edges / (n(n-1)/2)` is at least `min_density`.
///
/// Direction and parallel edges are ignored.
pub fn risk_clusters(graph: &RiskGraph, min_density: f64) -> Vec<RiskCluster> {
    let n = graph.risk_count();
    let mut neighbors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
    for edge in &graph.influences {
        neighbors[edge.source].insert(edge.target);
        neighbors[edge.target].insert(edge.source);
    }

    let mut seen = vec![false; n];
    let mut clusters = Vec::new();

    for start in 0..n {
        if seen[start] {
            continue;
        }
        seen[start] = true;

        let mut members = vec![start];
        let mut queue = VecDeque::from([start]);
        while let Some(risk) = queue.pop_front() {
            for &next in &neighbors[risk] {
                if !seen[next] {
                    seen[next] = true;
                    members.push(next);
                    queue.push_back(next);
                }
            }
        }

        let size = members.len();
        if size < 2 {
            continue;
        }

        let edge_count = members.iter().map(|&m| neighbors[m].len()).sum::<usize>() / 2;
        let possible = size * (size - 1) / 2;
        let density = edge_count as f64 / possible as f64;
        if density < min_density {
            continue;
        }

        clusters.push(describe(graph, &members, edge_count, density));
    }

    clusters.sort_by(|a, b| {
        b.size
            .cmp(&a.size)
            .then_with(|| b.density.partial_cmp(&a.density).unwrap_or(Ordering::Equal))
            .then_with(|| a.risk_ids.cmp(&b.risk_ids))
    });

    tracing::debug!(clusters = clusters.len(), min_density, "Detected risk clusters");
    clusters
}

fn describe(graph: &RiskGraph, members: &[usize], edge_count: usize, density: f64) -> RiskCluster {
    let mut risk_ids: Vec<String> = members.iter().map(|&m| graph.risks[m].id.clone()).collect();
    risk_ids.sort();

    let operational_count = members
        .iter()
        .filter(|&&m| graph.risks[m].tier == RiskTier::Operational)
        .count();

    RiskCluster {
        risk_ids,
        size: members.len(),
        edge_count,
        density,
        operational_count,
        strategic_count: members.len() - operational_count,
        primary_category: primary_category(graph, members),
    }
}

/// Most frequent category among members, ties alphabetical.
fn primary_category(graph: &RiskGraph, members: &[usize]) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for &m in members {
        let distinct: BTreeSet<&str> = graph.risks[m].categories.iter().map(String::as_str).collect();
        for category in distinct {
            *counts.entry(category).or_insert(0) += 1;
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (category, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((category, count));
        }
    }

    best.map_or_else(|| MIXED_CATEGORY.to_string(), |(c, _)| c.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::*;
    use rim_core::types::*;

    fn tagged(mut record: RiskRecord, categories: &[&str]) -> RiskRecord {
        record.categories = categories.iter().map(|c| c.to_string()).collect();
        record
    }

    fn two_components() -> GraphInput {
        GraphInput {
            risks: vec![
                tagged(op("a"), &["Supply Chain"]),
                tagged(op("b"), &["Supply Chain", "Programme"]),
                tagged(strat("c"), &["Programme"]),
                op("d"),
                op("e"),
                op("f"),
                op("g"),
                op("lonely"),
            ],
            influences: vec![
                // Triangle a, b, c (density 1.0), with a parallel reverse edge.
                influence("a", "b", InfluenceStrength::Strong),
                influence("b", "c", InfluenceStrength::Weak),
                influence("c", "a", InfluenceStrength::Weak),
                influence("b", "a", InfluenceStrength::Weak),
                // Chain d - e - f - g (3 of 6 edges, density 0.5).
                influence("d", "e", InfluenceStrength::Weak),
                influence("e", "f", InfluenceStrength::Weak),
                influence("f", "g", InfluenceStrength::Weak),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_components_and_density() {
        let graph = RiskGraph::build(&two_components()).unwrap();
        let clusters = risk_clusters(&graph, 0.5);

        assert_eq!(clusters.len(), 2);
        // Larger cluster first.
        assert_eq!(clusters[0].risk_ids, vec!["d", "e", "f", "g"]);
        assert_eq!(clusters[0].edge_count, 3);
        assert!((clusters[0].density - 0.5).abs() < 1e-9);

        assert_eq!(clusters[1].risk_ids, vec!["a", "b", "c"]);
        assert_eq!(clusters[1].edge_count, 3);
        assert!((clusters[1].density - 1.0).abs() < 1e-9);
        assert_eq!(clusters[1].operational_count, 2);
        assert_eq!(clusters[1].strategic_count, 1);
    }

    #[test]
    fn test_density_threshold() {
        let graph = RiskGraph::build(&two_components()).unwrap();
        let clusters = risk_clusters(&graph, 0.6);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].size, 3);
    }

    #[test]
    fn test_primary_category() {
        let graph = RiskGraph::build(&two_components()).unwrap();
        let clusters = risk_clusters(&graph, 0.5);
        // Programme and Supply Chain tie at 2; alphabetical wins.
        assert_eq!(clusters[1].primary_category, "Programme");
        assert_eq!(clusters[0].primary_category, "Mixed");
    }

    #[test]
    fn test_singletons_excluded() {
        let graph = RiskGraph::build(&GraphInput {
            risks: vec![op("x"), op("y")],
            ..Default::default()
        })
        .unwrap();
        assert!(risk_clusters(&graph, 0.0).is_empty());
    }
}
