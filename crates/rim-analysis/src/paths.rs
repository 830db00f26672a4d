//! Risk → objective chain enumeration, critical paths and bottlenecks.
//!
//! Chains start at an operational risk, follow zero or more influence edges
//! through distinct risks, and end with one objective-impact edge. The sample
//! is bounded by a hop limit, a path cap and a budget of expanded states.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::graph::RiskGraph;
use crate::types::{Bottleneck, CriticalPath};
use rim_core::types::RiskTier;

/// A raw chain through the in-memory graph.
#[derive(Debug, Clone)]
pub struct RawPath {
    /// Risk indices along the chain, origin first.
    pub risks: Vec<usize>,
    /// Objective index reached by the final impact edge.
    pub objective: usize,
    /// ∏ influence strengths × impact score.
    pub strength: f64,
}

/// Enumerated chains plus whether the cap cut enumeration short.
#[derive(Debug, Clone, Default)]
pub struct PathSample {
    pub paths: Vec<RawPath>,
    pub truncated: bool,
}

/// DFS states popped per allowed path before enumeration gives up.
const EXPANSIONS_PER_PATH: usize = 20;

/// Enumerate simple chains from every operational risk using DFS.
///
/// At most `max_path_length` influence hops per chain and `max_paths` chains
/// overall. States that can no longer reach an objective-impacting risk are
/// never pushed, and the walk stops after `max_paths × 20` popped states.
/// Either cap sets `truncated`.
pub fn enumerate_paths(graph: &RiskGraph, max_path_length: usize, max_paths: usize) -> PathSample {
    let mut paths = Vec::new();
    let mut truncated = false;

    let productive = reaches_objective(graph);
    let budget = max_paths.saturating_mul(EXPANSIONS_PER_PATH);
    let mut expanded = 0_usize;

    let sources = graph
        .risks
        .iter()
        .filter(|node| node.tier == RiskTier::Operational && productive[node.index])
        .map(|node| node.index);

    'sources: for source in sources {
        let mut stack: Vec<DfsState> = vec![DfsState {
            risk: source,
            path: vec![source],
            strength: 1.0,
            visited: {
                let mut s = HashSet::new();
                s.insert(source);
                s
            },
        }];

        while let Some(state) = stack.pop() {
            if expanded >= budget {
                truncated = true;
                break 'sources;
            }
            expanded += 1;

            for impact in graph.impacts_from(state.risk) {
                if paths.len() >= max_paths {
                    truncated = true;
                    break 'sources;
                }
                paths.push(RawPath {
                    risks: state.path.clone(),
                    objective: impact.objective,
                    strength: state.strength * impact.level.score(),
                });
            }

            // Hops so far = risks on the path minus the origin.
            if state.path.len() > max_path_length {
                continue;
            }

            for edge in graph.outgoing(state.risk) {
                if !productive[edge.target] || state.visited.contains(&edge.target) {
                    continue;
                }

                let mut new_visited = state.visited.clone();
                new_visited.insert(edge.target);

                let mut new_path = state.path.clone();
                new_path.push(edge.target);

                stack.push(DfsState {
                    risk: edge.target,
                    path: new_path,
                    strength: state.strength * edge.strength.score(),
                    visited: new_visited,
                });
            }
        }
    }

    if truncated {
        tracing::warn!(max_paths, expanded, "Path enumeration hit its cap");
    }
    tracing::debug!(paths = paths.len(), expanded, truncated, "Enumerated risk chains");

    PathSample { paths, truncated }
}

/// `true` for every risk with a directed route (possibly empty) to a risk
/// that impacts an objective. Reverse BFS from the impacting risks.
fn reaches_objective(graph: &RiskGraph) -> Vec<bool> {
    let mut productive = vec![false; graph.risk_count()];
    let mut queue: VecDeque<usize> = VecDeque::new();

    for impact in &graph.impacts {
        if !productive[impact.risk] {
            productive[impact.risk] = true;
            queue.push_back(impact.risk);
        }
    }

    while let Some(risk) = queue.pop_front() {
        for source in graph.upstream(risk) {
            if !productive[source] {
                productive[source] = true;
                queue.push_back(source);
            }
        }
    }

    productive
}

/// Public form of one chain.
pub(crate) fn describe_chain(
    graph: &RiskGraph,
    risks: &[usize],
    objective: usize,
    strength: f64,
) -> CriticalPath {
    let target = &graph.objectives[objective];
    CriticalPath {
        risk_ids: risks.iter().map(|&r| graph.risks[r].id.clone()).collect(),
        objective_id: target.id.clone(),
        objective_reference: target.reference.clone(),
        strength,
        length: risks.len(),
    }
}

/// Strongest chains, ties broken by the node-id sequence.
pub fn critical_paths(graph: &RiskGraph, sample: &PathSample, limit: usize) -> Vec<CriticalPath> {
    let mut ranked: Vec<CriticalPath> = sample
        .paths
        .iter()
        .map(|raw| describe_chain(graph, &raw.risks, raw.objective, raw.strength))
        .collect();

    ranked.sort_by(|a, b| {
        b.strength
            .partial_cmp(&a.strength)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.risk_ids.cmp(&b.risk_ids))
            .then_with(|| a.objective_id.cmp(&b.objective_id))
    });
    ranked.truncate(limit);
    ranked
}

/// Risks that many chains pass through after their origin.
///
/// `score = (paths_containing / total_paths) × average strength of those paths`.
pub fn bottlenecks(graph: &RiskGraph, sample: &PathSample, limit: usize) -> Vec<Bottleneck> {
    let total = sample.paths.len();
    if total == 0 {
        return Vec::new();
    }

    // risk_index -> (path_count, strength_sum)
    let mut tallies: HashMap<usize, (usize, f64)> = HashMap::new();
    for path in &sample.paths {
        for &risk in path.risks.iter().skip(1) {
            let entry = tallies.entry(risk).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += path.strength;
        }
    }

    let mut ranked: Vec<Bottleneck> = tallies
        .into_iter()
        .map(|(risk, (count, strength_sum))| {
            let node = &graph.risks[risk];
            let average_strength = strength_sum / count as f64;
            let share = count as f64 / total as f64;
            Bottleneck {
                risk_id: node.id.clone(),
                name: node.name.clone(),
                tier: node.tier,
                score: share * average_strength,
                path_count: count,
                total_paths: total,
                percentage: 100.0 * share,
                average_strength,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.risk_id.cmp(&b.risk_id))
    });
    ranked.truncate(limit);
    ranked
}

/// Internal DFS state for chain enumeration.
struct DfsState {
    risk: usize,
    path: Vec<usize>,
    strength: f64,
    visited: HashSet<usize>,
}
