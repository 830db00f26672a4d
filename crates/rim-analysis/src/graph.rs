//! In-memory risk graph for the analyzers.
//!
//! Converts the flat records from the persistence layer into index-based
//! arenas (risks, mitigations, objectives) plus edge arenas and adjacency
//! lists holding edge indices. Nothing here is mutated after `build`, so one
//! graph can be shared read-only across analyses.

use std::collections::{HashMap, HashSet};

use rim_core::types::{
    Effectiveness, GraphInput, ImpactLevel, InfluenceStrength, MitigationStatus, MitigationType,
    RiskTier,
};

use crate::error::StructuralError;
use crate::types::GraphStats;

const MAX_SCALE: f64 = 10.0;

/// A risk in the arena.
#[derive(Debug, Clone)]
pub struct RiskNode {
    /// Dense index (0..N-1).
    pub index: usize,
    pub id: String,
    pub name: String,
    pub tier: RiskTier,
    pub likelihood: Option<f64>,
    pub impact: Option<f64>,
    pub categories: Vec<String>,
}

impl RiskNode {
    /// Likelihood × impact, or `None` if either is unassessed.
    pub fn base_exposure(&self) -> Option<f64> {
        match (self.likelihood, self.impact) {
            (Some(l), Some(i)) => Some(l * i),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MitigationNode {
    pub index: usize,
    pub id: String,
    pub name: String,
    pub mitigation_type: MitigationType,
    pub status: MitigationStatus,
}

#[derive(Debug, Clone)]
pub struct ObjectiveNode {
    pub index: usize,
    pub id: String,
    pub reference: String,
    pub name: String,
}

/// A directed risk → risk influence.
#[derive(Debug, Clone)]
pub struct InfluenceEdge {
    pub source: usize,
    pub target: usize,
    pub strength: InfluenceStrength,
}

/// A mitigation applied to a risk, as seen from the risk.
#[derive(Debug, Clone, Copy)]
pub struct MitigationLink {
    pub mitigation: usize,
    pub effectiveness: Effectiveness,
}

/// A risk → objective impact.
#[derive(Debug, Clone)]
pub struct ObjectiveImpact {
    pub risk: usize,
    pub objective: usize,
    pub level: ImpactLevel,
}

/// The analysis graph.
pub struct RiskGraph {
    pub risks: Vec<RiskNode>,
    pub mitigations: Vec<MitigationNode>,
    pub objectives: Vec<ObjectiveNode>,
    pub influences: Vec<InfluenceEdge>,
    pub impacts: Vec<ObjectiveImpact>,
    /// `outgoing[r]` = indices into `influences` whose source is risk `r`.
    outgoing: Vec<Vec<usize>>,
    /// `incoming[r]` = indices into `influences` whose target is risk `r`.
    incoming: Vec<Vec<usize>>,
    mitigated_by: Vec<Vec<MitigationLink>>,
    /// `mitigated_risks[m]` = risk indices linked to mitigation `m`.
    mitigated_risks: Vec<Vec<usize>>,
    impacts_from: Vec<Vec<usize>>,
    impacts_into: Vec<Vec<usize>>,
    risk_index: HashMap<String, usize>,
    mitigation_index: HashMap<String, usize>,
    objective_index: HashMap<String, usize>,
}

impl RiskGraph {
    /// Build and validate the graph.
    ///
    /// Fails on the first edge that references an unknown node, duplicate
    /// identifiers, influence self-loops, or out-of-range numeric fields.
    pub fn build(input: &GraphInput) -> Result<Self, StructuralError> {
        let mut seen: HashSet<&str> = HashSet::new();

        let mut risks = Vec::with_capacity(input.risks.len());
        let mut risk_index = HashMap::with_capacity(input.risks.len());
        for (i, record) in input.risks.iter().enumerate() {
            claim(&mut seen, &record.id)?;
            check_scale(&record.id, "likelihood", record.likelihood)?;
            check_scale(&record.id, "impact", record.impact)?;
            risk_index.insert(record.id.clone(), i);
            risks.push(RiskNode {
                index: i,
                id: record.id.clone(),
                name: record.name.clone(),
                tier: record.tier,
                likelihood: record.likelihood,
                impact: record.impact,
                categories: record.categories.clone(),
            });
        }

        let mut mitigations = Vec::with_capacity(input.mitigations.len());
        let mut mitigation_index = HashMap::with_capacity(input.mitigations.len());
        for (i, record) in input.mitigations.iter().enumerate() {
            claim(&mut seen, &record.id)?;
            mitigation_index.insert(record.id.clone(), i);
            mitigations.push(MitigationNode {
                index: i,
                id: record.id.clone(),
                name: record.name.clone(),
                mitigation_type: record.mitigation_type,
                status: record.status,
            });
        }

        let mut objectives = Vec::with_capacity(input.objectives.len());
        let mut objective_index = HashMap::with_capacity(input.objectives.len());
        for (i, record) in input.objectives.iter().enumerate() {
            claim(&mut seen, &record.id)?;
            objective_index.insert(record.id.clone(), i);
            objectives.push(ObjectiveNode {
                index: i,
                id: record.id.clone(),
                reference: record.reference.clone(),
                name: record.name.clone(),
            });
        }

        let mut influences = Vec::with_capacity(input.influences.len());
        let mut outgoing = vec![Vec::new(); risks.len()];
        let mut incoming = vec![Vec::new(); risks.len()];
        for record in &input.influences {
            let source = resolve(&risk_index, &record.source_id, "Influence", "risk")?;
            let target = resolve(&risk_index, &record.target_id, "Influence", "risk")?;
            if source == target {
                return Err(StructuralError::SelfLoop {
                    risk_id: record.source_id.clone(),
                });
            }
            if !(record.confidence.is_finite() && (0.0..=1.0).contains(&record.confidence)) {
                return Err(StructuralError::InvalidValue {
                    node_id: record.source_id.clone(),
                    field: "confidence",
                    value: record.confidence,
                    expected: "0.0 to 1.0",
                });
            }

            let edge = influences.len();
            outgoing[source].push(edge);
            incoming[target].push(edge);
            influences.push(InfluenceEdge {
                source,
                target,
                strength: record.strength,
            });
        }

        let mut mitigated_by = vec![Vec::new(); risks.len()];
        let mut mitigated_risks = vec![Vec::new(); mitigations.len()];
        for record in &input.mitigates {
            let mitigation =
                resolve(&mitigation_index, &record.mitigation_id, "Mitigates", "mitigation")?;
            let risk = resolve(&risk_index, &record.risk_id, "Mitigates", "risk")?;
            mitigated_by[risk].push(MitigationLink {
                mitigation,
                effectiveness: record.effectiveness,
            });
            mitigated_risks[mitigation].push(risk);
        }

        let mut impacts = Vec::with_capacity(input.objective_impacts.len());
        let mut impacts_from = vec![Vec::new(); risks.len()];
        let mut impacts_into = vec![Vec::new(); objectives.len()];
        for record in &input.objective_impacts {
            let risk = resolve(&risk_index, &record.risk_id, "ObjectiveImpact", "risk")?;
            let objective =
                resolve(&objective_index, &record.objective_id, "ObjectiveImpact", "objective")?;
            let edge = impacts.len();
            impacts_from[risk].push(edge);
            impacts_into[objective].push(edge);
            impacts.push(ObjectiveImpact {
                risk,
                objective,
                level: record.impact_level,
            });
        }

        tracing::debug!(
            risks = risks.len(),
            mitigations = mitigations.len(),
            objectives = objectives.len(),
            influences = influences.len(),
            impacts = impacts.len(),
            "Built risk graph"
        );

        Ok(Self {
            risks,
            mitigations,
            objectives,
            influences,
            impacts,
            outgoing,
            incoming,
            mitigated_by,
            mitigated_risks,
            impacts_from,
            impacts_into,
            risk_index,
            mitigation_index,
            objective_index,
        })
    }

    /// Number of risk nodes.
    pub fn risk_count(&self) -> usize {
        self.risks.len()
    }

    /// Outgoing influence edges of a risk, in input order.
    pub fn outgoing(&self, risk: usize) -> impl Iterator<Item = &InfluenceEdge> + '_ {
        self.outgoing[risk].iter().map(move |&e| &self.influences[e])
    }

    /// Incoming influence edges of a risk, in input order.
    pub fn incoming(&self, risk: usize) -> impl Iterator<Item = &InfluenceEdge> + '_ {
        self.incoming[risk].iter().map(move |&e| &self.influences[e])
    }

    pub fn incoming_count(&self, risk: usize) -> usize {
        self.incoming[risk].len()
    }

    /// Upstream risks (reverse adjacency), one entry per incoming edge.
    pub fn upstream(&self, risk: usize) -> impl Iterator<Item = usize> + '_ {
        self.incoming(risk).map(|e| e.source)
    }

    /// Mitigation links applied to a risk.
    pub fn mitigation_links(&self, risk: usize) -> &[MitigationLink] {
        &self.mitigated_by[risk]
    }

    /// Risks a mitigation is linked to, one entry per link.
    pub fn mitigated_risks(&self, mitigation: usize) -> &[usize] {
        &self.mitigated_risks[mitigation]
    }

    /// Objective impacts originating at a risk.
    pub fn impacts_from(&self, risk: usize) -> impl Iterator<Item = &ObjectiveImpact> + '_ {
        self.impacts_from[risk].iter().map(move |&e| &self.impacts[e])
    }

    /// Objective impacts landing on an objective.
    pub fn impacts_into(&self, objective: usize) -> impl Iterator<Item = &ObjectiveImpact> + '_ {
        self.impacts_into[objective].iter().map(move |&e| &self.impacts[e])
    }

    pub fn risk_by_id(&self, id: &str) -> Option<usize> {
        self.risk_index.get(id).copied()
    }

    pub fn mitigation_by_id(&self, id: &str) -> Option<usize> {
        self.mitigation_index.get(id).copied()
    }

    pub fn objective_by_id(&self, id: &str) -> Option<usize> {
        self.objective_index.get(id).copied()
    }

    /// Node and edge counts per kind.
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            risk_count: self.risks.len(),
            mitigation_count: self.mitigations.len(),
            objective_count: self.objectives.len(),
            influence_count: self.influences.len(),
            mitigation_link_count: self.mitigated_by.iter().map(Vec::len).sum(),
            objective_impact_count: self.impacts.len(),
        }
    }
}

fn claim<'a>(seen: &mut HashSet<&'a str>, id: &'a str) -> Result<(), StructuralError> {
    if seen.insert(id) {
        Ok(())
    } else {
        Err(StructuralError::DuplicateNode {
            node_id: id.to_string(),
        })
    }
}

fn resolve(
    index: &HashMap<String, usize>,
    id: &str,
    relation: &'static str,
    expected: &'static str,
) -> Result<usize, StructuralError> {
    index.get(id).copied().ok_or_else(|| StructuralError::UnknownNode {
        relation,
        expected,
        node_id: id.to_string(),
    })
}

/// Likelihood and impact must be finite and on the 0–10 scale.
fn check_scale(node_id: &str, field: &'static str, value: Option<f64>) -> Result<(), StructuralError> {
    match value {
        Some(v) if !(v.is_finite() && (0.0..=MAX_SCALE).contains(&v)) => {
            Err(StructuralError::InvalidValue {
                node_id: node_id.to_string(),
                field,
                value: v,
                expected: "0 to 10",
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Record builders shared by the analyzer tests.

    use rim_core::types::*;

    pub fn risk(id: &str, tier: RiskTier, likelihood: f64, impact: f64) -> RiskRecord {
        RiskRecord {
            id: id.to_string(),
            name: format!("Risk {id}"),
            tier,
            likelihood: Some(likelihood),
            impact: Some(impact),
            status: RiskStatus::Active,
            origin: RiskOrigin::New,
            categories: Vec::new(),
        }
    }

    pub fn op(id: &str) -> RiskRecord {
        risk(id, RiskTier::Operational, 5.0, 5.0)
    }

    pub fn strat(id: &str) -> RiskRecord {
        risk(id, RiskTier::Strategic, 5.0, 5.0)
    }

    pub fn mitigation(id: &str, status: MitigationStatus) -> MitigationRecord {
        MitigationRecord {
            id: id.to_string(),
            name: format!("Control {id}"),
            mitigation_type: MitigationType::Dedicated,
            status,
        }
    }

    pub fn objective(id: &str) -> ObjectiveRecord {
        ObjectiveRecord {
            id: id.to_string(),
            reference: id.to_uppercase(),
            name: format!("Objective {id}"),
        }
    }

    pub fn influence(source: &str, target: &str, strength: InfluenceStrength) -> InfluenceRecord {
        InfluenceRecord {
            source_id: source.to_string(),
            target_id: target.to_string(),
            strength,
            confidence: 0.8,
        }
    }

    pub fn mitigates(mitigation: &str, risk: &str, effectiveness: Effectiveness) -> MitigatesRecord {
        MitigatesRecord {
            mitigation_id: mitigation.to_string(),
            risk_id: risk.to_string(),
            effectiveness,
        }
    }

    pub fn impact(risk: &str, objective: &str, level: ImpactLevel) -> ObjectiveImpactRecord {
        ObjectiveImpactRecord {
            risk_id: risk.to_string(),
            objective_id: objective.to_string(),
            impact_level: level,
        }
    }
}
