use serde::{Deserialize, Serialize};

use crate::config::ModelParams;
use crate::error::{Result, ValuationError};
use crate::types::{Component, MoleculeId};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentScore {
    pub component: Component,
    /// Raw 0–100 score.
    pub score: f64,
    pub weight: f64,
}

impl ComponentScore {
    pub fn canonical(component: Component, score: f64) -> Self {
        ComponentScore { component, score, weight: component.canonical_weight() }
    }

    pub fn name(&self) -> &'static str {
        self.component.name()
    }

    pub fn weighted_score(&self) -> f64 {
        self.score * self.weight
    }
}

/// One validated score per component, held in canonical order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scorecard {
    components: [ComponentScore; Component::COUNT],
}

impl Scorecard {
    /// Canonical weights; scores given in [`Component::ALL`] order.
    pub fn canonical(scores: [f64; Component::COUNT]) -> Result<Self> {
        let components = Component::ALL.map(|c| ComponentScore::canonical(c, scores[c.index()]));
        Self::new(components.to_vec(), ModelParams::canonical().weight_tolerance)
    }

    /// Every component at the same score, canonical weights.
    pub fn uniform(score: f64) -> Result<Self> {
        Self::canonical([score; Component::COUNT])
    }

    /// Validate an arbitrary list: exactly one entry per component, scores in
    /// [0, 100], weights in [0, 1] summing to 1 within `tolerance`.
    pub fn new(scores: Vec<ComponentScore>, tolerance: f64) -> Result<Self> {
        let mut slots: [Option<ComponentScore>; Component::COUNT] = [None; Component::COUNT];
        for cs in scores {
            if !(0.0..=100.0).contains(&cs.score) {
                return Err(ValuationError::ScoreOutOfRange { component: cs.component, score: cs.score });
            }
            if !(0.0..=1.0).contains(&cs.weight) {
                return Err(ValuationError::WeightOutOfRange {
                    component: cs.component,
                    weight: cs.weight,
                });
            }
            let slot = &mut slots[cs.component.index()];
            if slot.is_some() {
                return Err(ValuationError::DuplicateComponent(cs.component));
            }
            *slot = Some(cs);
        }

        let mut components = [ComponentScore::canonical(Component::MarketSize, 0.0); Component::COUNT];
        for c in Component::ALL {
            components[c.index()] = slots[c.index()].ok_or(ValuationError::MissingComponent(c))?;
        }

        let total: f64 = components.iter().map(|c| c.weight).sum();
        if (total - 1.0).abs() > tolerance {
            return Err(ValuationError::WeightsDoNotSumToOne(total));
        }

        Ok(Scorecard { components })
    }

    pub fn components(&self) -> &[ComponentScore; Component::COUNT] {
        &self.components
    }

    pub fn score(&self, component: Component) -> f64 {
        self.components[component.index()].score
    }

    pub fn scores(&self) -> [f64; Component::COUNT] {
        self.components.map(|c| c.score)
    }

    pub fn weights(&self) -> [f64; Component::COUNT] {
        self.components.map(|c| c.weight)
    }

    /// Every score multiplied by `factor`, clamped to [0, 100]. Weights unchanged.
    pub fn scaled(&self, factor: f64) -> Scorecard {
        let mut out = self.clone();
        for c in &mut out.components {
            c.score = (c.score * factor).clamp(0.0, 100.0);
        }
        out
    }

    pub fn composite_score(&self) -> f64 {
        composite_score(&self.scores(), &self.weights())
    }
}

/// Checks weights against the canonical tolerance. Load a [`MoleculeRecord`]
/// to validate with a configured one.
impl<'de> Deserialize<'de> for Scorecard {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        ScorecardRecord::deserialize(deserializer)?
            .validate(ModelParams::canonical().weight_tolerance)
            .map_err(serde::de::Error::custom)
    }
}

/// Scorecard as read from disk, not yet validated.
#[derive(Debug, Clone, Deserialize)]
pub struct ScorecardRecord {
    pub components: Vec<ComponentScore>,
}

impl ScorecardRecord {
    pub fn validate(self, tolerance: f64) -> Result<Scorecard> {
        Scorecard::new(self.components, tolerance)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoleculeRecord {
    pub id: MoleculeId,
    pub name: String,
    pub scorecard: ScorecardRecord,
}

impl MoleculeRecord {
    /// Validate against `params.weight_tolerance`.
    pub fn validate(self, params: &ModelParams) -> Result<Molecule> {
        Ok(Molecule {
            id: self.id,
            name: self.name,
            scorecard: self.scorecard.validate(params.weight_tolerance)?,
        })
    }
}

/// Input record for one drug program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Molecule {
    pub id: MoleculeId,
    pub name: String,
    pub scorecard: Scorecard,
}

/// Point valuation of a scorecard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Valuation {
    pub composite_score: f64,
    pub blockbuster_probability: f64,
    /// $B.
    pub peak_sales: f64,
    pub peak_sales_low: f64,
    pub peak_sales_high: f64,
}

/// Σ score·weight, rounded to one decimal. Shared by every path that turns
/// scores into a composite, so sampled and point estimates agree exactly.
pub fn composite_score(scores: &[f64], weights: &[f64]) -> f64 {
    let raw: f64 = scores.iter().zip(weights).map(|(s, w)| s * w).sum();
    ((raw * 10.0).round() / 10.0).max(0.0)
}

pub fn blockbuster_probability(composite: f64, params: &ModelParams) -> f64 {
    1.0 / (1.0 + (-(composite - params.logistic_midpoint) / params.logistic_slope).exp())
}

/// Peak sales in $B for a composite score.
pub fn peak_sales(composite: f64, params: &ModelParams) -> f64 {
    let c = composite / 100.0;
    params.peak_sales_base * c * c * params.peak_sales_scale
}

pub fn evaluate(scorecard: &Scorecard, params: &ModelParams) -> Valuation {
    let composite = scorecard.composite_score();
    let estimate = peak_sales(composite, params);
    Valuation {
        composite_score: composite,
        blockbuster_probability: blockbuster_probability(composite, params),
        peak_sales: estimate,
        peak_sales_low: estimate * params.peak_sales_low_factor,
        peak_sales_high: estimate * params.peak_sales_high_factor,
    }
}
