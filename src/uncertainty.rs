use serde::{Deserialize, Serialize};

use crate::error::{Result, ValuationError};
use crate::scoring::Scorecard;
use crate::types::Component;

/// Sampling band for one component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentUncertainty {
    pub component: Component,
    pub base_score: f64,
    pub min_score: f64,
    pub max_score: f64,
    pub weight: f64,
}

impl ComponentUncertainty {
    pub fn name(&self) -> &'static str {
        self.component.name()
    }

    /// Rejects inverted bands and a base outside its band.
    pub fn validate(&self) -> Result<()> {
        if self.min_score > self.max_score {
            return Err(ValuationError::InvertedBand {
                component: self.component,
                min: self.min_score,
                max: self.max_score,
            });
        }
        for bound in [self.min_score, self.max_score] {
            if !(0.0..=100.0).contains(&bound) {
                return Err(ValuationError::ScoreOutOfRange { component: self.component, score: bound });
            }
        }
        if !(self.min_score..=self.max_score).contains(&self.base_score) {
            return Err(ValuationError::ScoreOutOfRange {
                component: self.component,
                score: self.base_score,
            });
        }
        Ok(())
    }
}

/// Expand each score into `[b(1 - u/100), b(1 + u/100)]` clamped to [0, 100].
pub fn map_uncertainty(scorecard: &Scorecard, uncertainty_range: f64) -> Result<Vec<ComponentUncertainty>> {
    if !(uncertainty_range >= 0.0 && uncertainty_range.is_finite()) {
        return Err(ValuationError::InvalidUncertaintyRange(uncertainty_range));
    }
    let u = uncertainty_range / 100.0;
    Ok(scorecard
        .components()
        .iter()
        .map(|cs| ComponentUncertainty {
            component: cs.component,
            base_score: cs.score,
            min_score: (cs.score * (1.0 - u)).max(0.0),
            max_score: (cs.score * (1.0 + u)).min(100.0),
            weight: cs.weight,
        })
        .collect())
}
