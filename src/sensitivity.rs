use serde::Serialize;

use crate::config::ModelParams;
use crate::scoring::{self, Scorecard};
use crate::types::Component;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivityResult {
    pub component: Component,
    pub component_name: &'static str,
    /// Percent change in peak sales when the score moves up.
    pub up_impact: f64,
    /// Percent change in peak sales when the score moves down.
    pub down_impact: f64,
}

impl SensitivityResult {
    pub fn swing(&self) -> f64 {
        self.up_impact.abs() + self.down_impact.abs()
    }
}

/// Perturb each component by ±`params.sensitivity_perturbation` of its base
/// score, others held at base, and rank by total swing (largest first).
pub fn tornado(scorecard: &Scorecard, params: &ModelParams) -> Vec<SensitivityResult> {
    let base_scores = scorecard.scores();
    let weights = scorecard.weights();
    let peak = |scores: &[f64]| scoring::peak_sales(scoring::composite_score(scores, &weights), params);
    let base = peak(&base_scores);

    let pct_delta = |value: f64| if base == 0.0 { 0.0 } else { (value - base) / base * 100.0 };

    let mut results: Vec<SensitivityResult> = Component::ALL
        .iter()
        .map(|&component| {
            let i = component.index();
            let mut shifted = base_scores;
            shifted[i] = (base_scores[i] * (1.0 + params.sensitivity_perturbation)).clamp(0.0, 100.0);
            let up = peak(&shifted);
            shifted[i] = (base_scores[i] * (1.0 - params.sensitivity_perturbation)).clamp(0.0, 100.0);
            let down = peak(&shifted);
            SensitivityResult {
                component,
                component_name: component.name(),
                up_impact: pct_delta(up),
                down_impact: pct_delta(down),
            }
        })
        .collect();

    // Stable sort: equal swings keep canonical component order.
    results.sort_by(|a, b| b.swing().total_cmp(&a.swing()));
    results
}
