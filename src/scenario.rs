use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ModelParams, SimulationConfig};
use crate::error::{Result, ValuationError};
use crate::scoring::{self, Scorecard};
use crate::simulation;

/// A global what-if applied to every component before re-simulating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    /// Applied to every score, clamped to [0, 100].
    pub score_multiplier: f64,
    /// Applied to the uncertainty range.
    pub spread_multiplier: f64,
}

impl Scenario {
    pub fn new(name: &str, score_multiplier: f64, spread_multiplier: f64) -> Self {
        Scenario { name: name.to_string(), score_multiplier, spread_multiplier }
    }

    /// Optimistic, base and pessimistic cases.
    pub fn catalog() -> Vec<Scenario> {
        vec![
            Scenario::new("Optimistic", 1.15, 0.7),
            Scenario::new("Base", 1.0, 1.0),
            Scenario::new("Pessimistic", 0.85, 1.3),
        ]
    }

    fn validate(&self) -> Result<()> {
        let ok = |x: f64| x.is_finite() && x >= 0.0;
        if !ok(self.score_multiplier) || !ok(self.spread_multiplier) {
            return Err(ValuationError::InvalidParameter {
                name: "scenario",
                reason: format!(
                    "`{}` multipliers must be finite and non-negative, got score {} spread {}",
                    self.name, self.score_multiplier, self.spread_multiplier
                ),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioResult {
    pub name: String,
    /// Deterministic composite of the scaled scorecard.
    pub composite_score: f64,
    /// Mean simulated peak sales ($B).
    pub peak_sales: f64,
    pub blockbuster_probability: f64,
    /// Percent change in mean peak sales versus the unscaled base case.
    pub delta_from_base: f64,
    /// Draws behind the distribution figures.
    pub iterations: usize,
    pub p10: f64,
    pub p90: f64,
    pub probability_of_success: f64,
}

/// Re-run the full simulation for each scenario at the reduced scenario
/// iteration count.
///
/// Every scenario and the unscaled base case share one seed, so deltas
/// reflect the scenario rather than sampling noise.
pub fn run_scenarios(
    scorecard: &Scorecard,
    scenarios: &[Scenario],
    config: &SimulationConfig,
    params: &ModelParams,
) -> Result<Vec<ScenarioResult>> {
    config.validate()?;
    params.validate()?;
    for s in scenarios {
        s.validate()?;
    }

    let mut run_config = config.clone();
    run_config.iterations = config.iterations.min(params.scenario_iterations);
    run_config.seed = Some(config.seed.unwrap_or_else(|| rand::rng().random()));
    debug!(scenarios = scenarios.len(), iterations = run_config.iterations, "scenario analysis");

    let base = simulation::simulate(scorecard, &run_config, params)?;
    let base_mean = base.statistics.mean;

    scenarios
        .par_iter()
        .map(|scenario| {
            let scaled = scorecard.scaled(scenario.score_multiplier);
            let mut cfg = run_config.clone();
            cfg.uncertainty_range = config.uncertainty_range * scenario.spread_multiplier;
            let result = simulation::simulate(&scaled, &cfg, params)?;

            let composite = scaled.composite_score();
            let mean = result.statistics.mean;
            Ok(ScenarioResult {
                name: scenario.name.clone(),
                composite_score: composite,
                peak_sales: mean,
                blockbuster_probability: scoring::blockbuster_probability(composite, params),
                delta_from_base: if base_mean == 0.0 { 0.0 } else { (mean - base_mean) / base_mean * 100.0 },
                iterations: result.iterations(),
                p10: result.percentiles.p10,
                p90: result.percentiles.p90,
                probability_of_success: result.statistics.risk_adjusted_return.probability_of_success,
            })
        })
        .collect()
}
