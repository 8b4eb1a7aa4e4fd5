use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValuationError};
use crate::sampling::SamplingDistribution;

/// Model constants. Recalibration happens here, never in algorithm code.
///
/// Deserialises from partial JSON: any field left out keeps its canonical value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    /// Composite score at which blockbuster probability is exactly 0.5.
    pub logistic_midpoint: f64,
    /// Logistic slope divisor: P = 1 / (1 + e^(-(score - midpoint) / slope)).
    pub logistic_slope: f64,
    /// Peak sales ($B) = base * (composite / 100)^2 * scale.
    pub peak_sales_base: f64,
    pub peak_sales_scale: f64,
    /// Reported point-estimate range factors.
    pub peak_sales_low_factor: f64,
    pub peak_sales_high_factor: f64,
    /// Quadratic risk-aversion coefficient for the certainty equivalent.
    pub risk_aversion: f64,
    /// Tail quantile for VaR / expected shortfall.
    pub var_cutoff: f64,
    /// Blockbuster bar in $B, same units as peak sales.
    pub blockbuster_threshold: f64,
    pub histogram_bins: usize,
    /// Per-molecule risk-free rate. Portfolios scale it by molecule count.
    pub risk_free_rate: f64,
    /// Relative perturbation for the tornado analysis (0.10 = ±10%).
    pub sensitivity_perturbation: f64,
    /// Two-molecule frontier sweep: `w1 = i / frontier_steps` for i in 0..=steps.
    pub frontier_steps: usize,
    /// Random convex weight vectors for three or more molecules.
    pub frontier_samples: usize,
    /// Iteration cap for each scenario re-run.
    pub scenario_iterations: usize,
    /// Allowed deviation of a scorecard's weight sum from 1.0.
    pub weight_tolerance: f64,
}

impl ModelParams {
    pub fn canonical() -> Self {
        ModelParams {
            logistic_midpoint: 65.0,
            logistic_slope: 10.0,
            peak_sales_base: 2.5,
            peak_sales_scale: 10.0,
            peak_sales_low_factor: 0.7,
            peak_sales_high_factor: 1.3,
            risk_aversion: 2.0,
            var_cutoff: 0.05,
            blockbuster_threshold: 1.0,
            histogram_bins: 20,
            risk_free_rate: 0.05,
            sensitivity_perturbation: 0.10,
            frontier_steps: 10,
            frontier_samples: 500,
            scenario_iterations: 1_000,
            weight_tolerance: 1e-6,
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let params: ModelParams = load_json(path)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        fn invalid(name: &'static str, reason: impl Into<String>) -> ValuationError {
            ValuationError::InvalidParameter { name, reason: reason.into() }
        }

        if !(self.logistic_slope > 0.0 && self.logistic_slope.is_finite()) {
            return Err(invalid("logistic_slope", format!("must be positive, got {}", self.logistic_slope)));
        }
        if !self.logistic_midpoint.is_finite() {
            return Err(invalid("logistic_midpoint", "must be finite"));
        }
        if !(self.peak_sales_base >= 0.0 && self.peak_sales_scale >= 0.0) {
            return Err(invalid("peak_sales_base", "peak-sales base and scale must be non-negative"));
        }
        if !(self.peak_sales_low_factor >= 0.0 && self.peak_sales_low_factor <= self.peak_sales_high_factor) {
            return Err(invalid(
                "peak_sales_low_factor",
                format!(
                    "need 0 <= low ({}) <= high ({})",
                    self.peak_sales_low_factor, self.peak_sales_high_factor
                ),
            ));
        }
        if !(self.risk_aversion >= 0.0) {
            return Err(invalid("risk_aversion", "must be non-negative"));
        }
        if !(self.var_cutoff > 0.0 && self.var_cutoff < 1.0) {
            return Err(invalid("var_cutoff", format!("must lie in (0, 1), got {}", self.var_cutoff)));
        }
        if !self.blockbuster_threshold.is_finite() {
            return Err(invalid("blockbuster_threshold", "must be finite"));
        }
        if self.histogram_bins == 0 {
            return Err(invalid("histogram_bins", "must be at least 1"));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(invalid("risk_free_rate", "must be finite"));
        }
        if !(self.sensitivity_perturbation >= 0.0 && self.sensitivity_perturbation.is_finite()) {
            return Err(invalid("sensitivity_perturbation", "must be finite and non-negative"));
        }
        if self.frontier_steps == 0 {
            return Err(invalid("frontier_steps", "must be at least 1"));
        }
        if self.frontier_samples == 0 {
            return Err(invalid("frontier_samples", "must be at least 1"));
        }
        if self.scenario_iterations == 0 {
            return Err(invalid("scenario_iterations", "must be at least 1"));
        }
        if !(self.weight_tolerance >= 0.0) {
            return Err(invalid("weight_tolerance", "must be non-negative"));
        }
        Ok(())
    }
}

impl Default for ModelParams {
    fn default() -> Self {
        Self::canonical()
    }
}

/// Per-run simulation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub iterations: usize,
    /// Relative band half-width around each base score, in percent.
    pub uncertainty_range: f64,
    /// Informational only: percentiles are always reported at fixed quantiles.
    pub confidence_interval: f64,
    /// `None` draws a fresh seed per run; the seed used is returned in the result.
    pub seed: Option<u64>,
    pub sampling: SamplingDistribution,
}

impl SimulationConfig {
    pub fn canonical() -> Self {
        SimulationConfig {
            iterations: 10_000,
            uncertainty_range: 20.0,
            confidence_interval: 90.0,
            seed: None,
            sampling: SamplingDistribution::Uniform,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_uncertainty(mut self, uncertainty_range: f64) -> Self {
        self.uncertainty_range = uncertainty_range;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(ValuationError::ZeroIterations);
        }
        if !(self.uncertainty_range >= 0.0 && self.uncertainty_range.is_finite()) {
            return Err(ValuationError::InvalidUncertaintyRange(self.uncertainty_range));
        }
        if !(self.confidence_interval > 0.0 && self.confidence_interval <= 100.0) {
            return Err(ValuationError::InvalidParameter {
                name: "confidence_interval",
                reason: format!("must lie in (0, 100], got {}", self.confidence_interval),
            });
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::canonical()
    }
}

/// Read and deserialise a JSON file.
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
