use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{ModelParams, SimulationConfig};
use crate::error::{Result, ValuationError};
use crate::portfolio::Holding;
use crate::sampling::BandSampler;
use crate::scoring::{self, Molecule, Scorecard, Valuation};
use crate::stats::{self, HistogramBin, Percentiles, Statistics};
use crate::types::MoleculeId;
use crate::uncertainty::{self, ComponentUncertainty};

/// Outcome of one Monte Carlo run. Created fresh per run, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    /// Seed the run was drawn with; replaying it reproduces the distribution.
    pub seed: u64,
    /// Peak sales ($B) per iteration, in draw order.
    pub peak_sales_distribution: Vec<f64>,
    pub statistics: Statistics,
    pub percentiles: Percentiles,
    pub histogram: Vec<HistogramBin>,
}

impl SimulationResult {
    pub fn iterations(&self) -> usize {
        self.peak_sales_distribution.len()
    }
}

pub struct Simulation {
    bands: Vec<ComponentUncertainty>,
    samplers: Vec<BandSampler>,
    weights: Vec<f64>,
    iterations: usize,
    params: ModelParams,
    seed: u64,
    rng: ChaCha20Rng,
}

impl Simulation {
    /// Validate inputs and expand the scorecard into sampling bands.
    /// Nothing is sampled until [`Simulation::run`].
    pub fn from_scorecard(scorecard: &Scorecard, config: &SimulationConfig, params: &ModelParams) -> Result<Self> {
        config.validate()?;
        let bands = uncertainty::map_uncertainty(scorecard, config.uncertainty_range)?;
        Self::from_uncertainties(bands, config, params)
    }

    /// Build from pre-expanded bands.
    pub fn from_uncertainties(
        bands: Vec<ComponentUncertainty>,
        config: &SimulationConfig,
        params: &ModelParams,
    ) -> Result<Self> {
        config.validate()?;
        params.validate()?;
        for band in &bands {
            band.validate()?;
        }
        let total: f64 = bands.iter().map(|b| b.weight).sum();
        if (total - 1.0).abs() > params.weight_tolerance {
            return Err(ValuationError::WeightsDoNotSumToOne(total));
        }

        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let samplers = bands
            .iter()
            .map(|b| config.sampling.sampler(b.min_score, b.base_score, b.max_score))
            .collect();
        let weights = bands.iter().map(|b| b.weight).collect();

        Ok(Simulation {
            bands,
            samplers,
            weights,
            iterations: config.iterations,
            params: params.clone(),
            seed,
            rng: ChaCha20Rng::seed_from_u64(seed),
        })
    }

    /// Replace the internal generator (tests, or callers sharing a stream).
    pub fn with_rng(mut self, rng: ChaCha20Rng) -> Self {
        self.rng = rng;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn bands(&self) -> &[ComponentUncertainty] {
        &self.bands
    }

    /// Draw the full distribution and summarise it.
    pub fn run(self) -> SimulationResult {
        debug!(seed = self.seed, iterations = self.iterations, "simulation started");
        let mut rng = self.rng.clone();
        let draws = self.draw(&mut rng);
        let result = self.summarise(draws);
        debug!(
            seed = self.seed,
            mean = result.statistics.mean,
            std_dev = result.statistics.std_dev,
            "simulation finished"
        );
        result
    }

    /// Peak-sales draws using an external generator.
    pub fn draw(&self, rng: &mut impl Rng) -> Vec<f64> {
        let mut scores = vec![0.0; self.samplers.len()];
        (0..self.iterations)
            .map(|_| {
                for (slot, sampler) in scores.iter_mut().zip(&self.samplers) {
                    *slot = sampler.sample(rng);
                }
                let composite = scoring::composite_score(&scores, &self.weights);
                scoring::peak_sales(composite, &self.params)
            })
            .collect()
    }

    fn summarise(&self, draws: Vec<f64>) -> SimulationResult {
        // Non-empty: iterations > 0 is checked at construction.
        let s = stats::summarise_sorted(
            &stats::sorted_copy(&draws),
            &self.params,
            self.params.risk_free_rate,
            self.params.blockbuster_threshold,
        );
        SimulationResult {
            seed: self.seed,
            peak_sales_distribution: draws,
            statistics: s.statistics,
            percentiles: s.percentiles,
            histogram: s.histogram,
        }
    }
}

/// Validate, sample and summarise in one call.
pub fn simulate(scorecard: &Scorecard, config: &SimulationConfig, params: &ModelParams) -> Result<SimulationResult> {
    Ok(Simulation::from_scorecard(scorecard, config, params)?.run())
}

/// One molecule's point valuation alongside its simulated distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoleculeSimulation {
    pub molecule: MoleculeId,
    pub name: String,
    pub valuation: Valuation,
    pub result: SimulationResult,
}

impl MoleculeSimulation {
    pub fn holding(&self) -> Holding<'_> {
        Holding { molecule: self.molecule, distribution: &self.result.peak_sales_distribution }
    }
}

/// Simulate every molecule in parallel. Molecule `i` runs with seed
/// `base + i`, where `base` is the configured seed or a fresh one.
pub fn simulate_batch(
    molecules: &[Molecule],
    config: &SimulationConfig,
    params: &ModelParams,
) -> Result<Vec<MoleculeSimulation>> {
    config.validate()?;
    params.validate()?;
    let base_seed = config.seed.unwrap_or_else(|| rand::rng().random());
    info!(molecules = molecules.len(), base_seed, iterations = config.iterations, "batch simulation");

    molecules
        .par_iter()
        .enumerate()
        .map(|(i, m)| {
            let mut run_config = config.clone();
            run_config.seed = Some(base_seed.wrapping_add(i as u64));
            let result = simulate(&m.scorecard, &run_config, params)?;
            Ok(MoleculeSimulation {
                molecule: m.id,
                name: m.name.clone(),
                valuation: scoring::evaluate(&m.scorecard, params),
                result,
            })
        })
        .collect()
}
