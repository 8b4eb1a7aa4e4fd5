use serde::Serialize;
use tracing::warn;

use crate::config::ModelParams;
use crate::error::{Result, ValuationError};
use crate::simulation::MoleculeSimulation;
use crate::stats::{self, HistogramBin, Percentiles, Statistics};
use crate::types::MoleculeId;

/// A molecule's simulated distribution, borrowed for aggregation.
#[derive(Debug, Clone, Copy)]
pub struct Holding<'a> {
    pub molecule: MoleculeId,
    pub distribution: &'a [f64],
}

pub fn holdings(runs: &[MoleculeSimulation]) -> Vec<Holding<'_>> {
    runs.iter().map(MoleculeSimulation::holding).collect()
}

/// Shared iteration count across holdings. Distributions of unequal length
/// are truncated to the shortest; the second value is the longest original
/// length when that happens.
pub fn aligned_length(holdings: &[Holding<'_>]) -> (usize, Option<usize>) {
    let shortest = holdings.iter().map(|h| h.distribution.len()).min().unwrap_or(0);
    let longest = holdings.iter().map(|h| h.distribution.len()).max().unwrap_or(0);
    if shortest != longest {
        warn!(shortest, longest, "distribution lengths differ; truncating to shortest");
        (shortest, Some(longest))
    } else {
        (shortest, None)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoleculeContribution {
    pub molecule: MoleculeId,
    pub mean: f64,
    /// Fraction of the portfolio mean, 0–1.
    pub share_of_mean: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioAggregate {
    pub molecule_count: usize,
    pub iterations: usize,
    /// Longest input length when inputs were truncated to `iterations`.
    pub truncated_from: Option<usize>,
    /// Summed peak sales per iteration ($B).
    pub distribution: Vec<f64>,
    pub statistics: Statistics,
    pub percentiles: Percentiles,
    pub histogram: Vec<HistogramBin>,
    /// Percent variance reduction versus the sum of standalone variances.
    /// Zero for uncorrelated molecules; negative when positive correlation
    /// inflates the portfolio variance.
    pub diversification_benefit: f64,
    /// Fraction of iterations where the sum clears one blockbuster bar per molecule.
    pub portfolio_success_prob: f64,
    pub risk_free_rate: f64,
    pub contributions: Vec<MoleculeContribution>,
}

/// Sum distributions index-wise and summarise the result.
///
/// Holdings are summed in molecule-id order, so the result does not depend on
/// the order they are passed in.
pub fn aggregate(holdings: &[Holding<'_>], params: &ModelParams) -> Result<PortfolioAggregate> {
    if holdings.is_empty() {
        return Err(ValuationError::InsufficientData {
            operation: "portfolio aggregation",
            required: 1,
            available: 0,
        });
    }
    params.validate()?;

    let (n, truncated_from) = aligned_length(holdings);
    if n == 0 {
        return Err(ValuationError::InsufficientData {
            operation: "portfolio aggregation",
            required: 1,
            available: 0,
        });
    }

    let mut ordered: Vec<Holding<'_>> = holdings.to_vec();
    ordered.sort_by_key(|h| h.molecule);

    let mut distribution = vec![0.0; n];
    for h in &ordered {
        for (acc, x) in distribution.iter_mut().zip(&h.distribution[..n]) {
            *acc += x;
        }
    }

    let k = ordered.len();
    let risk_free_rate = params.risk_free_rate * k as f64;
    let threshold = params.blockbuster_threshold * k as f64;
    let Some(summary) = stats::summarise(&distribution, params, risk_free_rate, threshold) else {
        return Err(ValuationError::ZeroIterations);
    };

    let standalone: Vec<(MoleculeId, f64, f64)> = ordered
        .iter()
        .map(|h| {
            let (mean, variance) = stats::mean_variance(&h.distribution[..n]);
            (h.molecule, mean, variance)
        })
        .collect();

    let total_variance: f64 = standalone.iter().map(|(_, _, v)| v).sum();
    let diversification_benefit = if total_variance == 0.0 {
        0.0
    } else {
        (1.0 - summary.statistics.variance / total_variance) * 100.0
    };

    let portfolio_mean = summary.statistics.mean;
    let contributions = standalone
        .iter()
        .map(|&(molecule, mean, variance)| MoleculeContribution {
            molecule,
            mean,
            share_of_mean: if portfolio_mean == 0.0 { 0.0 } else { mean / portfolio_mean },
            std_dev: variance.sqrt(),
        })
        .collect();

    Ok(PortfolioAggregate {
        molecule_count: k,
        iterations: n,
        truncated_from,
        portfolio_success_prob: summary.statistics.risk_adjusted_return.probability_of_success,
        distribution,
        statistics: summary.statistics,
        percentiles: summary.percentiles,
        histogram: summary.histogram,
        diversification_benefit,
        risk_free_rate,
        contributions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::scoring::{Molecule, Scorecard};
    use crate::simulation::simulate_batch;

    fn params() -> ModelParams {
        ModelParams::canonical()
    }

    fn h(id: u64, d: &[f64]) -> Holding<'_> {
        Holding { molecule: MoleculeId(id), distribution: d }
    }

    #[test]
    fn empty_portfolio_is_insufficient_data() {
        let err = aggregate(&[], &params()).unwrap_err();
        assert!(err.is_insufficient_data(), "got {err}");
    }

    #[test]
    fn single_molecule_portfolio_matches_standalone() {
        let d = [0.5, 1.5, 2.5, 3.5];
        let agg = aggregate(&[h(1, &d)], &params()).unwrap();
        assert_eq!(agg.distribution, d.to_vec());
        assert_eq!(agg.diversification_benefit, 0.0);
        assert_eq!(agg.risk_free_rate, 0.05);
        assert_eq!(agg.portfolio_success_prob, 0.75);
        assert_eq!(agg.contributions[0].share_of_mean, 1.0);
    }

    #[test]
    fn sums_index_wise() {
        let a = [1.0, 2.0, 3.0];
        let b = [10.0, 20.0, 30.0];
        let agg = aggregate(&[h(1, &a), h(2, &b)], &params()).unwrap();
        assert_eq!(agg.distribution, vec![11.0, 22.0, 33.0]);
        assert_eq!(agg.molecule_count, 2);
        assert!((agg.risk_free_rate - 0.10).abs() < 1e-12);
    }

    #[test]
    fn perfectly_correlated_molecules_inflate_variance() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 4.0, 6.0, 8.0];
        // var(2a) = 4 var(a) against 2 var(a).
        let agg = aggregate(&[h(1, &a), h(2, &a)], &params()).unwrap();
        assert!((agg.diversification_benefit - (-100.0)).abs() < 1e-9);
        // var(3a) = 9 var(a) against 5 var(a).
        let scaled = aggregate(&[h(1, &a), h(2, &b)], &params()).unwrap();
        assert!((scaled.diversification_benefit - (-80.0)).abs() < 1e-9);
    }

    #[test]
    fn anti_correlated_molecules_cancel_variance() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [4.0, 3.0, 2.0, 1.0];
        let agg = aggregate(&[h(1, &a), h(2, &b)], &params()).unwrap();
        assert_eq!(agg.statistics.std_dev, 0.0);
        assert!((agg.diversification_benefit - 100.0).abs() < 1e-9);
    }

    #[test]
    fn independent_molecules_diversify() {
        let molecules: Vec<Molecule> = (0..3)
            .map(|i| Molecule {
                id: MoleculeId(i + 1),
                name: format!("PVX-{i}"),
                scorecard: Scorecard::uniform(60.0 + 5.0 * i as f64).unwrap(),
            })
            .collect();
        let config = SimulationConfig::canonical().with_iterations(4_000).with_seed(5);
        let runs = simulate_batch(&molecules, &config, &params()).unwrap();
        let agg = aggregate(&holdings(&runs), &params()).unwrap();

        // Independent draws: portfolio variance ≈ Σ variances.
        assert!(agg.diversification_benefit.abs() < 15.0, "benefit {}", agg.diversification_benefit);
        let expected_mean: f64 = runs.iter().map(|r| r.result.statistics.mean).sum();
        assert!((agg.statistics.mean - expected_mean).abs() < 1e-9);
        let shares: f64 = agg.contributions.iter().map(|c| c.share_of_mean).sum();
        assert!((shares - 1.0).abs() < 1e-9);
    }

    #[test]
    fn success_threshold_scales_with_molecule_count() {
        // Sums: 1.5, 2.0, 2.5 → two of three clear the 2.0 bar.
        let a = [0.5, 1.0, 1.5];
        let b = [1.0, 1.0, 1.0];
        let agg = aggregate(&[h(1, &a), h(2, &b)], &params()).unwrap();
        assert!((agg.portfolio_success_prob - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn unequal_lengths_truncate_to_shortest() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [1.0, 1.0, 1.0];
        let agg = aggregate(&[h(1, &a), h(2, &b)], &params()).unwrap();
        assert_eq!(agg.iterations, 3);
        assert_eq!(agg.truncated_from, Some(5));
        assert_eq!(agg.distribution, vec![2.0, 3.0, 4.0]);

        let even = aggregate(&[h(1, &a[..3]), h(2, &b)], &params()).unwrap();
        assert_eq!(even.truncated_from, None);
    }

    #[test]
    fn zero_length_distributions_rejected() {
        let err = aggregate(&[h(1, &[])], &params()).unwrap_err();
        assert!(err.is_insufficient_data());
    }

    mod props {
        use proptest::prelude::*;

        use super::*;

        fn dists() -> impl Strategy<Value = Vec<Vec<f64>>> {
            proptest::collection::vec(proptest::collection::vec(0.0f64..20.0, 16), 1..6)
        }

        proptest! {
            #[test]
            fn input_order_does_not_matter(ds in dists()) {
                let forward: Vec<Holding<'_>> =
                    ds.iter().enumerate().map(|(i, d)| h(i as u64, d)).collect();
                let mut reversed = forward.clone();
                reversed.reverse();
                let a = aggregate(&forward, &ModelParams::canonical()).unwrap();
                let b = aggregate(&reversed, &ModelParams::canonical()).unwrap();
                prop_assert_eq!(a, b);
            }

            #[test]
            fn grouping_does_not_matter(ds in dists()) {
                let all: Vec<Holding<'_>> =
                    ds.iter().enumerate().map(|(i, d)| h(i as u64, d)).collect();
                let split = all.len() / 2;
                let params = ModelParams::canonical();
                let whole = aggregate(&all, &params).unwrap();
                let left = if split == 0 {
                    vec![0.0; 16]
                } else {
                    aggregate(&all[..split], &params).unwrap().distribution
                };
                let right = aggregate(&all[split..], &params).unwrap().distribution;
                for i in 0..16 {
                    prop_assert!((whole.distribution[i] - (left[i] + right[i])).abs() < 1e-9);
                }
            }
        }
    }
}
