use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, Exp1};
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::config::ModelParams;
use crate::error::{Result, ValuationError};
use crate::portfolio::{Holding, aligned_length};
use crate::stats;
use crate::types::MoleculeId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub molecules: Vec<MoleculeId>,
    /// Row-major, `values[i][j]` pairs `molecules[i]` with `molecules[j]`.
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: MoleculeId, b: MoleculeId) -> Option<f64> {
        let i = self.molecules.iter().position(|&m| m == a)?;
        let j = self.molecules.iter().position(|&m| m == b)?;
        Some(self.values[i][j])
    }
}

/// Pearson correlation over the shared prefix of `a` and `b`.
/// Zero when either side has zero variance.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let (mean_a, var_a) = stats::mean_variance(a);
    let (mean_b, var_b) = stats::mean_variance(b);
    if var_a == 0.0 || var_b == 0.0 {
        return 0.0;
    }
    let cov = a.iter().zip(b).map(|(x, y)| (x - mean_a) * (y - mean_b)).sum::<f64>() / n as f64;
    (cov / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0)
}

pub fn correlation_matrix(holdings: &[Holding<'_>]) -> Result<CorrelationMatrix> {
    require_pair("correlation matrix", holdings)?;
    let (n, _) = aligned_length(holdings);

    let k = holdings.len();
    let mut values = vec![vec![0.0; k]; k];
    for i in 0..k {
        let self_var = stats::mean_variance(&holdings[i].distribution[..n]).1;
        values[i][i] = if self_var == 0.0 { 0.0 } else { 1.0 };
        for j in (i + 1)..k {
            let r = pearson(&holdings[i].distribution[..n], &holdings[j].distribution[..n]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Ok(CorrelationMatrix { molecules: holdings.iter().map(|h| h.molecule).collect(), values })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceBand {
    pub p2_5: f64,
    pub p10: f64,
    pub p90: f64,
    pub p97_5: f64,
}

impl ConfidenceBand {
    fn from_sorted(sorted: &[f64]) -> Self {
        ConfidenceBand {
            p2_5: stats::quantile(sorted, 0.025),
            p10: stats::quantile(sorted, 0.10),
            p90: stats::quantile(sorted, 0.90),
            p97_5: stats::quantile(sorted, 0.975),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrontierCore {
    /// Population std dev of the weighted distribution.
    pub risk: f64,
    pub expected_return: f64,
    /// One weight per holding, in input order; sums to 1.
    pub weights: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrontierPoint {
    #[serde(flatten)]
    pub core: FrontierCore,
    /// Percentiles of the weighted per-iteration distribution.
    pub confidence_band: ConfidenceBand,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EfficientFrontier {
    /// Every evaluated weight combination, in generation order.
    pub points: Vec<FrontierPoint>,
    /// Non-dominated subset, risk ascending.
    pub efficient: Vec<FrontierPoint>,
}

/// Evaluate weighted combinations of the holdings.
///
/// Two holdings are swept at `params.frontier_steps` even steps of the first
/// weight. Three or more are sampled at `params.frontier_samples` random convex
/// weight vectors drawn from a `ChaCha20Rng` seeded with `seed`.
pub fn efficient_frontier(holdings: &[Holding<'_>], params: &ModelParams, seed: u64) -> Result<EfficientFrontier> {
    require_pair("efficient frontier", holdings)?;
    params.validate()?;
    let (n, _) = aligned_length(holdings);
    if n == 0 {
        return Err(ValuationError::InsufficientData { operation: "efficient frontier", required: 1, available: 0 });
    }

    let sweep = holdings.len() == 2;
    let weight_sets: Vec<Vec<f64>> = if sweep {
        let steps = params.frontier_steps;
        (0..=steps)
            .map(|i| {
                let w1 = i as f64 / steps as f64;
                vec![w1, 1.0 - w1]
            })
            .collect()
    } else {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        (0..params.frontier_samples).map(|_| convex_weights(holdings.len(), &mut rng)).collect()
    };
    debug!(holdings = holdings.len(), points = weight_sets.len(), sweep, "efficient frontier");

    let points: Vec<FrontierPoint> = weight_sets
        .into_par_iter()
        .map(|weights| {
            let combined = weighted_sum(holdings, &weights, n);
            let (expected_return, variance) = stats::mean_variance(&combined);
            let confidence_band = ConfidenceBand::from_sorted(&stats::sorted_copy(&combined));
            FrontierPoint { core: FrontierCore { risk: variance.sqrt(), expected_return, weights }, confidence_band }
        })
        .collect();

    let efficient = efficient_subset(&points);
    Ok(EfficientFrontier { points, efficient })
}

/// Sort by risk (ties: higher return first) and keep each point whose return
/// is at least the best return seen at lower risk.
pub fn efficient_subset(points: &[FrontierPoint]) -> Vec<FrontierPoint> {
    let mut ordered: Vec<&FrontierPoint> = points.iter().collect();
    ordered.sort_by(|a, b| {
        a.core
            .risk
            .total_cmp(&b.core.risk)
            .then(b.core.expected_return.total_cmp(&a.core.expected_return))
    });

    let mut best = f64::NEG_INFINITY;
    ordered
        .into_iter()
        .filter(|p| {
            if p.core.expected_return >= best {
                best = p.core.expected_return;
                true
            } else {
                false
            }
        })
        .cloned()
        .collect()
}

fn require_pair(operation: &'static str, holdings: &[Holding<'_>]) -> Result<()> {
    if holdings.len() < 2 {
        return Err(ValuationError::InsufficientData { operation, required: 2, available: holdings.len() });
    }
    Ok(())
}

fn weighted_sum(holdings: &[Holding<'_>], weights: &[f64], n: usize) -> Vec<f64> {
    let mut out = vec![0.0; n];
    for (h, &w) in holdings.iter().zip(weights) {
        for (acc, x) in out.iter_mut().zip(&h.distribution[..n]) {
            *acc += w * x;
        }
    }
    out
}

/// Uniform draw from the simplex: normalised unit exponentials.
fn convex_weights(k: usize, rng: &mut ChaCha20Rng) -> Vec<f64> {
    let raw: Vec<f64> = (0..k).map(|_| Exp1.sample(rng)).collect();
    let total: f64 = raw.iter().sum();
    if total > 0.0 {
        raw.into_iter().map(|x| x / total).collect()
    } else {
        vec![1.0 / k as f64; k]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::portfolio::holdings;
    use crate::scoring::{Molecule, Scorecard};
    use crate::simulation::{MoleculeSimulation, simulate_batch};

    fn h(id: u64, d: &[f64]) -> Holding<'_> {
        Holding { molecule: MoleculeId(id), distribution: d }
    }

    fn runs(scores: &[f64]) -> Vec<MoleculeSimulation> {
        let molecules: Vec<Molecule> = scores
            .iter()
            .enumerate()
            .map(|(i, &s)| Molecule {
                id: MoleculeId(i as u64 + 1),
                name: format!("PVX-{}", i + 1),
                scorecard: Scorecard::uniform(s).unwrap(),
            })
            .collect();
        let config = SimulationConfig::canonical().with_iterations(2_000).with_seed(21);
        simulate_batch(&molecules, &config, &ModelParams::canonical()).unwrap()
    }

    #[test]
    fn pearson_extremes() {
        let a = [1.0, 2.0, 3.0, 4.0];
        assert!((pearson(&a, &[2.0, 4.0, 6.0, 8.0]) - 1.0).abs() < 1e-12);
        assert!((pearson(&a, &[4.0, 3.0, 2.0, 1.0]) + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&a, &[5.0; 4]), 0.0);
        assert_eq!(pearson(&[], &[]), 0.0);
    }

    #[test]
    fn correlation_matrix_is_symmetric_with_unit_diagonal() {
        let runs = runs(&[55.0, 65.0, 75.0]);
        let m = correlation_matrix(&holdings(&runs)).unwrap();
        assert_eq!(m.molecules, vec![MoleculeId(1), MoleculeId(2), MoleculeId(3)]);
        for i in 0..3 {
            assert_eq!(m.values[i][i], 1.0);
            for j in 0..3 {
                assert_eq!(m.values[i][j], m.values[j][i]);
                assert!(m.values[i][j].abs() <= 1.0);
            }
        }
        // Independent seeds: off-diagonal correlation near zero.
        assert!(m.get(MoleculeId(1), MoleculeId(2)).unwrap().abs() < 0.1);
        assert_eq!(m.get(MoleculeId(1), MoleculeId(9)), None);
    }

    #[test]
    fn constant_distribution_correlates_to_zero_including_itself() {
        let flat = [3.0; 5];
        let moving = [1.0, 2.0, 3.0, 4.0, 5.0];
        let m = correlation_matrix(&[h(1, &flat), h(2, &moving)]).unwrap();
        assert_eq!(m.values, vec![vec![0.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn fewer_than_two_molecules_is_insufficient_data() {
        let d = [1.0, 2.0];
        assert!(correlation_matrix(&[h(1, &d)]).unwrap_err().is_insufficient_data());
        assert!(correlation_matrix(&[]).unwrap_err().is_insufficient_data());
        let err = efficient_frontier(&[h(1, &d)], &ModelParams::canonical(), 0).unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn two_molecule_sweep_endpoints_equal_standalone() {
        let runs = runs(&[60.0, 80.0]);
        let hs = holdings(&runs);
        let frontier = efficient_frontier(&hs, &ModelParams::canonical(), 0).unwrap();
        assert_eq!(frontier.points.len(), 11);

        let (mean_1, var_1) = stats::mean_variance(hs[0].distribution);
        let (mean_2, var_2) = stats::mean_variance(hs[1].distribution);
        let first = &frontier.points[0].core;
        let last = &frontier.points[10].core;
        assert_eq!(first.weights, vec![0.0, 1.0]);
        assert_eq!((first.expected_return, first.risk), (mean_2, var_2.sqrt()));
        assert_eq!(last.weights, vec![1.0, 0.0]);
        assert_eq!((last.expected_return, last.risk), (mean_1, var_1.sqrt()));
    }

    #[test]
    fn sweep_points_carry_ordered_bands() {
        let runs = runs(&[50.0, 70.0]);
        let frontier = efficient_frontier(&holdings(&runs), &ModelParams::canonical(), 0).unwrap();
        for p in &frontier.points {
            let b = p.confidence_band;
            assert!(b.p2_5 <= b.p10 && b.p10 <= b.p90 && b.p90 <= b.p97_5);
        }
    }

    #[test]
    fn random_cloud_is_seeded_and_convex() {
        let runs = runs(&[55.0, 65.0, 75.0]);
        let hs = holdings(&runs);
        let params = ModelParams::canonical();
        let a = efficient_frontier(&hs, &params, 9).unwrap();
        let b = efficient_frontier(&hs, &params, 9).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.points.len(), params.frontier_samples);
        for p in &a.points {
            let b = p.confidence_band;
            assert!(b.p2_5 <= b.p10 && b.p10 <= b.p90 && b.p90 <= b.p97_5, "band {b:?}");
            assert!(b.p2_5 <= p.core.expected_return && p.core.expected_return <= b.p97_5);
            assert!(p.core.weights.iter().all(|&w| w >= 0.0));
            assert!((p.core.weights.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn efficient_subset_drops_dominated_points() {
        let point = |risk: f64, ret: f64| FrontierPoint {
            core: FrontierCore { risk, expected_return: ret, weights: vec![] },
            confidence_band: ConfidenceBand::from_sorted(&[ret]),
        };
        let points = vec![point(2.0, 5.0), point(1.0, 3.0), point(1.5, 2.0), point(1.0, 4.0), point(3.0, 5.0)];
        let efficient = efficient_subset(&points);
        let pairs: Vec<(f64, f64)> = efficient.iter().map(|p| (p.core.risk, p.core.expected_return)).collect();
        assert_eq!(pairs, vec![(1.0, 4.0), (2.0, 5.0), (3.0, 5.0)]);
    }

    #[test]
    fn efficient_frontier_is_monotone() {
        let runs = runs(&[50.0, 62.0, 71.0, 84.0]);
        let frontier = efficient_frontier(&holdings(&runs), &ModelParams::canonical(), 4).unwrap();
        assert!(!frontier.efficient.is_empty());
        assert!(frontier.efficient.windows(2).all(|w| {
            w[0].core.risk <= w[1].core.risk && w[0].core.expected_return <= w[1].core.expected_return
        }));
    }
}
