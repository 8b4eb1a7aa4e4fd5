use serde::Serialize;

use crate::config::ModelParams;

/// Order statistics at the fixed reporting quantiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Percentiles {
    pub p5: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
}

impl Percentiles {
    pub fn from_sorted(sorted: &[f64]) -> Self {
        Percentiles {
            p5: quantile(sorted, 0.05),
            p10: quantile(sorted, 0.10),
            p25: quantile(sorted, 0.25),
            p50: quantile(sorted, 0.50),
            p75: quantile(sorted, 0.75),
            p90: quantile(sorted, 0.90),
            p95: quantile(sorted, 0.95),
        }
    }

    pub fn as_array(&self) -> [f64; 7] {
        [self.p5, self.p10, self.p25, self.p50, self.p75, self.p90, self.p95]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    /// Share of all draws, 0–100.
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskMetrics {
    pub risk_weighted_value: f64,
    pub certainty_equivalent: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub risk_reward_ratio: f64,
    pub value_at_risk: f64,
    pub expected_shortfall: f64,
    pub downside_deviation: f64,
    pub upside_potential: f64,
    pub probability_of_success: f64,
    pub coefficient_of_variation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Statistics {
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation (divide by n).
    pub std_dev: f64,
    pub variance: f64,
    pub min: f64,
    pub max: f64,
    pub skewness: f64,
    /// Excess kurtosis (normal = 0).
    pub kurtosis: f64,
    pub risk_adjusted_return: RiskMetrics,
}

/// Everything derived from one sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionSummary {
    pub statistics: Statistics,
    pub percentiles: Percentiles,
    pub histogram: Vec<HistogramBin>,
}

/// Index of quantile `q` in a sorted sample of length `n`: `floor(q * n)`,
/// capped at the last element. `n` must be non-zero.
pub fn quantile_index(n: usize, q: f64) -> usize {
    ((q * n as f64).floor() as usize).min(n - 1)
}

/// Direct-index quantile of a non-empty sorted sample.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    sorted[quantile_index(sorted.len(), q)]
}

pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Mean and population variance. A constant sample reports its value and
/// exactly zero variance, free of summation error.
pub fn mean_variance(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let first = values[0];
    if values.iter().all(|&x| x == first) {
        return (first, 0.0);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
    (mean, variance)
}

/// Divide, resolving a zero or non-finite denominator to 0.
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        0.0
    } else {
        numerator / denominator
    }
}

fn mean_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), x| (s + x, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Summarise a sample. `risk_free_rate` and `success_threshold` are passed
/// explicitly because portfolios scale both by molecule count.
///
/// Returns `None` for an empty sample.
pub fn summarise(
    values: &[f64],
    params: &ModelParams,
    risk_free_rate: f64,
    success_threshold: f64,
) -> Option<DistributionSummary> {
    (!values.is_empty()).then(|| summarise_sorted(&sorted_copy(values), params, risk_free_rate, success_threshold))
}

/// [`summarise`] over a non-empty sample already in ascending order.
pub fn summarise_sorted(
    sorted: &[f64],
    params: &ModelParams,
    risk_free_rate: f64,
    success_threshold: f64,
) -> DistributionSummary {
    let n = sorted.len();

    let (mean, variance) = mean_variance(sorted);
    let std_dev = variance.sqrt();
    let percentiles = Percentiles::from_sorted(sorted);

    let (skewness, kurtosis) = if std_dev > 0.0 {
        let m3 = sorted.iter().map(|x| (x - mean).powi(3)).sum::<f64>() / n as f64;
        let m4 = sorted.iter().map(|x| (x - mean).powi(4)).sum::<f64>() / n as f64;
        (m3 / std_dev.powi(3), m4 / variance.powi(2) - 3.0)
    } else {
        (0.0, 0.0)
    };

    let risk = risk_metrics(sorted, mean, variance, percentiles.p50, params, risk_free_rate, success_threshold);

    DistributionSummary {
        statistics: Statistics {
            mean,
            median: percentiles.p50,
            std_dev,
            variance,
            min: sorted[0],
            max: sorted[n - 1],
            skewness,
            kurtosis,
            risk_adjusted_return: risk,
        },
        percentiles,
        histogram: histogram(sorted, params.histogram_bins),
    }
}

fn risk_metrics(
    sorted: &[f64],
    mean: f64,
    variance: f64,
    median: f64,
    params: &ModelParams,
    risk_free_rate: f64,
    success_threshold: f64,
) -> RiskMetrics {
    let n = sorted.len();
    let std_dev = variance.sqrt();

    let var_index = quantile_index(n, params.var_cutoff);
    let value_at_risk = sorted[var_index];
    let expected_shortfall = mean_of(sorted[..=var_index].iter().copied()).unwrap_or(value_at_risk);

    let downside_deviation = {
        let (sq, m) = sorted
            .iter()
            .take_while(|&&x| x < mean)
            .fold((0.0, 0usize), |(s, c), x| (s + (x - mean).powi(2), c + 1));
        if m == 0 { 0.0 } else { (sq / m as f64).sqrt() }
    };
    let upside_potential = mean_of(sorted.iter().copied().filter(|&x| x > median)).unwrap_or(0.0);

    let excess = mean - risk_free_rate;
    let sharpe_ratio = ratio(excess, std_dev);
    let sortino_ratio = ratio(excess, downside_deviation);
    let risk_reward_ratio = if downside_deviation > 0.0 {
        upside_potential / downside_deviation
    } else {
        ratio(upside_potential, expected_shortfall.abs())
    };

    let successes = n - sorted.partition_point(|&x| x < success_threshold);
    let probability_of_success = successes as f64 / n as f64;

    let cv = ratio(std_dev, mean);
    let sqrt_p = probability_of_success.sqrt();
    let risk_weighted_value =
        mean * (1.0 - cv.min(1.0) / 2.0) * sqrt_p + (1.0 - sqrt_p) * expected_shortfall.max(0.0);
    let certainty_equivalent = mean - 0.5 * params.risk_aversion * variance;

    RiskMetrics {
        risk_weighted_value,
        certainty_equivalent,
        sharpe_ratio,
        sortino_ratio,
        risk_reward_ratio,
        value_at_risk,
        expected_shortfall,
        downside_deviation,
        upside_potential,
        probability_of_success,
        coefficient_of_variation: cv,
    }
}

/// Equal-width bins between the sample min and max. A constant sample puts
/// every draw in the first bin.
pub fn histogram(sorted: &[f64], bins: usize) -> Vec<HistogramBin> {
    let n = sorted.len();
    if n == 0 || bins == 0 {
        return Vec::new();
    }
    let min = sorted[0];
    let max = sorted[n - 1];
    let width = (max - min) / bins as f64;

    let mut counts = vec![0usize; bins];
    for &x in sorted {
        let idx = if width > 0.0 { ((x - min) / width).floor() as usize } else { 0 };
        counts[idx.min(bins - 1)] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: min + i as f64 * width,
            upper: if i + 1 == bins { max } else { min + (i + 1) as f64 * width },
            count,
            percentage: count as f64 / n as f64 * 100.0,
        })
        .collect()
}
