use std::str::FromStr;

use rand::Rng;
use rand_distr::{Distribution, Normal, Triangular, Uniform};
use serde::{Deserialize, Serialize};

/// How a component score is drawn from its `[min, max]` band.
///
/// Every variant keeps draws inside the band and collapses to the base score
/// when the band has zero width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingDistribution {
    /// Flat over `[min, max]`.
    #[default]
    Uniform,
    /// Peaks at the base score; skews when the band is clamped at 0 or 100.
    Triangular,
    /// Normal centred on base with σ = (max − min) / 6, rejected outside the band.
    #[serde(alias = "normal")]
    TruncatedNormal,
}

/// Rejection attempts before a truncated-normal draw is clamped into the band.
const MAX_REJECTIONS: usize = 64;

impl SamplingDistribution {
    /// Prepare a sampler for one band. Built once per component per run.
    pub fn sampler(self, min: f64, base: f64, max: f64) -> BandSampler {
        if !(max > min) {
            return BandSampler::Fixed(base);
        }
        match self {
            SamplingDistribution::Uniform => match Uniform::new_inclusive(min, max) {
                Ok(dist) => BandSampler::Uniform(dist),
                Err(_) => BandSampler::Fixed(base),
            },
            SamplingDistribution::Triangular => match Triangular::new(min, max, base) {
                Ok(dist) => BandSampler::Triangular(dist),
                Err(_) => BandSampler::Fixed(base),
            },
            SamplingDistribution::TruncatedNormal => match Normal::new(base, (max - min) / 6.0) {
                Ok(dist) => BandSampler::TruncatedNormal { dist, min, max },
                Err(_) => BandSampler::Fixed(base),
            },
        }
    }
}

impl FromStr for SamplingDistribution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uniform" => Ok(SamplingDistribution::Uniform),
            "triangular" => Ok(SamplingDistribution::Triangular),
            "normal" | "truncated_normal" => Ok(SamplingDistribution::TruncatedNormal),
            other => Err(format!("unknown sampling distribution `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum BandSampler {
    Fixed(f64),
    Uniform(Uniform<f64>),
    Triangular(Triangular<f64>),
    TruncatedNormal { dist: Normal<f64>, min: f64, max: f64 },
}

impl BandSampler {
    pub fn sample(&self, rng: &mut impl Rng) -> f64 {
        match self {
            BandSampler::Fixed(v) => *v,
            BandSampler::Uniform(dist) => dist.sample(rng),
            BandSampler::Triangular(dist) => dist.sample(rng),
            BandSampler::TruncatedNormal { dist, min, max } => {
                for _ in 0..MAX_REJECTIONS {
                    let x = dist.sample(rng);
                    if x >= *min && x <= *max {
                        return x;
                    }
                }
                dist.sample(rng).clamp(*min, *max)
            }
        }
    }
}
