use thiserror::Error;

use crate::types::Component;

pub type Result<T> = std::result::Result<T, ValuationError>;

#[derive(Debug, Error)]
pub enum ValuationError {
    #[error("iterations must be greater than zero")]
    ZeroIterations,

    #[error("uncertainty range must be a finite, non-negative percentage, got {0}")]
    InvalidUncertaintyRange(f64),

    #[error("weights must sum to 1.0, got {0:.6}")]
    WeightsDoNotSumToOne(f64),

    #[error("{component} score {score} outside [0, 100]")]
    ScoreOutOfRange { component: Component, score: f64 },

    #[error("{component} weight {weight} outside [0, 1]")]
    WeightOutOfRange { component: Component, weight: f64 },

    #[error("scorecard is missing component {0}")]
    MissingComponent(Component),

    #[error("scorecard lists component {0} more than once")]
    DuplicateComponent(Component),

    #[error("{component} band is inverted: min {min} > max {max}")]
    InvertedBand { component: Component, min: f64, max: f64 },

    #[error("invalid model parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("{operation}: insufficient data (need {required}, have {available})")]
    InsufficientData { operation: &'static str, required: usize, available: usize },

    #[error("background simulation ended without a result")]
    WorkerLost,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ValuationError {
    /// Configuration errors are raised before any sampling starts.
    pub fn is_invalid_configuration(&self) -> bool {
        matches!(
            self,
            ValuationError::ZeroIterations
                | ValuationError::InvalidUncertaintyRange(_)
                | ValuationError::WeightsDoNotSumToOne(_)
                | ValuationError::ScoreOutOfRange { .. }
                | ValuationError::WeightOutOfRange { .. }
                | ValuationError::MissingComponent(_)
                | ValuationError::DuplicateComponent(_)
                | ValuationError::InvertedBand { .. }
                | ValuationError::InvalidParameter { .. }
        )
    }

    /// The caller should render "no data" rather than an error.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, ValuationError::InsufficientData { .. })
    }
}
