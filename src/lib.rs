pub mod config;
pub mod error;
pub mod frontier;
pub mod portfolio;
pub mod sampling;
pub mod scenario;
pub mod scoring;
pub mod sensitivity;
pub mod simulation;
pub mod stats;
pub mod types;
pub mod uncertainty;
pub mod worker;

pub use error::{Result, ValuationError};
