//! Error types shared by the dispatch simulator, sizing search and runner.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// Missing or invalid technology spec or run parameter.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A percentage metric whose denominator is zero.
    #[error("metric `{metric}` is undefined: denominator is zero")]
    DivisionUndefined { metric: &'static str },

    #[error("secant step after trial {trial} projected a negative storage capacity ({capacity_mwh:.6} MWh)")]
    NegativeCapacityProjection { capacity_mwh: f64, trial: usize },

    #[error("infeasible scenario: {reason}")]
    InfeasibleScenario { reason: String },

    /// Malformed or misaligned hourly input series.
    #[error("series error: {0}")]
    Series(String),

    #[error("timestamp parse error: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    /// Returns `true` for scenarios that were skipped rather than failed.
    pub fn is_infeasible(&self) -> bool {
        matches!(self, Self::InfeasibleScenario { .. })
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
