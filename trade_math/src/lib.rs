//! # Trade Math
//!
//! Numeric helpers shared by the candle crates: the exponential moving average
//! used for candle features and equal-width histogram binning used by the
//! charts.

use thiserror::Error;

pub mod histogram;
pub mod moving_averages;

pub use histogram::Histogram;
pub use moving_averages::{ewm_mean, ExponentialMovingAverage};

/// Errors that can occur in trading-related calculations
#[derive(Error, Debug)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for trading math operations
pub type Result<T> = std::result::Result<T, MathError>;
