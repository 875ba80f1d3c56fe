//! # Minute Data
//!
//! `minute_data` loads minute-by-minute OHLCV (Open, High, Low, Close, Volume)
//! candles spanning many trading days, removes days whose session is not
//! complete, and derives a handful of candle-shape features.
//!
//! The crate is organised around a few pieces:
//!
//! - **Loading**: CSV parsing with flexible headers and timestamp formats
//! - **Sessions**: the expected-session rule and per-day completeness checks
//! - **Stock**: a cleaned candle series with consistent bookkeeping
//! - **Features**: EMA, body/head/tail/range and their relative sizes
//! - **Frames**: conversion to polars `DataFrame`s and a union helper
//!
//! ## Usage Example
//!
//! ```no_run
//! use minute_data::stock::{Stock, StockOptions};
//!
//! let mut stock = Stock::from_csv("INFY_minute.csv", &StockOptions::default())?;
//! println!(
//!     "{} candles over {} complete days",
//!     stock.total_candles, stock.traded_days
//! );
//!
//! stock.add_features(50)?;
//! # Ok::<(), minute_data::DataError>(())
//! ```

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod features;
pub mod frame;
pub mod loader;
pub mod session;
pub mod stock;
pub mod symbols;
pub mod utils;

pub use features::{CandleFeatures, CandleField};
pub use session::{CandleDuration, DayInfo, SessionRule, TradingDay};
pub use stock::{Stock, StockOptions};
pub use symbols::SymbolDirectory;

/// Errors that can occur while loading or cleaning candle data
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Data loading error: {0}")]
    DataLoadError(String),

    #[error("Parameter validation error: {0}")]
    ParameterError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Polars error: {0}")]
    Polars(String),

    #[error(transparent)]
    Math(#[from] trade_math::MathError),
}

impl From<polars::prelude::PolarsError> for DataError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        DataError::Polars(err.to_string())
    }
}

/// Result type with the crate error
pub type Result<T> = std::result::Result<T, DataError>;

/// Represents OHLCV (Open, High, Low, Close, Volume) data for a specific minute
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcvData {
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
    /// Volume
    pub volume: f64,
}

/// Minute-level OHLCV data with timestamp
///
/// Timestamps are exchange-local wall-clock time; a trading day is the
/// calendar date of that wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinuteOhlcv {
    /// Timestamp of the data point
    pub timestamp: NaiveDateTime,
    /// OHLCV data
    pub data: OhlcvData,
}

impl MinuteOhlcv {
    /// Calendar date the candle belongs to
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// High minus low
    pub fn range(&self) -> f64 {
        (self.data.high - self.data.low).abs()
    }

    /// Midpoint between high and low
    pub fn midpoint(&self) -> f64 {
        (self.data.high + self.data.low) / 2.0
    }

    /// True when the candle closed above its open
    pub fn is_bullish(&self) -> bool {
        self.data.close > self.data.open
    }
}
