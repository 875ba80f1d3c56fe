//! # Candle Charts
//!
//! SVG charts for exploring a cleaned candle series:
//!
//! - **Histogram** of any candle or feature column
//! - **Single candle** drawn large, with wick end markers
//! - **Candle pair** side by side on a shared vertical scale
//! - **Price action** candlesticks over a time range with a volume panel and
//!   a marker at every session open

use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod candle;
pub mod histogram;
pub mod price_action;

pub use candle::{plot_candle_pair, plot_single_candle};
pub use histogram::{plot_field_histogram, plot_histogram, DEFAULT_BINS};
pub use price_action::plot_price_action;

/// Errors raised while preparing or drawing a chart
#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Invalid chart input: {0}")]
    InvalidInput(String),

    #[error("Drawing failed: {0}")]
    Drawing(String),

    #[error(transparent)]
    Data(#[from] minute_data::DataError),

    #[error(transparent)]
    Math(#[from] trade_math::MathError),
}

/// Result type for chart operations
pub type Result<T> = std::result::Result<T, ChartError>;

pub(crate) fn drawing_error<E: std::fmt::Display>(err: E) -> ChartError {
    ChartError::Drawing(err.to_string())
}

/// Canvas size of a chart in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartStyle {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width: 1600,
            height: 800,
        }
    }
}

impl ChartStyle {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.width < 100 || self.height < 100 {
            return Err(ChartError::InvalidInput(format!(
                "Canvas {}x{} is too small",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Body colour of a candle that closed above its open
pub const GAIN_COLOR: RGBColor = RGBColor(154, 205, 50);
/// Body colour of every other candle
pub const LOSS_COLOR: RGBColor = RGBColor(220, 20, 60);
/// Histogram bars
pub const BAR_COLOR: RGBColor = RGBColor(231, 63, 75);
/// Session open markers
pub const SESSION_COLOR: RGBColor = RGBColor(255, 215, 0);
