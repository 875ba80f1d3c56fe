//! # Candle Lab
//!
//! `candle_lab` ties the workspace crates together:
//!
//! - [`minute_data`] loads minute candles and drops incomplete trading days
//! - [`candle_charts`] draws histograms, single candles and price action
//! - [`move_embed`] learns a skip-gram embedding of candle movements
//! - [`trade_math`] holds the numeric helpers they share
//!
//! The `candle_lab` binary exposes all of it from the command line, driven by
//! an optional JSON [`config::LabConfig`].
//!
//! ## Example
//!
//! ```
//! use candle_lab::config::LabConfig;
//!
//! let config = LabConfig::from_json("{}").unwrap();
//! assert_eq!(config.ema_span, 50);
//! assert_eq!(config.session.minutes, 375);
//! ```

pub mod config;

pub use candle_charts;
pub use minute_data;
pub use move_embed;
pub use trade_math;

pub use config::{ConfigError, LabConfig};
