//! Candle direction symbols and the sentences built from them

use crate::EmbedError;
use minute_data::{MinuteOhlcv, Stock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of a single candle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Movement {
    /// Close above open
    Up,
    /// Close below open
    Down,
    /// Close equal to open
    Flat,
}

impl Movement {
    /// Classify by comparing close with open
    pub fn from_prices(open: f64, close: f64) -> Self {
        if close > open {
            Movement::Up
        } else if close < open {
            Movement::Down
        } else {
            Movement::Flat
        }
    }

    /// Classify a candle
    pub fn from_candle(candle: &MinuteOhlcv) -> Self {
        Self::from_prices(candle.data.open, candle.data.close)
    }

    /// Token used in sentences
    pub fn as_str(&self) -> &'static str {
        match self {
            Movement::Up => "up",
            Movement::Down => "down",
            Movement::Flat => "flat",
        }
    }
}

impl fmt::Display for Movement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Movement {
    type Err = EmbedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "up" => Ok(Movement::Up),
            "down" => Ok(Movement::Down),
            "flat" => Ok(Movement::Flat),
            other => Err(EmbedError::WordNotFound(other.to_string())),
        }
    }
}

/// Movement of every candle, in order
pub fn movements(candles: &[MinuteOhlcv]) -> Vec<Movement> {
    candles.iter().map(Movement::from_candle).collect()
}

/// Every full window of `length` consecutive movements, as token sentences.
///
/// Returns nothing when `length` is zero or longer than the input.
pub fn sliding_sequences(movements: &[Movement], length: usize) -> Vec<Vec<String>> {
    if length == 0 {
        return Vec::new();
    }

    movements
        .windows(length)
        .map(|window| window.iter().map(|m| m.as_str().to_string()).collect())
        .collect()
}

/// One sentence per trading day of the stock
pub fn daily_sequences(stock: &Stock) -> Vec<Vec<String>> {
    stock
        .dates()
        .into_iter()
        .map(|date| {
            stock
                .day_candles(date)
                .iter()
                .map(|c| Movement::from_candle(c).as_str().to_string())
                .collect()
        })
        .collect()
}
