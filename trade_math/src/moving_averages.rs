//! Moving average calculation implementations
//!
//! The exponential moving average here is the recursive form with no bias
//! adjustment: the first observation seeds the average and every later value
//! is blended in with `alpha = 2 / (span + 1)`.

use crate::{MathError, Result};

/// Exponential Moving Average (EMA) implementation
#[derive(Debug, Clone)]
pub struct ExponentialMovingAverage {
    span: usize,
    alpha: f64,
    current_ema: Option<f64>,
}

impl ExponentialMovingAverage {
    /// Create a new Exponential Moving Average with the specified span
    pub fn new(span: usize) -> Result<Self> {
        if span == 0 {
            return Err(MathError::InvalidInput(
                "Span must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            span,
            alpha: 2.0 / (span as f64 + 1.0),
            current_ema: None,
        })
    }

    /// Update the EMA with a new value and return the updated average
    pub fn update(&mut self, value: f64) -> Result<f64> {
        if !value.is_finite() {
            return Err(MathError::InvalidInput(format!(
                "EMA input must be finite, got {}",
                value
            )));
        }

        let next = match self.current_ema {
            None => value,
            // EMA = alpha * value + (1 - alpha) * EMA(previous)
            Some(current) => self.alpha * value + (1.0 - self.alpha) * current,
        };
        self.current_ema = Some(next);

        Ok(next)
    }

    /// Get the current EMA value
    pub fn value(&self) -> Result<f64> {
        self.current_ema.ok_or_else(|| {
            MathError::InsufficientData("EMA has not seen any values yet".to_string())
        })
    }

    /// Get the configured span
    pub fn span(&self) -> usize {
        self.span
    }

    /// Get the smoothing factor
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Reset the EMA, clearing all values
    pub fn reset(&mut self) {
        self.current_ema = None;
    }
}

/// Compute the EMA of every prefix of `values`.
///
/// The output has the same length as the input.
pub fn ewm_mean(values: &[f64], span: usize) -> Result<Vec<f64>> {
    let mut ema = ExponentialMovingAverage::new(span)?;
    values.iter().map(|&v| ema.update(v)).collect()
}
