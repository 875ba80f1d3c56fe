//! Equal-width histogram binning

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Equal-width histogram over a set of values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// Bin edges, `counts.len() + 1` of them
    pub edges: Vec<f64>,
    /// Number of values per bin
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Bin `values` into `bins` equal-width buckets.
    ///
    /// The last bin is closed on the right so the maximum is counted. Non-finite
    /// values are skipped. When every value is identical the single value is
    /// centred in a unit-wide range.
    pub fn new(values: &[f64], bins: usize) -> Result<Self> {
        if bins == 0 {
            return Err(MathError::InvalidInput(
                "Bin count must be greater than zero".to_string(),
            ));
        }

        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return Err(MathError::InsufficientData(
                "No finite values to bin".to_string(),
            ));
        }

        let mut min = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let mut max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if min == max {
            min -= 0.5;
            max += 0.5;
        }

        let width = (max - min) / bins as f64;
        let edges: Vec<f64> = (0..=bins).map(|i| min + width * i as f64).collect();
        let mut counts = vec![0usize; bins];

        for value in finite {
            let idx = (((value - min) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }

        Ok(Self { edges, counts })
    }

    /// Number of bins
    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    /// Largest bin count
    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// Iterate `(lower, upper, count)` per bin
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64, usize)> + '_ {
        self.edges
            .windows(2)
            .zip(self.counts.iter())
            .map(|(edge, &count)| (edge[0], edge[1], count))
    }
}
