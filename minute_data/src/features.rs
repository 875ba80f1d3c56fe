//! Candle-shape features
//!
//! Every candle gets its body, upper wick (head), lower wick (tail) and full
//! range, plus those sizes expressed as a percentage of the close EMA and of
//! the candle's own open/close midpoint.

use crate::{DataError, MinuteOhlcv, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use trade_math::ewm_mean;

/// Default EMA span for the relative-size features
pub const DEFAULT_EMA_SPAN: usize = 50;

/// Derived features for one candle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandleFeatures {
    pub ema: f64,
    pub center: f64,
    pub head: f64,
    pub tail: f64,
    pub body: f64,
    pub range: f64,
    pub head_pct_ema: f64,
    pub tail_pct_ema: f64,
    pub body_pct_ema: f64,
    pub head_pct_center: f64,
    pub tail_pct_center: f64,
    pub body_pct_center: f64,
}

impl CandleFeatures {
    fn from_candle(candle: &MinuteOhlcv, ema: f64) -> Self {
        let d = &candle.data;
        let upper = d.open.max(d.close);
        let lower = d.open.min(d.close);

        let center = (d.open + d.close) / 2.0;
        let head = d.high - upper;
        let tail = lower - d.low;
        let body = (d.open - d.close).abs();
        let range = (d.high - d.low).abs();

        Self {
            ema,
            center,
            head,
            tail,
            body,
            range,
            head_pct_ema: percent(head, ema),
            tail_pct_ema: percent(tail, ema),
            body_pct_ema: percent(body, ema),
            head_pct_center: percent(head, center),
            tail_pct_center: percent(tail, center),
            body_pct_center: percent(body, center),
        }
    }
}

// NaN when the base is zero, matching float division semantics of 0/0
fn percent(value: f64, base: f64) -> f64 {
    value / base * 100.0
}

/// Compute features for every candle in order
pub fn compute_features(candles: &[MinuteOhlcv], ema_span: usize) -> Result<Vec<CandleFeatures>> {
    let closes: Vec<f64> = candles.iter().map(|c| c.data.close).collect();
    let ema = ewm_mean(&closes, ema_span)?;

    Ok(candles
        .iter()
        .zip(ema)
        .map(|(candle, ema)| CandleFeatures::from_candle(candle, ema))
        .collect())
}

/// Any numeric column of a candle or its features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandleField {
    Open,
    High,
    Low,
    Close,
    Volume,
    Ema,
    Center,
    Head,
    Tail,
    Body,
    Range,
    HeadPctEma,
    TailPctEma,
    BodyPctEma,
    HeadPctCenter,
    TailPctCenter,
    BodyPctCenter,
}

impl CandleField {
    /// All fields in column order
    pub const ALL: [CandleField; 17] = [
        CandleField::Open,
        CandleField::High,
        CandleField::Low,
        CandleField::Close,
        CandleField::Volume,
        CandleField::Ema,
        CandleField::Center,
        CandleField::Head,
        CandleField::Tail,
        CandleField::Body,
        CandleField::Range,
        CandleField::HeadPctEma,
        CandleField::TailPctEma,
        CandleField::BodyPctEma,
        CandleField::HeadPctCenter,
        CandleField::TailPctCenter,
        CandleField::BodyPctCenter,
    ];

    /// Feature columns, i.e. everything but raw OHLCV
    pub fn features() -> &'static [CandleField] {
        &Self::ALL[5..]
    }

    /// Column name
    pub fn name(&self) -> &'static str {
        match self {
            CandleField::Open => "open",
            CandleField::High => "high",
            CandleField::Low => "low",
            CandleField::Close => "close",
            CandleField::Volume => "volume",
            CandleField::Ema => "ema",
            CandleField::Center => "center",
            CandleField::Head => "head",
            CandleField::Tail => "tail",
            CandleField::Body => "body",
            CandleField::Range => "range",
            CandleField::HeadPctEma => "head_pct_ema",
            CandleField::TailPctEma => "tail_pct_ema",
            CandleField::BodyPctEma => "body_pct_ema",
            CandleField::HeadPctCenter => "head_pct_center",
            CandleField::TailPctCenter => "tail_pct_center",
            CandleField::BodyPctCenter => "body_pct_center",
        }
    }

    /// Whether the field needs computed features
    pub fn is_feature(&self) -> bool {
        !matches!(
            self,
            CandleField::Open
                | CandleField::High
                | CandleField::Low
                | CandleField::Close
                | CandleField::Volume
        )
    }

    /// Read the field from a candle and, for feature fields, its features
    pub fn value(&self, candle: &MinuteOhlcv, features: Option<&CandleFeatures>) -> Option<f64> {
        let d = &candle.data;
        match self {
            CandleField::Open => Some(d.open),
            CandleField::High => Some(d.high),
            CandleField::Low => Some(d.low),
            CandleField::Close => Some(d.close),
            CandleField::Volume => Some(d.volume),
            _ => features.map(|f| self.feature_value(f)),
        }
    }

    fn feature_value(&self, f: &CandleFeatures) -> f64 {
        match self {
            CandleField::Ema => f.ema,
            CandleField::Center => f.center,
            CandleField::Head => f.head,
            CandleField::Tail => f.tail,
            CandleField::Body => f.body,
            CandleField::Range => f.range,
            CandleField::HeadPctEma => f.head_pct_ema,
            CandleField::TailPctEma => f.tail_pct_ema,
            CandleField::BodyPctEma => f.body_pct_ema,
            CandleField::HeadPctCenter => f.head_pct_center,
            CandleField::TailPctCenter => f.tail_pct_center,
            CandleField::BodyPctCenter => f.body_pct_center,
            _ => f64::NAN,
        }
    }
}

impl fmt::Display for CandleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CandleField {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        CandleField::ALL
            .iter()
            .copied()
            .find(|field| field.name() == wanted)
            .ok_or_else(|| DataError::ParameterError(format!("Unknown field '{}'", s)))
    }
}

/// Extract one field for every candle.
///
/// Feature fields require `features` to be present and aligned with `candles`.
pub fn field_values(
    candles: &[MinuteOhlcv],
    features: Option<&[CandleFeatures]>,
    field: CandleField,
) -> Result<Vec<f64>> {
    if field.is_feature() {
        let features = features.ok_or_else(|| {
            DataError::InvalidData(format!("Field '{}' needs computed features", field))
        })?;
        if features.len() != candles.len() {
            return Err(DataError::InvalidData(
                "Features and candles must be the same length".to_string(),
            ));
        }
        return Ok(features.iter().map(|f| field.feature_value(f)).collect());
    }

    Ok(candles
        .iter()
        .filter_map(|c| field.value(c, None))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OhlcvData;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn candle(open: f64, high: f64, low: f64, close: f64) -> MinuteOhlcv {
        MinuteOhlcv {
            timestamp: NaiveDate::from_ymd_opt(2015, 2, 2)
                .unwrap()
                .and_hms_opt(9, 15, 0)
                .unwrap(),
            data: OhlcvData {
                open,
                high,
                low,
                close,
                volume: 10.0,
            },
        }
    }

    #[test]
    fn test_shape_features() {
        let candles = vec![candle(100.0, 104.0, 97.0, 102.0)];
        let features = compute_features(&candles, DEFAULT_EMA_SPAN).unwrap();
        let f = features[0];

        assert_relative_eq!(f.ema, 102.0);
        assert_relative_eq!(f.center, 101.0);
        assert_relative_eq!(f.head, 2.0);
        assert_relative_eq!(f.tail, 3.0);
        assert_relative_eq!(f.body, 2.0);
        assert_relative_eq!(f.range, 7.0);
        assert_relative_eq!(f.head_pct_ema, 2.0 / 102.0 * 100.0);
        assert_relative_eq!(f.body_pct_center, 2.0 / 101.0 * 100.0);
    }

    #[test]
    fn test_bearish_candle_wicks() {
        let candles = vec![candle(102.0, 103.0, 99.0, 100.0)];
        let f = compute_features(&candles, 3).unwrap()[0];
        assert_relative_eq!(f.head, 1.0);
        assert_relative_eq!(f.tail, 1.0);
        assert_relative_eq!(f.body, 2.0);
    }

    #[test]
    fn test_ema_follows_closes() {
        let candles = vec![
            candle(1.0, 1.0, 1.0, 10.0),
            candle(1.0, 1.0, 1.0, 20.0),
        ];
        let features = compute_features(&candles, 3).unwrap();
        assert_relative_eq!(features[1].ema, 15.0);
    }

    #[test]
    fn test_field_parsing_and_values() {
        assert_eq!("Body_Pct_EMA".parse::<CandleField>().unwrap(), CandleField::BodyPctEma);
        assert!("wick".parse::<CandleField>().is_err());
        assert_eq!(CandleField::features().len(), 12);

        let candles = vec![candle(100.0, 104.0, 97.0, 102.0)];
        assert_eq!(
            field_values(&candles, None, CandleField::High).unwrap(),
            vec![104.0]
        );
        assert!(field_values(&candles, None, CandleField::Range).is_err());

        let features = compute_features(&candles, 50).unwrap();
        assert_eq!(
            field_values(&candles, Some(&features), CandleField::Range).unwrap(),
            vec![7.0]
        );
    }
}
