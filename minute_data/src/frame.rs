//! Polars `DataFrame` conversion and the union helper
//!
//! Frames produced here carry the candle time as an `i64` millisecond epoch
//! column named `timestamp`, followed by the OHLCV columns and, optionally, the
//! feature columns.

use crate::features::{CandleFeatures, CandleField};
use crate::{DataError, MinuteOhlcv, OhlcvData, Result};
use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;

/// Name of the time column in candle frames
pub const TIMESTAMP_COLUMN: &str = "timestamp";

const OHLCV_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Convert a timestamp to the frame's millisecond representation
pub fn to_millis(ts: &NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_millis()
}

/// Convert a frame millisecond value back to a timestamp
pub fn from_millis(millis: i64) -> Result<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| DataError::InvalidData(format!("Timestamp {} out of range", millis)))
}

/// Build a frame from candles and, optionally, their features
pub fn to_dataframe(
    candles: &[MinuteOhlcv],
    features: Option<&[CandleFeatures]>,
) -> Result<DataFrame> {
    let mut columns = vec![Series::new(
        TIMESTAMP_COLUMN,
        candles.iter().map(|c| to_millis(&c.timestamp)).collect::<Vec<i64>>(),
    )];

    for field in &CandleField::ALL[..5] {
        let values: Vec<f64> = candles
            .iter()
            .filter_map(|c| field.value(c, None))
            .collect();
        columns.push(Series::new(field.name(), values));
    }

    if let Some(features) = features {
        if features.len() != candles.len() {
            return Err(DataError::InvalidData(
                "Features and candles must be the same length".to_string(),
            ));
        }
        for field in CandleField::features() {
            let values: Vec<f64> = candles
                .iter()
                .zip(features)
                .map(|(c, f)| field.value(c, Some(f)).unwrap_or(f64::NAN))
                .collect();
            columns.push(Series::new(field.name(), values));
        }
    }

    Ok(DataFrame::new(columns)?)
}

/// Read candles back from a frame with `timestamp` and OHLCV columns
pub fn from_dataframe(df: &DataFrame) -> Result<Vec<MinuteOhlcv>> {
    let timestamps = timestamp_column(df)?;
    let mut ohlcv = Vec::with_capacity(OHLCV_COLUMNS.len());
    for name in OHLCV_COLUMNS {
        ohlcv.push(float_column(df, name)?);
    }

    timestamps
        .iter()
        .enumerate()
        .map(|(row, &millis)| {
            let value = |col: usize| {
                ohlcv[col][row].ok_or_else(|| {
                    DataError::InvalidData(format!(
                        "Missing {} at row {}",
                        OHLCV_COLUMNS[col], row
                    ))
                })
            };
            Ok(MinuteOhlcv {
                timestamp: from_millis(millis)?,
                data: OhlcvData {
                    open: value(0)?,
                    high: value(1)?,
                    low: value(2)?,
                    close: value(3)?,
                    volume: value(4)?,
                },
            })
        })
        .collect()
}

/// Union of two timestamp-keyed frames.
///
/// The result holds every column of either frame (left order first) and one
/// row per distinct timestamp in ascending order. Each cell takes the first
/// non-null value, looking at the left frame before the right one. NaN counts
/// as null. Columns keep their type; a column that is numeric on both sides
/// with different types becomes `f64`. `Datetime` and `Date` timestamps are
/// keyed by their millisecond epoch, which is also the output representation.
pub fn union_frames(left: &DataFrame, right: &DataFrame) -> Result<DataFrame> {
    let left = with_millis_timestamps(left)?;
    let right = with_millis_timestamps(right)?;
    let columns = union_schema(&left, &right)?;

    let stacked = align_columns(&left, &columns)?.vstack(&align_columns(&right, &columns)?)?;
    let firsts: Vec<Expr> = columns
        .iter()
        .map(|(name, _)| col(name).drop_nulls().first())
        .collect();

    let merged = stacked
        .lazy()
        .groupby_stable([col(TIMESTAMP_COLUMN)])
        .agg(firsts)
        .sort(TIMESTAMP_COLUMN, SortOptions::default())
        .collect()?;

    log::debug!(
        "Union of {} and {} rows gives {} rows",
        left.height(),
        right.height(),
        merged.height()
    );
    Ok(merged)
}

/// Union of two candle series, preferring `left` on shared timestamps
pub fn union_candles(left: &[MinuteOhlcv], right: &[MinuteOhlcv]) -> Result<Vec<MinuteOhlcv>> {
    let merged = union_frames(&to_dataframe(left, None)?, &to_dataframe(right, None)?)?;
    from_dataframe(&merged)
}

/// Value columns of both frames with the type each takes in the union
fn union_schema(left: &DataFrame, right: &DataFrame) -> Result<Vec<(String, DataType)>> {
    let mut columns: Vec<(String, DataType)> = Vec::new();
    for df in [left, right] {
        for series in df.get_columns() {
            let name = series.name();
            if name == TIMESTAMP_COLUMN {
                continue;
            }
            match columns.iter_mut().find(|(existing, _)| existing == name) {
                None => columns.push((name.to_string(), series.dtype().clone())),
                Some((_, dtype)) if *dtype != *series.dtype() => {
                    if !(dtype.is_numeric() && series.dtype().is_numeric()) {
                        return Err(DataError::InvalidData(format!(
                            "Column '{}' is {} in one frame and {} in the other",
                            name,
                            dtype,
                            series.dtype()
                        )));
                    }
                    *dtype = DataType::Float64;
                }
                Some(_) => {}
            }
        }
    }
    Ok(columns)
}

/// Reorder `df` to `columns`, casting and filling absent columns with nulls
fn align_columns(df: &DataFrame, columns: &[(String, DataType)]) -> Result<DataFrame> {
    let mut series = vec![df.column(TIMESTAMP_COLUMN)?.clone()];
    for (name, dtype) in columns {
        let column = match df.column(name) {
            Ok(existing) => nan_to_null(&existing.cast(dtype)?)?,
            Err(_) => Series::full_null(name, df.height(), dtype),
        };
        series.push(column);
    }
    Ok(DataFrame::new(series)?)
}

fn nan_to_null(series: &Series) -> Result<Series> {
    let mut cleaned = match series.dtype() {
        DataType::Float64 => series
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect::<Float64Chunked>()
            .into_series(),
        DataType::Float32 => series
            .f32()?
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect::<Float32Chunked>()
            .into_series(),
        _ => return Ok(series.clone()),
    };
    cleaned.rename(series.name());
    Ok(cleaned)
}

/// The timestamp column as `i64` milliseconds since the epoch
fn millis_series(df: &DataFrame) -> Result<Series> {
    let column = df
        .column(TIMESTAMP_COLUMN)
        .map_err(|_| DataError::InvalidData(format!("Frame has no '{}' column", TIMESTAMP_COLUMN)))?;

    let millis = match column.dtype() {
        DataType::Datetime(_, _) | DataType::Date => column
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
            .cast(&DataType::Int64)?,
        dtype if dtype.is_integer() => column.cast(&DataType::Int64)?,
        other => {
            return Err(DataError::InvalidData(format!(
                "Timestamp column has unsupported type {}",
                other
            )))
        }
    };

    if millis.null_count() > 0 {
        return Err(DataError::InvalidData(format!(
            "{} null timestamps",
            millis.null_count()
        )));
    }
    Ok(millis)
}

fn with_millis_timestamps(df: &DataFrame) -> Result<DataFrame> {
    let millis = millis_series(df)?;
    let mut out = df.clone();
    out.with_column(millis)?;
    Ok(out)
}

fn timestamp_column(df: &DataFrame) -> Result<Vec<i64>> {
    let series = millis_series(df)?;
    let values = series.i64()?.into_no_null_iter().collect();
    Ok(values)
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df.column(name)?.strict_cast(&DataType::Float64)?;
    let values = series
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect();
    Ok(values)
}
