//! CSV loading and writing for minute candles
//!
//! Header names are matched case-insensitively and a `timestamp` column is
//! accepted in place of `date`. Only the date and OHLCV columns are read;
//! anything else in the file is ignored.

use crate::{DataError, MinuteOhlcv, OhlcvData, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Columns every candle file must provide, in canonical order
pub const REQUIRED_COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"];

/// Load minute-level OHLCV data from a CSV file
///
/// The expected CSV format is:
/// date,open,high,low,close,volume
/// 2015-02-02 09:15:00+05:30,100.5,101.2,100.4,100.8,5000
///
/// # Arguments
/// * `file_path` - Path to the CSV file
///
/// # Returns
/// * `Result<Vec<MinuteOhlcv>>` - Candles sorted by timestamp
pub fn load_minute_data<P: AsRef<Path>>(file_path: P) -> Result<Vec<MinuteOhlcv>> {
    let path = file_path.as_ref();
    let file = File::open(path).map_err(|e| {
        DataError::DataLoadError(format!("Failed to open {}: {}", path.display(), e))
    })?;

    let data = read_minute_data(file)?;
    log::info!("Loaded {} candles from {}", data.len(), path.display());
    Ok(data)
}

/// Parse minute-level OHLCV data from any CSV reader
pub fn read_minute_data<R: Read>(reader: R) -> Result<Vec<MinuteOhlcv>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = ColumnIndex::from_headers(reader.headers()?)?;
    let mut data = Vec::new();

    for (i, record) in reader.records().enumerate() {
        // header is line 1
        let line = i + 2;
        let record = record?;
        data.push(columns.parse_record(&record, line)?);
    }

    if data.is_empty() {
        return Err(DataError::DataLoadError(
            "No data found in file".to_string(),
        ));
    }

    // Stable sort keeps the first of any duplicated timestamps in front
    data.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    let before = data.len();
    data.dedup_by(|later, earlier| later.timestamp == earlier.timestamp);
    if data.len() != before {
        log::warn!(
            "Dropped {} rows with duplicate timestamps",
            before - data.len()
        );
    }

    Ok(data)
}

/// Write candles in the canonical `date,open,high,low,close,volume` layout
pub fn write_minute_data<P: AsRef<Path>>(file_path: P, data: &[MinuteOhlcv]) -> Result<()> {
    let mut writer = csv::Writer::from_path(file_path)?;
    writer.write_record(REQUIRED_COLUMNS)?;

    for candle in data {
        writer.write_record(&[
            format_timestamp(&candle.timestamp),
            candle.data.open.to_string(),
            candle.data.high.to_string(),
            candle.data.low.to_string(),
            candle.data.close.to_string(),
            candle.data.volume.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Parse a timestamp in any of the supported layouts.
///
/// Offsets are accepted but dropped: the wall-clock time at the exchange is
/// what decides which trading day a candle belongs to.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_local());
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Ok(dt.naive_local());
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(dt);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN));
    }

    Err(DataError::InvalidData(format!(
        "Unrecognised timestamp '{}'",
        raw
    )))
}

/// Format a timestamp the way `write_minute_data` stores it
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Round a price to two decimals
pub fn round_price(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Positions of the required columns inside a header row
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let names: Vec<String> = headers
            .iter()
            .map(|h| {
                let lower = h.trim().to_lowercase();
                if lower == "timestamp" {
                    "date".to_string()
                } else {
                    lower
                }
            })
            .collect();

        let find = |column: &str| {
            names.iter().position(|n| n == column).ok_or_else(|| {
                DataError::DataLoadError(format!(
                    "Missing required column '{}' (found: {})",
                    column,
                    names.join(",")
                ))
            })
        };

        Ok(Self {
            date: find("date")?,
            open: find("open")?,
            high: find("high")?,
            low: find("low")?,
            close: find("close")?,
            volume: find("volume")?,
        })
    }

    fn parse_record(&self, record: &StringRecord, line: usize) -> Result<MinuteOhlcv> {
        let field = |idx: usize, name: &str| {
            record.get(idx).ok_or_else(|| {
                DataError::DataLoadError(format!("Missing {} at line {}", name, line))
            })
        };
        let number = |idx: usize, name: &str| -> Result<f64> {
            field(idx, name)?.parse::<f64>().map_err(|e| {
                DataError::DataLoadError(format!("Invalid {} at line {}: {}", name, line, e))
            })
        };

        let timestamp = parse_timestamp(field(self.date, "date")?).map_err(|e| {
            DataError::DataLoadError(format!("Invalid timestamp at line {}: {}", line, e))
        })?;

        Ok(MinuteOhlcv {
            timestamp,
            data: OhlcvData {
                open: round_price(number(self.open, "open price")?),
                high: round_price(number(self.high, "high price")?),
                low: round_price(number(self.low, "low price")?),
                close: round_price(number(self.close, "close price")?),
                volume: number(self.volume, "volume")?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use rstest::rstest;

    #[rstest]
    #[case("2015-02-02 09:15:00+05:30", 9, 15)]
    #[case("2015-02-02T09:16:00+05:30", 9, 16)]
    #[case("2015-02-02T09:17:00Z", 9, 17)]
    #[case("2015-02-02 09:18:00", 9, 18)]
    #[case("2015-02-02 09:19", 9, 19)]
    #[case("2015-02-02", 0, 0)]
    fn test_parse_timestamp_formats(#[case] raw: &str, #[case] hour: u32, #[case] minute: u32) {
        let ts = parse_timestamp(raw).unwrap();
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2015, 2, 2).unwrap());
        assert_eq!(ts.hour(), hour);
        assert_eq!(ts.minute(), minute);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_read_with_timestamp_header_and_rounding() {
        let csv = "Timestamp,Open,High,Low,Close,Volume,OI\n\
                   2015-02-02 09:16:00,10.004,10.456,9.991,10.2,150,7\n\
                   2015-02-02 09:15:00,10.0,10.5,9.9,10.1,100,7\n";
        let data = read_minute_data(csv.as_bytes()).unwrap();

        assert_eq!(data.len(), 2);
        assert_eq!(data[0].timestamp.minute(), 15);
        assert_eq!(data[1].data.open, 10.0);
        assert_eq!(data[1].data.high, 10.46);
        assert_eq!(data[1].data.low, 9.99);
        assert_eq!(data[1].data.volume, 150.0);
    }

    #[test]
    fn test_read_drops_duplicate_timestamps() {
        let csv = "date,open,high,low,close,volume\n\
                   2015-02-02 09:15:00,1,2,0.5,1.5,10\n\
                   2015-02-02 09:15:00,9,9,9,9,90\n\
                   2015-02-02 09:16:00,1,2,0.5,1.5,10\n";
        let data = read_minute_data(csv.as_bytes()).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].data.open, 1.0);
    }

    #[test]
    fn test_read_missing_column() {
        let csv = "date,open,high,low,close\n2015-02-02 09:15:00,1,2,0.5,1.5\n";
        let err = read_minute_data(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("volume"));
    }

    #[test]
    fn test_read_empty_body() {
        let csv = "date,open,high,low,close,volume\n";
        assert!(matches!(
            read_minute_data(csv.as_bytes()),
            Err(DataError::DataLoadError(_))
        ));
    }

    #[test]
    fn test_round_price() {
        assert_eq!(round_price(1.005_1), 1.01);
        assert_eq!(round_price(2.344), 2.34);
    }
}
