//! A cleaned candle series for one instrument
//!
//! `Stock` owns the candles and keeps the bookkeeping (`total_candles`,
//! `traded_days`, candle duration) in step with them whenever days are dropped.

use crate::features::{compute_features, CandleFeatures};
use crate::loader::load_minute_data;
use crate::session::{judge_days, lookup_day, CandleDuration, DayInfo, SessionRule, TradingDay};
use crate::symbols::SymbolDirectory;
use crate::{DataError, MinuteOhlcv, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Options controlling how a `Stock` is built
#[derive(Debug, Clone)]
pub struct StockOptions {
    /// Expected trading session
    pub rule: SessionRule,
    /// Drop days that do not cover the full session
    pub remove_incomplete_days: bool,
    /// Optional listing used to resolve the symbol from the file name
    pub directory: Option<SymbolDirectory>,
}

impl Default for StockOptions {
    fn default() -> Self {
        Self {
            rule: SessionRule::default(),
            remove_incomplete_days: true,
            directory: None,
        }
    }
}

/// Candle series for one instrument plus its bookkeeping
#[derive(Debug, Clone)]
pub struct Stock {
    /// Where the candles came from
    pub source: PathBuf,
    /// Exchange symbol, when resolvable
    pub symbol: Option<String>,
    /// Company name, when resolvable
    pub company_name: Option<String>,
    /// Time-ordered candles
    pub candles: Vec<MinuteOhlcv>,
    /// Number of candles in `candles`
    pub total_candles: usize,
    /// Number of distinct dates in `candles`
    pub traded_days: usize,
    /// Duration of one candle
    pub duration: CandleDuration,
    /// Candles a complete day holds
    pub candles_per_day: usize,
    /// Session rule used for completeness
    pub rule: SessionRule,
    /// Dates found incomplete by the last check
    pub incomplete_day_dates: Vec<NaiveDate>,
    expected_span: Duration,
    features: Option<Vec<CandleFeatures>>,
}

impl Stock {
    /// Load and clean a candle CSV
    pub fn from_csv<P: AsRef<Path>>(path: P, options: &StockOptions) -> Result<Self> {
        let candles = load_minute_data(path.as_ref())?;
        Self::from_candles(candles, path.as_ref(), options)
    }

    /// Build from time-ordered candles
    pub fn from_candles<P: AsRef<Path>>(
        candles: Vec<MinuteOhlcv>,
        source: P,
        options: &StockOptions,
    ) -> Result<Self> {
        options.rule.validate()?;
        if candles
            .windows(2)
            .any(|pair| pair[1].timestamp <= pair[0].timestamp)
        {
            return Err(DataError::InvalidData(
                "Candles must be strictly increasing in time".to_string(),
            ));
        }

        let duration = CandleDuration::infer(&candles, &options.rule)?;
        let candles_per_day = options.rule.candles_per_day(&duration)?;
        let expected_span = options.rule.expected_span(&duration)?;
        let source = source.as_ref().to_path_buf();

        let (symbol, company_name) = options
            .directory
            .as_ref()
            .and_then(|dir| dir.lookup_path(&source))
            .map(|(s, n)| (Some(s.to_string()), Some(n.to_string())))
            .unwrap_or((None, None));

        let mut stock = Self {
            source,
            symbol,
            company_name,
            total_candles: candles.len(),
            traded_days: 0,
            candles_per_day,
            duration,
            rule: options.rule,
            candles,
            incomplete_day_dates: Vec::new(),
            expected_span,
            features: None,
        };
        stock.refresh_counts();
        stock.find_incomplete_days();

        if options.remove_incomplete_days {
            stock.remove_incomplete_days();
        }

        Ok(stock)
    }

    /// Label used in chart titles and log lines
    pub fn label(&self) -> String {
        match &self.symbol {
            Some(symbol) => symbol.clone(),
            None => self
                .source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "candles".to_string()),
        }
    }

    /// Judge every day against the session rule
    pub fn trading_days(&self) -> Vec<TradingDay> {
        judge_days(&self.candles, self.candles_per_day, self.expected_span)
    }

    /// Recompute the list of incomplete dates
    pub fn find_incomplete_days(&mut self) -> &[NaiveDate] {
        self.incomplete_day_dates = self
            .trading_days()
            .into_iter()
            .filter(|day| !day.is_complete)
            .map(|day| day.date)
            .collect();

        log::info!(
            "{}/{} incomplete days",
            self.incomplete_day_dates.len(),
            self.traded_days
        );
        &self.incomplete_day_dates
    }

    /// Drop every candle on an incomplete date and refresh the counts.
    ///
    /// Returns the number of days removed.
    pub fn remove_incomplete_days(&mut self) -> usize {
        if self.incomplete_day_dates.is_empty() {
            return 0;
        }

        let bad: HashSet<NaiveDate> = self.incomplete_day_dates.iter().copied().collect();
        let before_days = self.traded_days;

        match self.features.take() {
            Some(features) => {
                let (candles, features): (Vec<_>, Vec<_>) = self
                    .candles
                    .drain(..)
                    .zip(features)
                    .filter(|(candle, _)| !bad.contains(&candle.date()))
                    .unzip();
                self.candles = candles;
                self.features = Some(features);
            }
            None => self.candles.retain(|candle| !bad.contains(&candle.date())),
        }

        self.refresh_counts();
        let removed = before_days - self.traded_days;
        log::info!(
            "Removed {} incomplete days, {} candles over {} days remain",
            removed,
            self.total_candles,
            self.traded_days
        );
        removed
    }

    fn refresh_counts(&mut self) {
        self.total_candles = self.candles.len();
        self.traded_days = self
            .candles
            .iter()
            .map(MinuteOhlcv::date)
            .collect::<HashSet<_>>()
            .len();
    }

    /// Distinct dates in calendar order
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.candles.iter().map(MinuteOhlcv::date).collect();
        dates.dedup();
        dates
    }

    /// Candles of a single date
    pub fn day_candles(&self, date: NaiveDate) -> &[MinuteOhlcv] {
        let start = self.candles.partition_point(|c| c.date() < date);
        let end = self.candles.partition_point(|c| c.date() <= date);
        &self.candles[start..end]
    }

    /// Existence, bounds and candle count for a date
    pub fn trading_day_info(&self, date: NaiveDate) -> DayInfo {
        lookup_day(&self.candles, date, self.expected_span)
    }

    /// Indices of candles stamped exactly at `target`.
    ///
    /// A target at midnight stands for the session open of that date.
    pub fn datetime_index(&self, target: NaiveDateTime) -> Vec<usize> {
        let target = if target.time() == NaiveTime::MIN {
            target.date().and_time(self.rule.open())
        } else {
            target
        };

        let start = self.candles.partition_point(|c| c.timestamp < target);
        let end = self.candles.partition_point(|c| c.timestamp <= target);
        (start..end).collect()
    }

    /// Look up a single candle by timestamp
    pub fn candle_at(&self, target: NaiveDateTime) -> Result<&MinuteOhlcv> {
        self.datetime_index(target)
            .first()
            .map(|&idx| &self.candles[idx])
            .ok_or_else(|| DataError::NotFound(format!("No candle at {}", target)))
    }

    /// Inclusive slice of candles between two timestamps present in the data
    pub fn range(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<&[MinuteOhlcv]> {
        let first = *self
            .datetime_index(start)
            .first()
            .ok_or_else(|| DataError::NotFound(format!("No candle at {}", start)))?;
        let last = *self
            .datetime_index(end)
            .first()
            .ok_or_else(|| DataError::NotFound(format!("No candle at {}", end)))?;

        if last < first {
            return Err(DataError::ParameterError(format!(
                "End {} is before start {}",
                end, start
            )));
        }

        Ok(&self.candles[first..=last])
    }

    /// Compute and store candle features
    pub fn add_features(&mut self, ema_span: usize) -> Result<&[CandleFeatures]> {
        let features = compute_features(&self.candles, ema_span)?;
        let stored = self.features.insert(features);
        Ok(stored.as_slice())
    }

    /// Features computed by `add_features`, aligned with `candles`
    pub fn features(&self) -> Option<&[CandleFeatures]> {
        self.features.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OhlcvData;
    use chrono::Duration;

    fn session_day(date: NaiveDate, count: usize) -> Vec<MinuteOhlcv> {
        let open = SessionRule::default().open();
        (0..count)
            .map(|i| MinuteOhlcv {
                timestamp: date.and_time(open) + Duration::minutes(i as i64),
                data: OhlcvData {
                    open: 100.0,
                    high: 101.0,
                    low: 99.0,
                    close: 100.5,
                    volume: 10.0,
                },
            })
            .collect()
    }

    fn three_days() -> Vec<MinuteOhlcv> {
        let d = |day| NaiveDate::from_ymd_opt(2015, 2, day).unwrap();
        let mut candles = session_day(d(2), 375);
        candles.extend(session_day(d(3), 120));
        candles.extend(session_day(d(4), 375));
        candles
    }

    #[test]
    fn test_keep_incomplete_days() {
        let options = StockOptions {
            remove_incomplete_days: false,
            ..StockOptions::default()
        };
        let stock = Stock::from_candles(three_days(), "x.csv", &options).unwrap();

        assert_eq!(stock.total_candles, 870);
        assert_eq!(stock.traded_days, 3);
        assert_eq!(stock.candles_per_day, 375);
        assert_eq!(
            stock.incomplete_day_dates,
            vec![NaiveDate::from_ymd_opt(2015, 2, 3).unwrap()]
        );
    }

    #[test]
    fn test_remove_incomplete_days_updates_bookkeeping() {
        let mut stock = Stock::from_candles(three_days(), "x.csv", &StockOptions::default()).unwrap();

        assert_eq!(stock.total_candles, 750);
        assert_eq!(stock.candles.len(), 750);
        assert_eq!(stock.traded_days, 2);
        assert_eq!(stock.dates().len(), 2);

        // second pass is a no-op
        stock.find_incomplete_days();
        assert!(stock.incomplete_day_dates.is_empty());
        assert_eq!(stock.remove_incomplete_days(), 0);
    }

    #[test]
    fn test_features_follow_removal() {
        let options = StockOptions {
            remove_incomplete_days: false,
            ..StockOptions::default()
        };
        let mut stock = Stock::from_candles(three_days(), "x.csv", &options).unwrap();
        stock.add_features(50).unwrap();

        assert_eq!(stock.remove_incomplete_days(), 1);
        assert_eq!(stock.features().unwrap().len(), stock.candles.len());
    }

    #[test]
    fn test_datetime_index_midnight_maps_to_open() {
        let stock = Stock::from_candles(three_days(), "x.csv", &StockOptions::default()).unwrap();
        let midnight = NaiveDate::from_ymd_opt(2015, 2, 4)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        assert_eq!(stock.datetime_index(midnight), vec![375]);
        assert!(stock
            .datetime_index(midnight + Duration::hours(20))
            .is_empty());
    }

    #[test]
    fn test_range_and_lookup() {
        let stock = Stock::from_candles(three_days(), "x.csv", &StockOptions::default()).unwrap();
        let day = NaiveDate::from_ymd_opt(2015, 2, 2).unwrap();
        let start = day.and_hms_opt(9, 15, 0).unwrap();
        let end = day.and_hms_opt(9, 24, 0).unwrap();

        assert_eq!(stock.range(start, end).unwrap().len(), 10);
        assert!(stock.range(end, start).is_err());
        assert!(stock.candle_at(day.and_hms_opt(18, 0, 0).unwrap()).is_err());
        assert_eq!(stock.day_candles(day).len(), 375);
    }

    #[test]
    fn test_symbol_resolution() {
        let options = StockOptions {
            directory: Some(SymbolDirectory::from_pairs(vec![("INFY", "Infosys Limited")])),
            ..StockOptions::default()
        };
        let stock = Stock::from_candles(three_days(), "data/infy_minute.csv", &options).unwrap();
        assert_eq!(stock.symbol.as_deref(), Some("INFY"));
        assert_eq!(stock.company_name.as_deref(), Some("Infosys Limited"));
        assert_eq!(stock.label(), "INFY");
    }

    #[test]
    fn test_daily_candles_with_session_rule() {
        let first = NaiveDate::from_ymd_opt(2015, 2, 2).unwrap();
        let candles: Vec<MinuteOhlcv> = (0..3)
            .map(|d| MinuteOhlcv {
                timestamp: (first + Duration::days(d)).and_time(NaiveTime::MIN),
                data: OhlcvData {
                    open: 100.0,
                    high: 101.0,
                    low: 99.0,
                    close: 100.5,
                    volume: 10.0,
                },
            })
            .collect();

        let stock = Stock::from_candles(candles, "daily.csv", &StockOptions::default()).unwrap();
        assert_eq!(stock.candles_per_day, 1);
        assert_eq!(stock.traded_days, 3);
        assert!(stock.incomplete_day_dates.is_empty());
        assert!(stock.trading_day_info(first).is_full_day);
    }

    #[test]
    fn test_rule_from_config_is_validated() {
        let rule: std::result::Result<SessionRule, _> =
            serde_json::from_str(r#"{ "open": "00:00:00", "minutes": 0 }"#);
        assert!(rule.is_err());

        let options = StockOptions {
            rule: SessionRule::new(NaiveTime::MIN, 1440).unwrap(),
            ..StockOptions::default()
        };
        let stock = Stock::from_candles(three_days(), "x.csv", &options).unwrap();
        assert_eq!(stock.candles_per_day, 1440);
        assert_eq!(stock.traded_days, 0);
    }

    #[test]
    fn test_rejects_unsorted_candles() {
        let mut candles = three_days();
        candles.swap(0, 1);
        assert!(Stock::from_candles(candles, "x.csv", &StockOptions::default()).is_err());
    }
}
