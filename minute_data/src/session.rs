//! Trading sessions and day-completeness checks
//!
//! A trading day is complete when its candles cover the whole session: the
//! first and last candle are exactly the expected span apart and the day holds
//! exactly the expected number of candles.

use crate::{DataError, MinuteOhlcv, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Expected regular trading session.
///
/// Built through [`SessionRule::new`] or deserialization, both of which reject
/// a session length outside `1..=1440` minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSessionRule")]
pub struct SessionRule {
    open: NaiveTime,
    minutes: u32,
}

#[derive(Deserialize)]
struct RawSessionRule {
    open: NaiveTime,
    minutes: u32,
}

impl TryFrom<RawSessionRule> for SessionRule {
    type Error = DataError;

    fn try_from(raw: RawSessionRule) -> Result<Self> {
        SessionRule::new(raw.open, raw.minutes)
    }
}

impl Default for SessionRule {
    /// 09:15 to 15:30, 375 minutes
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 15, 0).unwrap_or(NaiveTime::MIN),
            minutes: 375,
        }
    }
}

impl SessionRule {
    /// Create a session rule, validating its length
    pub fn new(open: NaiveTime, minutes: u32) -> Result<Self> {
        let rule = Self { open, minutes };
        rule.validate()?;
        Ok(rule)
    }

    /// Check the session length
    pub fn validate(&self) -> Result<()> {
        if self.minutes == 0 || self.minutes > 24 * 60 {
            return Err(DataError::ParameterError(format!(
                "Session length must be between 1 and 1440 minutes, got {}",
                self.minutes
            )));
        }
        Ok(())
    }

    /// Session open, exchange-local
    pub fn open(&self) -> NaiveTime {
        self.open
    }

    /// Session length in minutes
    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    /// Session length in seconds
    pub fn session_seconds(&self) -> i64 {
        i64::from(self.minutes) * 60
    }

    /// Session close, exchange-local
    pub fn close(&self) -> NaiveTime {
        self.open + Duration::minutes(i64::from(self.minutes))
    }

    /// Number of candles a full day holds for the given candle duration
    pub fn candles_per_day(&self, duration: &CandleDuration) -> Result<usize> {
        self.validate()?;
        if duration.seconds <= 0 {
            return Err(DataError::ParameterError(format!(
                "Candle duration must be positive, got {}s",
                duration.seconds
            )));
        }
        let session = self.session_seconds();
        Ok(((session + duration.seconds - 1) / duration.seconds) as usize)
    }

    /// Time between the first and last candle of a full day
    pub fn expected_span(&self, duration: &CandleDuration) -> Result<Duration> {
        let per_day = self.candles_per_day(duration)? as i64;
        Ok(Duration::seconds((per_day - 1) * duration.seconds))
    }
}

/// Duration of a single candle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandleDuration {
    /// Candle duration in seconds
    pub seconds: i64,
    /// Candle duration in whole minutes
    pub minutes: i64,
    /// Candle duration in days, `None` for intraday candles
    pub days: Option<i64>,
}

impl CandleDuration {
    /// Infer the candle duration from the first two candles.
    ///
    /// Multi-day candles count each day as one full session, so daily data has
    /// exactly one candle per day.
    pub fn infer(candles: &[MinuteOhlcv], rule: &SessionRule) -> Result<Self> {
        rule.validate()?;
        if candles.len() < 2 {
            return Err(DataError::InsufficientData(
                "Need at least 2 candles to infer the candle duration".to_string(),
            ));
        }

        let delta = candles[1].timestamp - candles[0].timestamp;
        if delta <= Duration::zero() {
            return Err(DataError::InvalidData(format!(
                "Candles are not in increasing time order at {}",
                candles[1].timestamp
            )));
        }

        if delta.num_days() < 1 {
            let seconds = delta.num_seconds();
            if seconds == 0 {
                return Err(DataError::InvalidData(
                    "Candle duration is below one second".to_string(),
                ));
            }
            Ok(Self {
                seconds,
                minutes: seconds / 60,
                days: None,
            })
        } else {
            let days = delta.num_days();
            let seconds = days * rule.session_seconds();
            Ok(Self {
                seconds,
                minutes: seconds / 60,
                days: Some(days),
            })
        }
    }
}

/// Completeness verdict for one calendar day of candles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingDay {
    /// Calendar date
    pub date: NaiveDate,
    /// Index of the day's first candle in the series
    pub start: usize,
    /// One past the index of the day's last candle
    pub end: usize,
    /// Timestamp of the first candle
    pub first: NaiveDateTime,
    /// Timestamp of the last candle
    pub last: NaiveDateTime,
    /// Number of candles on the day
    pub num_candles: usize,
    /// Whether the day covers the full session
    pub is_complete: bool,
}

impl TradingDay {
    /// Index range of the day's candles
    pub fn indices(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Time between the first and last candle
    pub fn span(&self) -> Duration {
        self.last - self.first
    }
}

/// Summary of a single date lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayInfo {
    pub day_exists: bool,
    pub first_datetime: Option<NaiveDateTime>,
    pub last_datetime: Option<NaiveDateTime>,
    pub num_candles: Option<usize>,
    /// True when first and last candle are the full session span apart
    pub is_full_day: bool,
}

/// Split time-ordered candles into runs sharing a calendar date
pub fn partition_days(candles: &[MinuteOhlcv]) -> Vec<(NaiveDate, Range<usize>)> {
    let mut days = Vec::new();
    let mut start = 0;

    for i in 1..=candles.len() {
        if i == candles.len() || candles[i].date() != candles[start].date() {
            days.push((candles[start].date(), start..i));
            start = i;
        }
    }

    days
}

/// Judge every day in the series against the session rule.
///
/// Days are judged independently in parallel; the result keeps calendar order.
pub fn assess_days(
    candles: &[MinuteOhlcv],
    rule: &SessionRule,
    duration: &CandleDuration,
) -> Result<Vec<TradingDay>> {
    let per_day = rule.candles_per_day(duration)?;
    let expected_span = rule.expected_span(duration)?;
    Ok(judge_days(candles, per_day, expected_span))
}

pub(crate) fn judge_days(
    candles: &[MinuteOhlcv],
    per_day: usize,
    expected_span: Duration,
) -> Vec<TradingDay> {
    partition_days(candles)
        .into_par_iter()
        .map(|(date, range)| {
            let first = candles[range.start].timestamp;
            let last = candles[range.end - 1].timestamp;
            let num_candles = range.len();

            TradingDay {
                date,
                start: range.start,
                end: range.end,
                first,
                last,
                num_candles,
                is_complete: last - first == expected_span && num_candles == per_day,
            }
        })
        .collect()
}

/// Look up a single date
pub fn day_info(
    candles: &[MinuteOhlcv],
    date: NaiveDate,
    rule: &SessionRule,
    duration: &CandleDuration,
) -> Result<DayInfo> {
    Ok(lookup_day(candles, date, rule.expected_span(duration)?))
}

pub(crate) fn lookup_day(candles: &[MinuteOhlcv], date: NaiveDate, expected_span: Duration) -> DayInfo {
    let start = candles.partition_point(|c| c.date() < date);
    let end = candles.partition_point(|c| c.date() <= date);

    if start == end {
        return DayInfo::default();
    }

    let first = candles[start].timestamp;
    let last = candles[end - 1].timestamp;

    DayInfo {
        day_exists: true,
        first_datetime: Some(first),
        last_datetime: Some(last),
        num_candles: Some(end - start),
        is_full_day: last - first == expected_span,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OhlcvData;
    use rstest::rstest;

    fn minute_candles(date: NaiveDate, open: NaiveTime, count: usize) -> Vec<MinuteOhlcv> {
        (0..count)
            .map(|i| candle_at(date.and_time(open) + Duration::minutes(i as i64)))
            .collect()
    }

    fn candle_at(timestamp: NaiveDateTime) -> MinuteOhlcv {
        MinuteOhlcv {
            timestamp,
            data: OhlcvData {
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: 1.0,
            },
        }
    }

    fn one_minute() -> CandleDuration {
        CandleDuration {
            seconds: 60,
            minutes: 1,
            days: None,
        }
    }

    #[test]
    fn test_default_rule() {
        let rule = SessionRule::default();
        assert_eq!(rule.session_seconds(), 22_500);
        assert_eq!(rule.close(), NaiveTime::from_hms_opt(15, 30, 0).unwrap());
        assert_eq!(rule.candles_per_day(&one_minute()).unwrap(), 375);
        assert_eq!(
            rule.expected_span(&one_minute()).unwrap(),
            Duration::hours(6) + Duration::minutes(14)
        );
    }

    #[test]
    fn test_candles_per_day_rounds_up() {
        let rule = SessionRule::default();
        let seven = CandleDuration {
            seconds: 420,
            minutes: 7,
            days: None,
        };
        // 22500 / 420 = 53.57
        assert_eq!(rule.candles_per_day(&seven).unwrap(), 54);
    }

    #[test]
    fn test_invalid_session_rejected() {
        let open = SessionRule::default().open();
        assert!(SessionRule::new(open, 0).is_err());
        assert!(SessionRule::new(open, 1441).is_err());

        let zero: std::result::Result<SessionRule, _> =
            serde_json::from_str(r#"{ "open": "09:15:00", "minutes": 0 }"#);
        assert!(zero.is_err());

        let rule: SessionRule =
            serde_json::from_str(r#"{ "open": "09:30:00", "minutes": 390 }"#).unwrap();
        assert_eq!(rule.minutes(), 390);
        assert_eq!(rule.open(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
    }

    #[test]
    fn test_zero_duration_is_an_error() {
        let rule = SessionRule::default();
        let zero = CandleDuration {
            seconds: 0,
            minutes: 0,
            days: Some(1),
        };
        assert!(matches!(
            rule.candles_per_day(&zero),
            Err(DataError::ParameterError(_))
        ));
        assert!(rule.expected_span(&zero).is_err());
        assert!(assess_days(&[], &rule, &zero).is_err());
    }

    #[test]
    fn test_infer_duration() {
        let rule = SessionRule::default();
        let date = NaiveDate::from_ymd_opt(2015, 2, 2).unwrap();
        let candles = minute_candles(date, rule.open(), 3);
        assert_eq!(CandleDuration::infer(&candles, &rule).unwrap(), one_minute());
        assert!(CandleDuration::infer(&candles[..1], &rule).is_err());

        let mut daily = minute_candles(date, rule.open(), 1);
        daily.extend(minute_candles(date + Duration::days(1), rule.open(), 1));
        let duration = CandleDuration::infer(&daily, &rule).unwrap();
        assert_eq!(duration.days, Some(1));
        assert_eq!(duration.seconds, 22_500);
        assert_eq!(rule.candles_per_day(&duration).unwrap(), 1);
        assert_eq!(rule.expected_span(&duration).unwrap(), Duration::zero());
    }

    #[test]
    fn test_partition_and_assess() {
        let rule = SessionRule::default();
        let d1 = NaiveDate::from_ymd_opt(2015, 2, 2).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2015, 2, 3).unwrap();

        let mut candles = minute_candles(d1, rule.open(), 375);
        candles.extend(minute_candles(d2, rule.open(), 200));

        let parts = partition_days(&candles);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], (d1, 0..375));
        assert_eq!(parts[1], (d2, 375..575));

        let days = assess_days(&candles, &rule, &one_minute()).unwrap();
        assert!(days[0].is_complete);
        assert!(!days[1].is_complete);
        assert_eq!(days[1].num_candles, 200);
        assert_eq!(days[1].indices(), 375..575);
    }

    // count, index removed, extra candle (minutes after open), verdict
    #[rstest]
    #[case::full_session(375, None, None, true)]
    #[case::gap_with_full_span(375, Some(100), None, false)]
    #[case::full_count_with_late_candle(375, Some(100), Some(375), false)]
    #[case::short_day(374, None, None, false)]
    #[case::single_candle(1, None, None, false)]
    fn test_minute_day_verdict(
        #[case] count: usize,
        #[case] removed: Option<usize>,
        #[case] extra: Option<i64>,
        #[case] complete: bool,
    ) {
        let rule = SessionRule::default();
        let date = NaiveDate::from_ymd_opt(2015, 2, 2).unwrap();
        let mut candles = minute_candles(date, rule.open(), count);
        if let Some(idx) = removed {
            candles.remove(idx);
        }
        if let Some(offset) = extra {
            candles.push(candle_at(date.and_time(rule.open()) + Duration::minutes(offset)));
        }

        let days = assess_days(&candles, &rule, &one_minute()).unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].is_complete, complete);
    }

    #[test]
    fn test_late_candle_keeps_count_but_breaks_span() {
        let rule = SessionRule::default();
        let date = NaiveDate::from_ymd_opt(2015, 2, 2).unwrap();
        let mut candles = minute_candles(date, rule.open(), 375);
        candles.remove(100);
        candles.push(candle_at(date.and_hms_opt(15, 30, 0).unwrap()));

        let days = assess_days(&candles, &rule, &one_minute()).unwrap();
        assert_eq!(days[0].num_candles, 375);
        assert_eq!(days[0].span(), Duration::minutes(375));

        let info = day_info(&candles, date, &rule, &one_minute()).unwrap();
        assert!(!info.is_full_day);
    }

    #[test]
    fn test_gap_day_still_spans_full_session() {
        let rule = SessionRule::default();
        let date = NaiveDate::from_ymd_opt(2015, 2, 2).unwrap();
        let mut candles = minute_candles(date, rule.open(), 375);
        candles.remove(100);

        let info = day_info(&candles, date, &rule, &one_minute()).unwrap();
        assert!(info.day_exists);
        assert!(info.is_full_day);
        assert_eq!(info.num_candles, Some(374));
    }

    #[test]
    fn test_single_candle_days_complete_for_daily_data() {
        let rule = SessionRule::default();
        let first = NaiveDate::from_ymd_opt(2015, 2, 2).unwrap();
        let candles: Vec<MinuteOhlcv> = (0..3)
            .map(|d| candle_at((first + Duration::days(d)).and_time(NaiveTime::MIN)))
            .collect();

        let duration = CandleDuration::infer(&candles, &rule).unwrap();
        let days = assess_days(&candles, &rule, &duration).unwrap();
        assert_eq!(days.len(), 3);
        assert!(days.iter().all(|d| d.is_complete && d.num_candles == 1));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let rule = SessionRule::default();
        let duration = one_minute();
        let first = NaiveDate::from_ymd_opt(2015, 2, 2).unwrap();

        let mut candles = Vec::new();
        for d in 0..12 {
            let date = first + Duration::days(d);
            let count = if d % 3 == 1 { 200 } else { 375 };
            let mut day = minute_candles(date, rule.open(), count);
            if d % 4 == 2 {
                day.remove(50);
            }
            candles.extend(day);
        }

        let per_day = rule.candles_per_day(&duration).unwrap();
        let span = rule.expected_span(&duration).unwrap();
        let sequential: Vec<TradingDay> = partition_days(&candles)
            .into_iter()
            .map(|(date, range)| {
                let first = candles[range.start].timestamp;
                let last = candles[range.end - 1].timestamp;
                TradingDay {
                    date,
                    start: range.start,
                    end: range.end,
                    first,
                    last,
                    num_candles: range.len(),
                    is_complete: last - first == span && range.len() == per_day,
                }
            })
            .collect();

        let parallel = assess_days(&candles, &rule, &duration).unwrap();
        assert_eq!(parallel, sequential);
        assert_eq!(parallel.iter().filter(|d| d.is_complete).count(), 6);
    }

    #[test]
    fn test_day_info_missing_date() {
        let rule = SessionRule::default();
        let date = NaiveDate::from_ymd_opt(2015, 2, 2).unwrap();
        let candles = minute_candles(date, rule.open(), 10);
        let info = day_info(&candles, date + Duration::days(5), &rule, &one_minute()).unwrap();
        assert_eq!(info, DayInfo::default());
    }

    #[test]
    fn test_partition_empty() {
        assert!(partition_days(&[]).is_empty());
    }
}
