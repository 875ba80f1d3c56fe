//! Synthetic minute data for tests and demos

use crate::session::SessionRule;
use crate::{MinuteOhlcv, OhlcvData};
use chrono::{Datelike, Duration, NaiveDate};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Generate synthetic minute-level data covering full sessions
///
/// # Arguments
/// * `days` - Number of calendar days to walk through (weekends are skipped)
/// * `rule` - Session whose open and length drive the timestamps
/// * `base_price` - Starting price
/// * `volatility` - Price volatility factor (0.0-1.0)
/// * `trend` - Per-minute drift factor (-0.001 to 0.001 for reasonable values)
///
/// # Returns
/// * `Vec<MinuteOhlcv>` - Generated data, one candle per session minute
pub fn generate_minute_data(
    days: usize,
    rule: &SessionRule,
    base_price: f64,
    volatility: f64,
    trend: f64,
) -> Vec<MinuteOhlcv> {
    generate_minute_data_with_rng(
        &mut StdRng::from_entropy(),
        days,
        rule,
        base_price,
        volatility,
        trend,
    )
}

/// Same as [`generate_minute_data`] with a caller-supplied random source
pub fn generate_minute_data_with_rng<R: Rng>(
    random: &mut R,
    days: usize,
    rule: &SessionRule,
    base_price: f64,
    volatility: f64,
    trend: f64,
) -> Vec<MinuteOhlcv> {
    let points_per_day = rule.minutes() as usize;
    let mut data = Vec::with_capacity(days * points_per_day);
    let mut current_price = base_price;

    let base_date = NaiveDate::from_ymd_opt(2015, 2, 2).unwrap_or(NaiveDate::MIN);

    for day in 0..days {
        let current_date = base_date + Duration::days(day as i64);

        // Skip weekends
        if current_date.weekday().num_days_from_monday() > 4 {
            continue;
        }

        let session_start = current_date.and_time(rule.open());
        for minute in 0..points_per_day {
            let timestamp = session_start + Duration::minutes(minute as i64);

            // More movement near the open and close
            let minute_factor = minute as f64 / points_per_day as f64;
            let intraday_volatility = 1.0 + 0.5 * (4.0 * (minute_factor - 0.5).powi(2));

            let price_change =
                current_price * volatility * intraday_volatility * (random.gen::<f64>() - 0.5);
            let drift = current_price * trend;

            let open = current_price;
            current_price = (open + price_change + drift).max(0.01);
            let close = current_price;

            let high = open.max(close) + random.gen::<f64>() * volatility * open * 0.2;
            let low = (open.min(close) - random.gen::<f64>() * volatility * open * 0.2).max(0.0);

            // U-shaped volume
            let volume = (1000.0 + 5000.0 * intraday_volatility) * (0.5 + random.gen::<f64>());

            data.push(MinuteOhlcv {
                timestamp,
                data: OhlcvData {
                    open,
                    high,
                    low,
                    close,
                    volume: volume.round(),
                },
            });
        }
    }

    data
}

/// Seeded generator, convenient in tests
pub fn seeded_minute_data(seed: u64, days: usize, rule: &SessionRule) -> Vec<MinuteOhlcv> {
    generate_minute_data_with_rng(&mut StdRng::seed_from_u64(seed), days, rule, 100.0, 0.002, 0.0)
}
