//! Candlestick chart of a price range with traded volume underneath

use crate::{drawing_error, ChartError, ChartStyle, Result, BAR_COLOR, GAIN_COLOR, LOSS_COLOR, SESSION_COLOR};
use chrono::NaiveTime;
use minute_data::MinuteOhlcv;
use plotters::prelude::*;
use std::path::Path;

/// Draw `candles` as candlesticks with a volume panel below.
///
/// Candles are placed by position rather than by time, so overnight and
/// weekend gaps take no space. A vertical marker is drawn at every candle
/// that opens a session, i.e. whose time of day equals `session_open`.
pub fn plot_price_action<P: AsRef<Path>>(
    path: P,
    title: &str,
    candles: &[MinuteOhlcv],
    session_open: NaiveTime,
    style: &ChartStyle,
) -> Result<()> {
    style.validate()?;
    if candles.is_empty() {
        return Err(ChartError::InvalidInput(
            "No candles in the requested range".to_string(),
        ));
    }

    let low = candles.iter().map(|c| c.data.low).fold(f64::INFINITY, f64::min);
    let high = candles
        .iter()
        .map(|c| c.data.high)
        .fold(f64::NEG_INFINITY, f64::max);
    if !low.is_finite() || !high.is_finite() {
        return Err(ChartError::InvalidInput(
            "Candle prices must be finite".to_string(),
        ));
    }
    let pad = ((high - low) * 0.05).max(0.01);
    let y_range = (low - pad)..(high + pad);

    let max_volume = candles.iter().map(|c| c.data.volume).fold(0.0, f64::max);
    let volume_top = if max_volume > 0.0 { max_volume * 1.1 } else { 1.0 };

    let n = candles.len();
    let x_range = -0.5..(n as f64 - 0.5);
    let body_width = ((style.width as f64 / n as f64) * 0.6).clamp(1.0, 20.0) as u32;

    let label_at = |x: &f64| -> String {
        let i = x.round();
        if i < 0.0 || i as usize >= n {
            return String::new();
        }
        candles[i as usize].timestamp.format("%m-%d %H:%M").to_string()
    };

    let session_starts: Vec<usize> = candles
        .iter()
        .enumerate()
        .filter(|(_, c)| c.timestamp.time() == session_open)
        .map(|(i, _)| i)
        .collect();

    let root = SVGBackend::new(path.as_ref(), (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE).map_err(drawing_error)?;
    let (price_area, volume_area) = root.split_vertically(style.height * 3 / 4);

    let mut price_chart = ChartBuilder::on(&price_area)
        .caption(title, ("sans-serif", 30).into_font())
        .margin(15)
        .x_label_area_size(30)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range.clone(), y_range.clone())
        .map_err(drawing_error)?;

    price_chart
        .configure_mesh()
        .x_label_formatter(&label_at)
        .y_desc("Price")
        .draw()
        .map_err(drawing_error)?;

    price_chart
        .draw_series(session_starts.iter().map(|&i| {
            PathElement::new(
                vec![(i as f64, y_range.start), (i as f64, y_range.end)],
                SESSION_COLOR.mix(0.7).stroke_width(5),
            )
        }))
        .map_err(drawing_error)?;

    price_chart
        .draw_series(candles.iter().enumerate().map(|(i, c)| {
            CandleStick::new(
                i as f64,
                c.data.open,
                c.data.high,
                c.data.low,
                c.data.close,
                GAIN_COLOR.filled(),
                LOSS_COLOR.filled(),
                body_width,
            )
        }))
        .map_err(drawing_error)?;

    let mut volume_chart = ChartBuilder::on(&volume_area)
        .margin(15)
        .x_label_area_size(30)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, 0.0..volume_top)
        .map_err(drawing_error)?;

    volume_chart
        .configure_mesh()
        .x_label_formatter(&label_at)
        .y_desc("Volume")
        .draw()
        .map_err(drawing_error)?;

    volume_chart
        .draw_series(candles.iter().enumerate().map(|(i, c)| {
            let x = i as f64;
            Rectangle::new([(x - 0.4, 0.0), (x + 0.4, c.data.volume)], BAR_COLOR.filled())
        }))
        .map_err(drawing_error)?;

    root.present().map_err(drawing_error)?;
    log::info!(
        "Wrote price action chart of {} candles ({} sessions) to {}",
        n,
        session_starts.len(),
        path.as_ref().display()
    );
    Ok(())
}
