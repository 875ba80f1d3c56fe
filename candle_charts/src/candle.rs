//! Close-up views of individual candles

use crate::{drawing_error, ChartError, ChartStyle, Result, GAIN_COLOR, LOSS_COLOR};
use minute_data::loader::format_timestamp;
use minute_data::MinuteOhlcv;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;

fn check_candle(candle: &MinuteOhlcv) -> Result<()> {
    let d = &candle.data;
    let values = [d.open, d.high, d.low, d.close];
    if values.iter().any(|v| !v.is_finite()) || d.low > d.high {
        return Err(ChartError::InvalidInput(format!(
            "Candle at {} has inconsistent prices",
            candle.timestamp
        )));
    }
    Ok(())
}

// Flat candles still need some vertical room
fn padded_range(candle: &MinuteOhlcv) -> f64 {
    let range = candle.range();
    if range > 0.0 {
        range
    } else {
        (candle.data.close.abs() * 0.001).max(0.01)
    }
}

fn draw_candle_panel(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    candle: &MinuteOhlcv,
    y_range: Range<f64>,
) -> Result<()> {
    let d = &candle.data;

    let mut chart = ChartBuilder::on(area)
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.75..0.75, y_range)
        .map_err(drawing_error)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(0)
        .x_desc(format_timestamp(&candle.timestamp))
        .draw()
        .map_err(drawing_error)?;

    // wick first so the body covers it
    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(0.0, d.low), (0.0, d.high)],
            BLACK.stroke_width(2),
        )))
        .map_err(drawing_error)?;
    chart
        .draw_series(
            [d.low, d.high]
                .into_iter()
                .map(|y| Circle::new((0.0, y), 4, BLACK.filled())),
        )
        .map_err(drawing_error)?;

    let fill = if candle.is_bullish() { GAIN_COLOR } else { LOSS_COLOR };
    let corners = [(-0.25, d.open), (0.25, d.close)];
    chart
        .draw_series([
            Rectangle::new(corners, fill.filled()),
            Rectangle::new(corners, BLACK.stroke_width(3)),
        ])
        .map_err(drawing_error)?;

    Ok(())
}

/// Draw one candle on its own canvas.
///
/// The vertical axis spans a third of the candle's range beyond each wick.
pub fn plot_single_candle<P: AsRef<Path>>(
    path: P,
    candle: &MinuteOhlcv,
    style: &ChartStyle,
) -> Result<()> {
    style.validate()?;
    check_candle(candle)?;

    let pad = padded_range(candle) / 3.0;
    let y_range = (candle.data.low - pad)..(candle.data.high + pad);

    let root = SVGBackend::new(path.as_ref(), (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE).map_err(drawing_error)?;
    draw_candle_panel(&root, candle, y_range)?;
    root.present().map_err(drawing_error)?;

    log::info!("Wrote candle chart to {}", path.as_ref().display());
    Ok(())
}

/// Draw two candles side by side for size comparison.
///
/// Both panels have the same vertical extent, so the candles' sizes are
/// directly comparable even when their price levels differ.
pub fn plot_candle_pair<P: AsRef<Path>>(
    path: P,
    first: &MinuteOhlcv,
    second: &MinuteOhlcv,
    style: &ChartStyle,
) -> Result<()> {
    style.validate()?;
    check_candle(first)?;
    check_candle(second)?;

    let half_height = padded_range(first).max(padded_range(second)) / 1.5;

    let root = SVGBackend::new(path.as_ref(), (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE).map_err(drawing_error)?;

    let panels = root.split_evenly((1, 2));
    for (panel, candle) in panels.iter().zip([first, second]) {
        let center = candle.midpoint();
        draw_candle_panel(panel, candle, (center - half_height)..(center + half_height))?;
    }

    root.present().map_err(drawing_error)?;
    log::info!("Wrote candle pair chart to {}", path.as_ref().display());
    Ok(())
}
