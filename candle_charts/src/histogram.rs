//! Histogram of a numeric column

use crate::{drawing_error, ChartError, ChartStyle, Result, BAR_COLOR};
use minute_data::features::field_values;
use minute_data::{CandleField, Stock};
use plotters::prelude::*;
use std::path::Path;
use trade_math::Histogram;

/// Default number of histogram bins
pub const DEFAULT_BINS: usize = 100;

/// Draw a histogram of `values` into an SVG file
pub fn plot_histogram<P: AsRef<Path>>(
    path: P,
    title: &str,
    x_label: &str,
    values: &[f64],
    bins: usize,
    style: &ChartStyle,
) -> Result<()> {
    style.validate()?;
    let hist = Histogram::new(values, bins)?;

    let x_min = hist.edges[0];
    let x_max = hist.edges[hist.bins()];
    let y_max = (hist.max_count() as f64 * 1.05).max(1.0);
    // gap between neighbouring bars, as a share of the bin width
    let gap = (x_max - x_min) / hist.bins() as f64 * 0.0125;

    let root = SVGBackend::new(path.as_ref(), (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE).map_err(drawing_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30).into_font())
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_min..x_max, 0.0..y_max)
        .map_err(drawing_error)?;

    chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc("Frequency")
        .draw()
        .map_err(drawing_error)?;

    chart
        .draw_series(hist.iter().filter(|(_, _, count)| *count > 0).map(|(lo, hi, count)| {
            Rectangle::new([(lo + gap, 0.0), (hi - gap, count as f64)], BAR_COLOR.filled())
        }))
        .map_err(drawing_error)?;

    root.present().map_err(drawing_error)?;
    log::info!("Wrote histogram to {}", path.as_ref().display());
    Ok(())
}

/// Histogram of one column of a stock; feature columns need `add_features` first
pub fn plot_field_histogram<P: AsRef<Path>>(
    path: P,
    stock: &Stock,
    field: CandleField,
    bins: usize,
    style: &ChartStyle,
) -> Result<()> {
    let values = field_values(&stock.candles, stock.features(), field)?;
    if values.is_empty() {
        return Err(ChartError::InvalidInput(format!(
            "No values for field '{}'",
            field
        )));
    }

    let title = format!("Histogram of {} : {}", stock.label(), field);
    plot_histogram(path, &title, &format!("{} value", field), &values, bins, style)
}
