//! SVG line charts rendered with Plotters.
//!
//! The x axis is the decimal year of each observation. Lines break at
//! missing values (warm-up rows of the diagnostics, for example).

use std::error::Error;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use plotters::prelude::*;
use tracing::debug;

use crate::domain::{RunOutput, TimeSeries};
use crate::error::AppError;
use crate::io::OutputPaths;

/// Write one chart per output series of interest; returns the written paths.
pub fn write_charts(paths: &OutputPaths, output: &RunOutput, size: (u32, u32)) -> Result<Vec<PathBuf>, AppError> {
    let mut series = vec![&output.niv.niv];
    series.extend(output.niv.index.as_ref());
    series.extend([&output.diagnostics.impulse, &output.diagnostics.drag, &output.diagnostics.lsi]);

    let mut written = Vec::with_capacity(series.len());
    for s in series {
        let path = paths.chart_svg(s.name());
        write_line_chart(&path, s, size)?;
        debug!(path = %path.display(), series = s.name(), "wrote chart");
        written.push(path);
    }
    Ok(written)
}

pub fn write_line_chart(path: &Path, series: &TimeSeries, size: (u32, u32)) -> Result<(), AppError> {
    draw(path, series, size)
        .map_err(|e| AppError::config(format!("Failed to draw chart '{}': {e}", path.display())))
}

fn draw(path: &Path, series: &TimeSeries, size: (u32, u32)) -> Result<(), Box<dyn Error>> {
    let segments = finite_segments(series);
    let (x0, x1) = x_range(series);
    let (y0, y1) = y_range(&segments);

    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(series.name(), ("sans-serif", 20))
        .margin(10)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    chart
        .configure_mesh()
        .x_desc("year")
        .y_desc(series.name())
        .x_labels(10)
        .y_labels(8)
        .x_label_formatter(&|v| format!("{v:.0}"))
        .draw()?;

    if y0 < 0.0 && y1 > 0.0 {
        chart.draw_series(LineSeries::new([(x0, 0.0), (x1, 0.0)], &BLACK.mix(0.3)))?;
    }
    for segment in segments {
        chart.draw_series(LineSeries::new(segment, &BLUE))?;
    }

    root.present()?;
    Ok(())
}

fn decimal_year(date: NaiveDate) -> f64 {
    f64::from(date.year()) + f64::from(date.month0()) / 12.0
}

/// Runs of consecutive finite points as `(decimal year, value)`.
fn finite_segments(series: &TimeSeries) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (i, &v) in series.values().iter().enumerate() {
        if v.is_finite() {
            current.push((decimal_year(series.date_at(i)), v));
        } else if !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn x_range(series: &TimeSeries) -> (f64, f64) {
    if series.is_empty() {
        return (0.0, 1.0);
    }
    let lo = decimal_year(series.start());
    let hi = decimal_year(series.date_at(series.len() - 1));
    if hi > lo { (lo, hi) } else { (lo - 0.5, lo + 0.5) }
}

fn y_range(segments: &[Vec<(f64, f64)>]) -> (f64, f64) {
    let (lo, hi) = segments
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, y)| (lo.min(y), hi.max(y)));
    if !(lo.is_finite() && hi.is_finite()) {
        return (-1.0, 1.0);
    }
    let pad = ((hi - lo) * 0.05).max(1e-9);
    (lo - pad, hi + pad)
}
