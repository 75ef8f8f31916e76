//! Plotting: terminal ASCII plots and exported SVG charts.

pub mod ascii;
pub mod chart;

pub use ascii::render_ascii_series;
pub use chart::{write_charts, write_line_chart};
