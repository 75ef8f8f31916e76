//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - frequencies and semantic series roles (`Frequency`, `SeriesRole`)
//! - raw and aligned inputs (`RawSeries`, `TimeSeries`, `AlignedTable`)
//! - formula outputs (`StateVariables`, `NivSeries`, `DiagnosticsBundle`)

pub mod types;

pub use types::*;
