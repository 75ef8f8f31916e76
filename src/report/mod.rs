//! Reporting: diagnostics series, run summary, and formatted terminal output.

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::{Config, FormulaVersion, Params, Windows};
use crate::domain::{AlignedTable, Frequency, RunOutput};

pub mod diagnostics;
pub mod format;

pub use diagnostics::DiagnosticsBuilder;
pub use format::format_run_summary;

/// Machine-readable description of a run (printed and written as JSON).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub formula: FormulaVersion,
    pub params: Params,
    pub windows: Windows,
    pub frequency: Frequency,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    pub rows: usize,
    pub inputs: Vec<InputCoverage>,
    /// Enabled series that did not make it into the aligned table.
    pub excluded: Vec<String>,
    pub outputs: Vec<ColumnCount>,
    /// Statistics of `NIV_t` (finite values only).
    pub niv: Option<SeriesStats>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputCoverage {
    pub series: String,
    pub source_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnCount {
    pub column: String,
    pub non_null: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesStats {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl SeriesStats {
    /// Stats over the finite values; `None` when there are none.
    pub fn of(values: &[f64]) -> Option<SeriesStats> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return None;
        }
        let n = finite.len() as f64;
        let mean = finite.iter().sum::<f64>() / n;
        let std = if finite.len() > 1 {
            (finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        } else {
            0.0
        };
        let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(SeriesStats {
            count: finite.len(),
            mean,
            std,
            min,
            max,
        })
    }
}

impl RunSummary {
    pub fn new(config: &Config, table: &AlignedTable, output: &RunOutput) -> Self {
        let inputs = table
            .roles()
            .map(|role| InputCoverage {
                series: role.label().to_string(),
                source_id: table.source_id(role).unwrap_or_default().to_string(),
            })
            .collect();
        let excluded = config
            .enabled_series()
            .filter(|(role, _)| !table.contains(*role))
            .map(|(role, spec)| format!("{} ({})", role.label(), spec.id))
            .collect();
        let outputs = output
            .columns()
            .into_iter()
            .map(|s| ColumnCount {
                column: s.name().to_string(),
                non_null: s.count_finite(),
            })
            .collect();

        RunSummary {
            formula: config.formula,
            params: config.params.clone(),
            windows: config.windows.clone(),
            frequency: table.frequency(),
            start: table.start(),
            end: table.end(),
            rows: table.len(),
            inputs,
            excluded,
            outputs,
            niv: SeriesStats::of(output.niv.niv.values()),
            warnings: output.warnings.clone(),
        }
    }
}
