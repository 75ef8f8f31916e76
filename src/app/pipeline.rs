//! The NIV pipeline as independent phases.
//!
//! fetch / load CSV -> align -> compute (state, composite, diagnostics) ->
//! export -> visualize
//!
//! Each phase takes the previous phase's output by value or reference, so
//! tests can start anywhere (for example `compute` on a hand-built table,
//! with no network access).

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::Config;
use crate::data::{Alignment, SeriesAligner, SeriesSource, fetch_all};
use crate::domain::{AlignedTable, RawSeries, RunOutput};
use crate::error::AppError;
use crate::io::{OutputPaths, read_series_csv, write_aligned_csv, write_niv_csv, write_summary_json};
use crate::models::{compute_niv, formula_for};
use crate::plot::write_charts;
use crate::report::{DiagnosticsBuilder, RunSummary};

/// Raw series from any source, with the warnings collected while loading.
#[derive(Debug, Clone, Default)]
pub struct Loaded {
    pub series: Vec<RawSeries>,
    pub warnings: Vec<String>,
}

/// An aligned table and everything computed from it.
#[derive(Debug, Clone)]
pub struct Run {
    pub table: AlignedTable,
    pub output: RunOutput,
}

/// Files written by [`Pipeline::export`].
#[derive(Debug, Clone)]
pub struct Exported {
    pub niv_csv: PathBuf,
    pub inputs_csv: PathBuf,
    pub summary_json: PathBuf,
    pub summary: RunSummary,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch every enabled series in parallel. Failures become warnings.
    pub fn fetch(&self, source: &dyn SeriesSource) -> Loaded {
        let requests: Vec<_> = self
            .config
            .enabled_series()
            .map(|(role, spec)| (role, spec.clone()))
            .collect();
        let outcome = fetch_all(source, &requests);
        Loaded {
            warnings: outcome.warnings(),
            series: outcome.series,
        }
    }

    /// Read series from a wide CSV instead of the remote source.
    pub fn load_csv(&self, path: &Path) -> Result<Loaded, AppError> {
        let csv = read_series_csv(path, &self.config.series)?;
        info!(path = %path.display(), series = csv.series.len(), "loaded input CSV");
        Ok(Loaded {
            series: csv.series,
            warnings: csv.warnings,
        })
    }

    pub fn align(&self, raw: Vec<RawSeries>) -> Result<Alignment, AppError> {
        let aligned = SeriesAligner::new(&self.config.alignment, &self.config.series).align(raw)?;
        let table = &aligned.table;
        info!(
            rows = table.len(),
            columns = table.roles().count(),
            start = %table.start(),
            frequency = %table.frequency(),
            "aligned inputs"
        );
        Ok(aligned)
    }

    /// State variables, composite and diagnostics for an aligned table.
    pub fn compute(&self, table: &AlignedTable) -> Result<RunOutput, AppError> {
        if table.is_empty() {
            return Err(AppError::data("Aligned table has no rows."));
        }
        let formula = formula_for(&self.config);
        let (state, niv) = compute_niv(formula.as_ref(), table)?;
        let diagnostics = DiagnosticsBuilder::new(self.config.windows.clone(), self.config.diagnostics.clone())
            .build(&niv, formula.lsi_source(&state, &niv));
        info!(formula = formula.version().display_name(), rows = table.len(), "computed NIV");
        Ok(RunOutput {
            state,
            niv,
            diagnostics,
            warnings: Vec::new(),
        })
    }

    /// Align and compute, carrying loader and aligner warnings into the output.
    pub fn process(&self, loaded: Loaded) -> Result<Run, AppError> {
        let aligned = self.align(loaded.series)?;
        let mut output = self.compute(&aligned.table)?;
        output.warnings = loaded.warnings;
        output.warnings.extend(aligned.warnings);
        Ok(Run {
            table: aligned.table,
            output,
        })
    }

    /// Write the NIV CSV, the aligned inputs and the JSON summary.
    pub fn export(&self, run: &Run, paths: &OutputPaths) -> Result<Exported, AppError> {
        paths.ensure_dir()?;
        let summary = RunSummary::new(&self.config, &run.table, &run.output);

        let niv_csv = paths.niv_csv();
        write_niv_csv(&niv_csv, &run.table, &run.output)?;
        let inputs_csv = paths.inputs_csv();
        write_aligned_csv(&inputs_csv, &run.table)?;
        let summary_json = paths.summary_json();
        write_summary_json(&summary_json, &summary)?;

        info!(path = %niv_csv.display(), "wrote NIV time series");
        info!(path = %inputs_csv.display(), "wrote aligned inputs");
        info!(path = %summary_json.display(), "wrote run summary");
        Ok(Exported {
            niv_csv,
            inputs_csv,
            summary_json,
            summary,
        })
    }

    /// SVG charts for the composite and its diagnostics.
    pub fn visualize(&self, output: &RunOutput, paths: &OutputPaths) -> Result<Vec<PathBuf>, AppError> {
        paths.ensure_dir()?;
        let out = &self.config.output;
        let written = write_charts(paths, output, (out.chart_width, out.chart_height))?;
        info!(charts = written.len(), dir = %paths.dir.display(), "wrote charts");
        Ok(written)
    }
}
