//! Run exports: the NIV time series, the aligned inputs, and a JSON summary.
//!
//! Every file of one run shares a `YYYYMMDD_HHMMSS` stamp so results from
//! different runs never overwrite each other.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::domain::{AlignedTable, RunOutput};
use crate::error::AppError;
use crate::io::table::write_columns_csv;
use crate::report::RunSummary;

/// Local-time stamp used in output file names.
pub fn run_stamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// File names for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub dir: PathBuf,
    pub stamp: String,
}

impl OutputPaths {
    pub fn new(dir: impl Into<PathBuf>, stamp: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            stamp: stamp.into(),
        }
    }

    pub fn niv_csv(&self) -> PathBuf {
        self.dir.join(format!("niv_timeseries_{}.csv", self.stamp))
    }

    pub fn inputs_csv(&self) -> PathBuf {
        self.dir.join(format!("aligned_inputs_{}.csv", self.stamp))
    }

    pub fn summary_json(&self) -> PathBuf {
        self.dir.join(format!("niv_summary_{}.json", self.stamp))
    }

    /// `niv_<series>_<stamp>.svg`, with the series name lower-cased.
    pub fn chart_svg(&self, series: &str) -> PathBuf {
        self.dir
            .join(format!("niv_{}_{}.svg", series.to_ascii_lowercase(), self.stamp))
    }

    pub fn ensure_dir(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            AppError::config(format!("Failed to create output directory '{}': {e}", self.dir.display()))
        })
    }
}

/// NIV, state variables and diagnostics indexed by `DATE`.
pub fn write_niv_csv(path: &Path, table: &AlignedTable, output: &RunOutput) -> Result<(), AppError> {
    let columns = output.columns();
    let named: Vec<(&str, &[f64])> = columns.iter().map(|s| (s.name(), s.values())).collect();
    write_columns_csv(path, &table.dates(), &named)
}

/// The aligned input table, one column per role label.
pub fn write_aligned_csv(path: &Path, table: &AlignedTable) -> Result<(), AppError> {
    let named: Vec<(&str, &[f64])> = table
        .roles()
        .filter_map(|role| table.column(role).map(|values| (role.label(), values)))
        .collect();
    write_columns_csv(path, &table.dates(), &named)
}

pub fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::config(format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| AppError::config(format!("Failed to write summary JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{compute_niv, formula_for};
    use crate::report::DiagnosticsBuilder;
    use crate::test_support::macro_table;

    fn run(table: &AlignedTable) -> RunOutput {
        let config = Config::default();
        let formula = formula_for(&config);
        let (state, niv) = compute_niv(formula.as_ref(), table).unwrap();
        let diagnostics = DiagnosticsBuilder::new(config.windows.clone(), config.diagnostics.clone())
            .build(&niv, formula.lsi_source(&state, &niv));
        RunOutput {
            state,
            niv,
            diagnostics,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn file_names_share_the_stamp() {
        let paths = OutputPaths::new("out", "20240102_030405");
        assert_eq!(paths.niv_csv(), Path::new("out/niv_timeseries_20240102_030405.csv"));
        assert_eq!(paths.inputs_csv(), Path::new("out/aligned_inputs_20240102_030405.csv"));
        assert_eq!(paths.summary_json(), Path::new("out/niv_summary_20240102_030405.json"));
        assert_eq!(paths.chart_svg("NIV_t"), Path::new("out/niv_niv_t_20240102_030405.svg"));
    }

    #[test]
    fn stamp_has_expected_shape() {
        let stamp = run_stamp();
        assert_eq!(stamp.len(), 15);
        assert_eq!(stamp.as_bytes()[8], b'_');
    }

    #[test]
    fn niv_csv_has_one_row_per_date() {
        let dir = tempfile::tempdir().unwrap();
        let table = macro_table(30);
        let output = run(&table);
        let path = dir.path().join("niv.csv");
        write_niv_csv(&path, &table, &output).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "DATE,NIV_t,NIV_Index,u_t,P_t,X_t,F_t,Impulse,Drag,LSI"
        );
        let first = lines.next().unwrap();
        assert!(first.starts_with("1990-01-01,"));
        // Impulse, Drag and LSI are still warming up on the first row.
        assert!(first.ends_with(",,,"));
        assert_eq!(text.lines().count(), 31);
    }

    #[test]
    fn aligned_csv_uses_role_labels() {
        let dir = tempfile::tempdir().unwrap();
        let table = macro_table(3);
        let path = dir.path().join("inputs.csv");
        write_aligned_csv(&path, &table).unwrap();
        let header = fs::read_to_string(&path).unwrap().lines().next().unwrap().to_string();
        assert!(header.starts_with("DATE,GDP,INVEST,M2,FEDFUNDS"));
    }
}
