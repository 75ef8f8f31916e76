//! End-to-end pipeline runs against an in-memory series source.

use std::fs;
use std::path::Path;

use chrono::{Datelike, NaiveDate};

use niv_engine::app::pipeline::Pipeline;
use niv_engine::config::{Config, FormulaVersion, SeriesSpec};
use niv_engine::data::SeriesSource;
use niv_engine::domain::{Frequency, RawSeries, SeriesRole};
use niv_engine::error::AppError;
use niv_engine::io::OutputPaths;

/// Deterministic macro-like data for 1990..2006, failing for selected roles.
struct FakeSource {
    failing: Vec<SeriesRole>,
}

impl FakeSource {
    fn healthy() -> Self {
        Self { failing: Vec::new() }
    }

    fn failing(roles: &[SeriesRole]) -> Self {
        Self {
            failing: roles.to_vec(),
        }
    }
}

fn level(role: SeriesRole, t: f64) -> f64 {
    match role {
        SeriesRole::Gdp => 10_000.0 * 1.005_f64.powf(t),
        SeriesRole::Investment => 2_000.0 * 1.004_f64.powf(t) * (1.0 + 0.05 * (t / 5.0).sin()),
        SeriesRole::MoneySupply => 3_000.0 * 1.006_f64.powf(t),
        SeriesRole::PolicyRate => 5.0 + 2.0 * (t / 12.0).sin(),
        SeriesRole::LongRate => 6.0 + 1.5 * (t / 18.0).sin(),
        SeriesRole::ShortRate => 4.5 + 2.0 * (t / 12.0 + 0.3).sin(),
        SeriesRole::CapacityUtilization => 78.0 + 4.0 * (t / 9.0).sin(),
        SeriesRole::RndSpend => 300.0 * 1.003_f64.powf(t),
        SeriesRole::EducationSpend => 500.0 * 1.002_f64.powf(t),
        SeriesRole::DebtService => 10.0 + (t / 20.0).cos(),
    }
}

impl SeriesSource for FakeSource {
    fn fetch_series(&self, role: SeriesRole, spec: &SeriesSpec) -> Result<RawSeries, AppError> {
        if self.failing.contains(&role) {
            return Err(AppError::source(format!("FRED request failed for {}: timed out", spec.id)));
        }
        let start = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
        let observations = (0..)
            .map(|k| spec.frequency.advance(start, k))
            .take_while(|d| d.year() < 2006)
            .map(|d| {
                let t = ((d.year() - 1990) * 12 + d.month0() as i32) as f64;
                (d, level(role, t))
            })
            .collect::<Vec<_>>();
        Ok(RawSeries {
            role,
            source_id: spec.id.clone(),
            frequency: spec.frequency,
            observations,
        })
    }
}

fn files_in(dir: &Path) -> Vec<String> {
    match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[test]
fn full_run_exports_every_file() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(Config::default());

    let loaded = pipeline.fetch(&FakeSource::healthy());
    assert!(loaded.warnings.is_empty(), "{:?}", loaded.warnings);
    assert_eq!(loaded.series.len(), 10);

    let run = pipeline.process(loaded).unwrap();
    assert_eq!(run.table.frequency(), Frequency::Monthly);
    assert_eq!(run.table.start(), NaiveDate::from_ymd_opt(1990, 1, 1).unwrap());
    // Annual series carry their last value through December 2005.
    assert_eq!(run.table.end(), NaiveDate::from_ymd_opt(2005, 12, 1));
    assert!(run.output.niv.niv.all_finite());
    let index = run.output.niv.index.as_ref().unwrap();
    assert!((index.values()[index.len() - 1] - 100.0).abs() < 1e-9);

    let paths = OutputPaths::new(dir.path(), "20250101_120000");
    let exported = pipeline.export(&run, &paths).unwrap();
    let charts = pipeline.visualize(&run.output, &paths).unwrap();
    assert_eq!(charts.len(), 5);

    let mut names = files_in(dir.path());
    names.sort();
    assert!(names.contains(&"niv_timeseries_20250101_120000.csv".to_string()));
    assert!(names.contains(&"aligned_inputs_20250101_120000.csv".to_string()));
    assert!(names.contains(&"niv_summary_20250101_120000.json".to_string()));
    assert!(names.contains(&"niv_niv_index_20250101_120000.svg".to_string()));

    let csv = fs::read_to_string(&exported.niv_csv).unwrap();
    assert_eq!(csv.lines().count(), run.table.len() + 1);
    assert!(csv.starts_with("DATE,NIV_t,NIV_Index,"));

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&exported.summary_json).unwrap()).unwrap();
    assert_eq!(json["formula"], "kernel_power");
    assert_eq!(json["rows"], run.table.len());
    assert_eq!(json["inputs"].as_array().unwrap().len(), 10);
}

#[test]
fn one_failed_fetch_keeps_the_rest() {
    let pipeline = Pipeline::new(Config::default());
    let loaded = pipeline.fetch(&FakeSource::failing(&[SeriesRole::EducationSpend]));

    assert_eq!(loaded.series.len(), 9);
    assert_eq!(loaded.warnings.len(), 1);
    assert!(loaded.warnings[0].starts_with("Skipped EDU (W211RC1A027NBEA)"));

    let run = pipeline.process(loaded).unwrap();
    assert!(!run.table.contains(SeriesRole::EducationSpend));
    for role in SeriesRole::ALL.into_iter().filter(|r| *r != SeriesRole::EducationSpend) {
        assert!(run.table.contains(role), "{role} missing");
    }
    assert!(run.output.warnings.iter().any(|w| w.starts_with("Skipped EDU")));
    assert!(run.output.niv.niv.all_finite());
}

#[test]
fn missing_gdp_aborts_before_any_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    for formula in [FormulaVersion::KernelPower, FormulaVersion::RatioProduct] {
        let pipeline = Pipeline::new(Config {
            formula,
            ..Config::default()
        });
        let loaded = pipeline.fetch(&FakeSource::failing(&[SeriesRole::Gdp]));
        let err = pipeline.process(loaded).unwrap_err();

        assert_eq!(err.exit_code(), 3);
        assert!(err.message().contains("Missing GDP"), "{}", err.message());
    }
    // Export is never reached, so nothing was created.
    assert!(!out.exists());
    assert!(files_in(dir.path()).is_empty());
}

#[test]
fn aligned_snapshot_can_be_replayed_from_csv() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(Config::default());
    let first = pipeline.process(pipeline.fetch(&FakeSource::healthy())).unwrap();
    let paths = OutputPaths::new(dir.path(), "20250101_000000");
    let exported = pipeline.export(&first, &paths).unwrap();

    let replay = pipeline.process(pipeline.load_csv(&exported.inputs_csv).unwrap()).unwrap();
    assert_eq!(replay.table.start(), first.table.start());
    assert_eq!(replay.table.len(), first.table.len());
    let a = first.output.niv.niv.values();
    let b = replay.output.niv.niv.values();
    assert!(a.iter().zip(b).all(|(x, y)| (x - y).abs() <= 1e-9 * x.abs().max(1.0)));
}

#[test]
fn quarterly_alignment_averages_months() {
    let mut config = Config::default();
    config.alignment.frequency = Frequency::Quarterly;
    config.windows.impulse = 4;
    config.windows.drag = 8;
    config.windows.lsi_short = 2;
    config.windows.lsi_long = 8;
    let pipeline = Pipeline::new(config);

    let run = pipeline.process(pipeline.fetch(&FakeSource::healthy())).unwrap();
    assert_eq!(run.table.frequency(), Frequency::Quarterly);
    assert_eq!(run.table.len(), 64);
    assert!(run.output.niv.niv.all_finite());

    // Quarterly-native GDP comes through untouched; monthly M2 is averaged.
    let gdp = run.table.column(SeriesRole::Gdp).unwrap();
    let m2 = run.table.column(SeriesRole::MoneySupply).unwrap();
    for q in [0usize, 17, 63] {
        let t = (3 * q) as f64;
        assert!((gdp[q] - level(SeriesRole::Gdp, t)).abs() < 1e-9);
        let mean = (0..3).map(|k| level(SeriesRole::MoneySupply, t + k as f64)).sum::<f64>() / 3.0;
        assert!((m2[q] - mean).abs() < 1e-9);
    }
}
