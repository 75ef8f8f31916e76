//! Wide CSV tables: one `DATE` column plus one column per series.
//!
//! Reading turns a table into per-role [`RawSeries`] that go through the same
//! alignment as fetched data. Writing is shared by every CSV export.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use tracing::{debug, warn};

use crate::config::SeriesSpec;
use crate::domain::{Frequency, RawSeries, SeriesRole, months_between};
use crate::error::AppError;

pub const DATE_COLUMN: &str = "DATE";

/// Series read from a CSV plus anything that was skipped on the way.
#[derive(Debug, Clone)]
pub struct CsvSeries {
    pub series: Vec<RawSeries>,
    /// Human-readable notes about ignored columns and bad cells.
    pub warnings: Vec<String>,
}

/// Read a wide CSV, matching columns to roles by label (`GDP`) or by the
/// configured source id (`GDPC1`). Empty cells are missing observations.
pub fn read_series_csv(path: &Path, specs: &BTreeMap<SeriesRole, SeriesSpec>) -> Result<CsvSeries, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::config(format!("Failed to open input CSV '{}': {e}", path.display())))?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::config(format!("Failed to read CSV headers: {e}")))?
        .clone();

    let date_idx = headers
        .iter()
        .position(|h| normalize_header(h).eq_ignore_ascii_case(DATE_COLUMN))
        .ok_or_else(|| AppError::config(format!("Input CSV '{}' has no DATE column.", path.display())))?;

    let mut warnings = Vec::new();
    let columns = match_columns(&headers, date_idx, specs, &mut warnings);
    if columns.is_empty() {
        return Err(AppError::data(format!(
            "Input CSV '{}' has no column matching a known series.",
            path.display()
        )));
    }

    let mut observations: BTreeMap<SeriesRole, Vec<(NaiveDate, f64)>> = BTreeMap::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warnings.push(format!("line {line}: CSV parse error: {e}"));
                continue;
            }
        };
        let Some(date) = record.get(date_idx).and_then(parse_date) else {
            warnings.push(format!("line {line}: unreadable date, row skipped"));
            continue;
        };
        for (&role, &(col, _)) in &columns {
            let cell = record.get(col).unwrap_or("");
            if cell.is_empty() || cell == "." {
                continue;
            }
            match cell.parse::<f64>() {
                Ok(v) if v.is_finite() => observations.entry(role).or_default().push((date, v)),
                _ => warnings.push(format!("line {line}: {role} value '{cell}' treated as missing")),
            }
        }
    }

    let series = columns
        .into_iter()
        .map(|(role, (_, source_id))| {
            let mut obs = observations.remove(&role).unwrap_or_default();
            obs.sort_by_key(|(d, _)| *d);
            let configured = specs.get(&role).map(|s| s.frequency).unwrap_or(Frequency::Monthly);
            let frequency = infer_frequency(&obs).unwrap_or(configured);
            debug!(%role, %source_id, %frequency, observations = obs.len(), "read CSV column");
            RawSeries {
                role,
                source_id,
                frequency,
                observations: obs,
            }
        })
        .collect();

    for w in &warnings {
        warn!("{w}");
    }
    Ok(CsvSeries { series, warnings })
}

/// Write `DATE` plus named columns; non-finite values become empty cells.
pub fn write_columns_csv(path: &Path, dates: &[NaiveDate], columns: &[(&str, &[f64])]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::config(format!("Failed to create CSV '{}': {e}", path.display())))?;

    let mut header = vec![DATE_COLUMN];
    header.extend(columns.iter().map(|(name, _)| *name));
    writer
        .write_record(&header)
        .map_err(|e| AppError::config(format!("Failed to write CSV header: {e}")))?;

    for (i, date) in dates.iter().enumerate() {
        let mut row = Vec::with_capacity(columns.len() + 1);
        row.push(date.to_string());
        for (_, values) in columns {
            row.push(match values.get(i) {
                Some(v) if v.is_finite() => v.to_string(),
                _ => String::new(),
            });
        }
        writer
            .write_record(&row)
            .map_err(|e| AppError::config(format!("Failed to write CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::config(format!("Failed to flush CSV '{}': {e}", path.display())))
}

fn match_columns(
    headers: &StringRecord,
    date_idx: usize,
    specs: &BTreeMap<SeriesRole, SeriesSpec>,
    warnings: &mut Vec<String>,
) -> BTreeMap<SeriesRole, (usize, String)> {
    let by_id: HashMap<String, SeriesRole> = specs
        .iter()
        .map(|(role, spec)| (spec.id.to_ascii_uppercase(), *role))
        .collect();

    let mut out = BTreeMap::new();
    for (idx, raw) in headers.iter().enumerate() {
        if idx == date_idx {
            continue;
        }
        let name = normalize_header(raw);
        let role = SeriesRole::from_label(name).or_else(|| by_id.get(&name.to_ascii_uppercase()).copied());
        match role {
            Some(role) if out.contains_key(&role) => {
                warnings.push(format!("column '{name}' duplicates {role}, ignored"));
            }
            Some(role) => {
                let source_id = specs.get(&role).map(|s| s.id.clone()).unwrap_or_else(|| name.to_string());
                out.insert(role, (idx, source_id));
            }
            None => warnings.push(format!("column '{name}' does not match a known series, ignored")),
        }
    }
    out
}

fn normalize_header(name: &str) -> &str {
    name.trim().trim_start_matches('\u{feff}')
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
        .ok()
}

/// Native frequency implied by the smallest gap between observations.
fn infer_frequency(obs: &[(NaiveDate, f64)]) -> Option<Frequency> {
    let gap = obs
        .windows(2)
        .map(|w| months_between(w[0].0, w[1].0))
        .filter(|m| *m > 0)
        .min()?;
    Some(match gap {
        1..=2 => Frequency::Monthly,
        3..=11 => Frequency::Quarterly,
        _ => Frequency::Annual,
    })
}
