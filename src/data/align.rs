//! Alignment of heterogeneous-frequency series onto one gap-free index.
//!
//! Order of operations (all before any formula transform runs):
//!
//! 1. bucket each series' observations to its native period start (averaging
//!    several observations inside one period)
//! 2. upsample quarterly/annual series to monthly: linear interpolation
//!    between known points, forward fill through the months of the last
//!    known period, nothing before the first known point. For a quarterly
//!    target each known value is held through its own period instead, so
//!    quarterly-native values come back unchanged after step 5
//! 3. build the union monthly index, truncate at the date floor, and trim
//!    leading/trailing rows where every series is missing
//! 4. fill each column: configured constant before the series starts, linear
//!    interpolation across internal gaps, nearest value at the edges
//! 5. average months into quarters when the target frequency is quarterly

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::warn;

use crate::config::{AlignmentConfig, MissingSeriesPolicy, SeriesSpec};
use crate::domain::{AlignedTable, Frequency, RawSeries, SeriesRole, months_between};
use crate::error::AppError;

/// Aligned table plus anything worth telling the user about.
#[derive(Debug, Clone)]
pub struct Alignment {
    pub table: AlignedTable,
    pub warnings: Vec<String>,
}

pub struct SeriesAligner<'a> {
    config: &'a AlignmentConfig,
    specs: &'a BTreeMap<SeriesRole, SeriesSpec>,
}

/// A dense monthly column with its own start date (gaps are `NaN`).
struct MonthlyColumn {
    source_id: String,
    start: NaiveDate,
    values: Vec<f64>,
}

impl<'a> SeriesAligner<'a> {
    pub fn new(config: &'a AlignmentConfig, specs: &'a BTreeMap<SeriesRole, SeriesSpec>) -> Self {
        Self { config, specs }
    }

    pub fn align(&self, raw: Vec<RawSeries>) -> Result<Alignment, AppError> {
        let mut warnings = Vec::new();

        let mut columns: BTreeMap<SeriesRole, MonthlyColumn> = BTreeMap::new();
        for series in raw {
            let role = series.role;
            match to_monthly(&series, self.config.frequency) {
                Some(column) => {
                    if columns.insert(role, column).is_some() {
                        warnings.push(format!("Duplicate input for {role}; keeping the last one."));
                    }
                }
                None => {
                    self.handle_missing(role, &series.source_id, &mut warnings)?;
                }
            }
        }

        for (role, spec) in self.specs {
            if spec.enabled && !columns.contains_key(role) && !warned_about(&warnings, *role) {
                self.handle_missing(*role, &spec.id, &mut warnings)?;
            }
        }

        if columns.is_empty() {
            return Err(AppError::data("No input series available to align."));
        }

        // Union monthly index, truncated at the floor.
        let mut start = columns.values().map(|c| c.start).min().unwrap_or(NaiveDate::MIN);
        let end = columns
            .values()
            .map(|c| Frequency::Monthly.advance(c.start, c.values.len().saturating_sub(1)))
            .max()
            .unwrap_or(NaiveDate::MIN);
        if let Some(floor) = self.config.start_floor {
            start = start.max(Frequency::Monthly.period_start(floor));
        }
        if end < start {
            return Err(AppError::data(format!("No observations on or after {start}.")));
        }
        let len = (months_between(start, end) + 1) as usize;

        let mut dense: BTreeMap<SeriesRole, (String, Vec<f64>)> = BTreeMap::new();
        for (role, column) in columns {
            let offset = months_between(start, column.start);
            let mut values = vec![f64::NAN; len];
            for (i, v) in column.values.iter().enumerate() {
                let idx = offset + i as i64;
                if idx >= 0 && (idx as usize) < len {
                    values[idx as usize] = *v;
                }
            }
            if values.iter().all(|v| v.is_nan()) {
                self.handle_missing(role, &column.source_id, &mut warnings)?;
                continue;
            }
            dense.insert(role, (column.source_id, values));
        }

        if dense.is_empty() {
            return Err(AppError::data(format!("No input series has observations on or after {start}.")));
        }

        // Rows where every series is missing are dropped at the edges. Interior
        // rows are kept (and filled) so the index stays contiguous.
        let any_present = |i: usize| dense.values().any(|(_, v)| v[i].is_finite());
        let first_row = (0..len).find(|&i| any_present(i)).unwrap_or(0);
        let last_row = (0..len).rev().find(|&i| any_present(i)).unwrap_or(len - 1);
        let start = Frequency::Monthly.advance(start, first_row);
        let len = last_row + 1 - first_row;

        let mut filled: BTreeMap<SeriesRole, (String, Vec<f64>)> = BTreeMap::new();
        for (role, (source_id, values)) in dense {
            let mut values = values[first_row..=last_row].to_vec();
            let fallback = self.specs.get(&role).and_then(|spec| spec.fallback);
            fill_gaps(&mut values, fallback);
            filled.insert(role, (source_id, values));
        }

        let table = match self.config.frequency {
            Frequency::Monthly => build_table(Frequency::Monthly, start, len, filled)?,
            Frequency::Quarterly => {
                let (q_start, quarterly) = to_quarterly(start, filled);
                let q_len = quarterly.values().next().map(|(_, v)| v.len()).unwrap_or(0);
                build_table(Frequency::Quarterly, q_start, q_len, quarterly)?
            }
            Frequency::Annual => {
                return Err(AppError::config("Aligned tables must be monthly or quarterly."));
            }
        };

        Ok(Alignment { table, warnings })
    }

    fn handle_missing(&self, role: SeriesRole, source_id: &str, warnings: &mut Vec<String>) -> Result<(), AppError> {
        match self.config.on_missing {
            MissingSeriesPolicy::Abort => Err(AppError::data(format!(
                "Series {role} ({source_id}) has no observations to align."
            ))),
            MissingSeriesPolicy::Warn => {
                warn!(role = %role, series = source_id, "series excluded from aligned table");
                warnings.push(format!("Excluded {role} ({source_id}): no observations."));
                Ok(())
            }
        }
    }
}

fn warned_about(warnings: &[String], role: SeriesRole) -> bool {
    let tag = format!("Excluded {role} (");
    warnings.iter().any(|w| w.starts_with(&tag))
}

/// Convert one raw series into a dense monthly column.
///
/// Coarser series are interpolated between periods for a monthly target and
/// step-held within each period for a quarterly target.
fn to_monthly(series: &RawSeries, target: Frequency) -> Option<MonthlyColumn> {
    let native = series.frequency;
    let mut buckets: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for &(date, value) in &series.observations {
        if !value.is_finite() {
            continue;
        }
        let entry = buckets.entry(native.period_start(date)).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }
    let knots: Vec<(NaiveDate, f64)> = buckets
        .into_iter()
        .map(|(date, (sum, n))| (date, sum / n as f64))
        .collect();

    let (first, _) = *knots.first()?;
    let (last, last_value) = *knots.last()?;
    let span = months_between(first, last) as usize;
    // A coarser period covers `months()` calendar months; carry the last
    // known value through the rest of its period.
    let tail = (native.months() - 1) as usize;
    let mut values = vec![f64::NAN; span + 1 + tail];

    match native {
        Frequency::Monthly => {
            for (date, value) in &knots {
                values[months_between(first, *date) as usize] = *value;
            }
        }
        Frequency::Quarterly | Frequency::Annual if target != Frequency::Monthly => {
            let width = native.months() as usize;
            for (date, value) in &knots {
                let i = months_between(first, *date) as usize;
                for slot in &mut values[i..i + width] {
                    *slot = *value;
                }
            }
        }
        Frequency::Quarterly | Frequency::Annual => {
            for pair in knots.windows(2) {
                let (d0, v0) = pair[0];
                let (d1, v1) = pair[1];
                let i0 = months_between(first, d0) as usize;
                let i1 = months_between(first, d1) as usize;
                for (k, slot) in values[i0..i1].iter_mut().enumerate() {
                    let u = k as f64 / (i1 - i0) as f64;
                    *slot = v0 + u * (v1 - v0);
                }
            }
            for slot in &mut values[span..] {
                *slot = last_value;
            }
        }
    }

    Some(MonthlyColumn {
        source_id: series.source_id.clone(),
        start: first,
        values,
    })
}

/// Fill a column in place: leading constant (or nearest value), linear
/// interpolation across internal gaps, forward fill at the end.
///
/// Columns with no observation at all are left untouched.
pub fn fill_gaps(values: &mut [f64], leading_fallback: Option<f64>) {
    let Some(first) = values.iter().position(|v| v.is_finite()) else {
        return;
    };
    let last = values.iter().rposition(|v| v.is_finite()).unwrap_or(first);

    let lead = leading_fallback.unwrap_or(values[first]);
    for slot in &mut values[..first] {
        *slot = lead;
    }
    let tail = values[last];
    for slot in &mut values[last + 1..] {
        *slot = tail;
    }

    let mut prev = first;
    for i in (first + 1)..=last {
        if !values[i].is_finite() {
            continue;
        }
        if i - prev > 1 {
            let (v0, v1) = (values[prev], values[i]);
            let gap = (i - prev) as f64;
            for k in (prev + 1)..i {
                let u = (k - prev) as f64 / gap;
                values[k] = v0 + u * (v1 - v0);
            }
        }
        prev = i;
    }
}

/// Average filled monthly columns into calendar quarters.
fn to_quarterly(
    start: NaiveDate,
    columns: BTreeMap<SeriesRole, (String, Vec<f64>)>,
) -> (NaiveDate, BTreeMap<SeriesRole, (String, Vec<f64>)>) {
    let q_start = Frequency::Quarterly.period_start(start);
    let lead = months_between(q_start, start) as usize;

    let out = columns
        .into_iter()
        .map(|(role, (source_id, values))| {
            let n_quarters = (lead + values.len()).div_ceil(3);
            let mut sums = vec![(0.0, 0usize); n_quarters];
            for (i, v) in values.iter().enumerate() {
                let q = (lead + i) / 3;
                sums[q].0 += v;
                sums[q].1 += 1;
            }
            let averaged = sums.into_iter().map(|(s, n)| s / n as f64).collect();
            (role, (source_id, averaged))
        })
        .collect();
    (q_start, out)
}

fn build_table(
    frequency: Frequency,
    start: NaiveDate,
    len: usize,
    columns: BTreeMap<SeriesRole, (String, Vec<f64>)>,
) -> Result<AlignedTable, AppError> {
    let mut table = AlignedTable::new(frequency, start, len);
    for (role, (source_id, values)) in columns {
        table.insert(role, source_id, values)?;
    }
    Ok(table)
}
