//! Shared domain types.
//!
//! These types are deliberately small and owned so every pipeline phase can
//! hand a fresh value to the next one:
//!
//! - raw fetched/loaded observations (`RawSeries`)
//! - contiguous, regularly indexed series (`TimeSeries`)
//! - the aligned input table (`AlignedTable`)
//! - formula outputs (`StateVariables`, `NivSeries`, `DiagnosticsBundle`,
//!   bundled as `RunOutput`)

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Sampling frequency of a series.
///
/// Every timestamp is pinned to the first day of its period (`MS` / `QS`
/// conventions). `Annual` is only valid as a *native* frequency of an input;
/// aligned tables are monthly or quarterly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Monthly,
    Quarterly,
    Annual,
}

impl Frequency {
    /// Number of calendar months covered by one period.
    pub fn months(self) -> u32 {
        match self {
            Frequency::Monthly => 1,
            Frequency::Quarterly => 3,
            Frequency::Annual => 12,
        }
    }

    pub fn periods_per_year(self) -> usize {
        (12 / self.months()) as usize
    }

    /// Pandas-style frequency code, used in summaries.
    pub fn code(self) -> &'static str {
        match self {
            Frequency::Monthly => "MS",
            Frequency::Quarterly => "QS",
            Frequency::Annual => "AS",
        }
    }

    /// First day of the period containing `date`.
    pub fn period_start(self, date: NaiveDate) -> NaiveDate {
        let first = date - Days::new(u64::from(date.day0()));
        let back = date.month0() % self.months();
        first.checked_sub_months(Months::new(back)).unwrap_or(first)
    }

    /// `date` moved forward by `n` periods.
    pub fn advance(self, date: NaiveDate, n: usize) -> NaiveDate {
        let months = u32::try_from(n).unwrap_or(u32::MAX).saturating_mul(self.months());
        date.checked_add_months(Months::new(months)).unwrap_or(NaiveDate::MAX)
    }

    /// Whole periods from `from` to `to` (negative when `to` is earlier).
    pub fn periods_between(self, from: NaiveDate, to: NaiveDate) -> i64 {
        months_between(from, to).div_euclid(i64::from(self.months()))
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Annual => "annual",
        };
        f.write_str(name)
    }
}

/// Calendar months from `from` to `to`, ignoring the day of month.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (i64::from(to.year()) - i64::from(from.year())) * 12 + i64::from(to.month0()) - i64::from(from.month0())
}

/// Semantic role of an input series.
///
/// Formula code only ever refers to roles; the mapping to a data provider's
/// identifiers lives in configuration (`series:` block).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SeriesRole {
    #[serde(rename = "GDP")]
    Gdp,
    #[serde(rename = "INVEST")]
    Investment,
    #[serde(rename = "M2")]
    MoneySupply,
    #[serde(rename = "FEDFUNDS")]
    PolicyRate,
    #[serde(rename = "DGS10")]
    LongRate,
    #[serde(rename = "TB3MS")]
    ShortRate,
    #[serde(rename = "TCU")]
    CapacityUtilization,
    #[serde(rename = "RND")]
    RndSpend,
    #[serde(rename = "EDU")]
    EducationSpend,
    #[serde(rename = "TDSP")]
    DebtService,
}

impl SeriesRole {
    pub const ALL: [SeriesRole; 10] = [
        SeriesRole::Gdp,
        SeriesRole::Investment,
        SeriesRole::MoneySupply,
        SeriesRole::PolicyRate,
        SeriesRole::LongRate,
        SeriesRole::ShortRate,
        SeriesRole::CapacityUtilization,
        SeriesRole::RndSpend,
        SeriesRole::EducationSpend,
        SeriesRole::DebtService,
    ];

    /// Column label used in CSV files and config keys.
    pub fn label(self) -> &'static str {
        match self {
            SeriesRole::Gdp => "GDP",
            SeriesRole::Investment => "INVEST",
            SeriesRole::MoneySupply => "M2",
            SeriesRole::PolicyRate => "FEDFUNDS",
            SeriesRole::LongRate => "DGS10",
            SeriesRole::ShortRate => "TB3MS",
            SeriesRole::CapacityUtilization => "TCU",
            SeriesRole::RndSpend => "RND",
            SeriesRole::EducationSpend => "EDU",
            SeriesRole::DebtService => "TDSP",
        }
    }

    /// Human-readable description for reports.
    pub fn description(self) -> &'static str {
        match self {
            SeriesRole::Gdp => "Real GDP",
            SeriesRole::Investment => "Gross private domestic investment",
            SeriesRole::MoneySupply => "M2 money stock",
            SeriesRole::PolicyRate => "Effective federal funds rate",
            SeriesRole::LongRate => "10-year Treasury yield",
            SeriesRole::ShortRate => "3-month Treasury bill rate",
            SeriesRole::CapacityUtilization => "Capacity utilization (total industry)",
            SeriesRole::RndSpend => "Research and development spend",
            SeriesRole::EducationSpend => "Education spend",
            SeriesRole::DebtService => "Household debt service ratio",
        }
    }

    pub fn from_label(label: &str) -> Option<SeriesRole> {
        let label = label.trim();
        SeriesRole::ALL
            .into_iter()
            .find(|role| role.label().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for SeriesRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Observations for one series as delivered by a source, before alignment.
///
/// Dates may be unordered or irregular; values may contain gaps.
#[derive(Debug, Clone)]
pub struct RawSeries {
    pub role: SeriesRole,
    pub source_id: String,
    pub frequency: Frequency,
    pub observations: Vec<(NaiveDate, f64)>,
}

/// A named, regularly indexed series.
///
/// The index is implied by `start` and `frequency`, so it is strictly
/// increasing and gap-free by construction. Missing values are `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    name: String,
    frequency: Frequency,
    start: NaiveDate,
    values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(name: impl Into<String>, frequency: Frequency, start: NaiveDate, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            frequency,
            start: frequency.period_start(start),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn date_at(&self, i: usize) -> NaiveDate {
        self.frequency.advance(self.start, i)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        (0..self.len()).map(|i| self.date_at(i)).collect()
    }

    /// New series on the same index with different values.
    ///
    /// `values` must have the same length as `self`.
    pub fn with_values(&self, name: impl Into<String>, values: Vec<f64>) -> TimeSeries {
        debug_assert_eq!(values.len(), self.values.len(), "series length mismatch");
        TimeSeries {
            name: name.into(),
            frequency: self.frequency,
            start: self.start,
            values,
        }
    }

    /// Number of finite observations.
    pub fn count_finite(&self) -> usize {
        self.values.iter().filter(|v| v.is_finite()).count()
    }

    pub fn all_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }
}

/// All input series on one shared, gap-free index.
#[derive(Debug, Clone)]
pub struct AlignedTable {
    frequency: Frequency,
    start: NaiveDate,
    len: usize,
    columns: BTreeMap<SeriesRole, Vec<f64>>,
    source_ids: BTreeMap<SeriesRole, String>,
}

impl AlignedTable {
    pub fn new(frequency: Frequency, start: NaiveDate, len: usize) -> Self {
        Self {
            frequency,
            start: frequency.period_start(start),
            len,
            columns: BTreeMap::new(),
            source_ids: BTreeMap::new(),
        }
    }

    /// Add a column; it must cover the whole index with no missing values.
    pub fn insert(&mut self, role: SeriesRole, source_id: impl Into<String>, values: Vec<f64>) -> Result<(), AppError> {
        if values.len() != self.len {
            return Err(AppError::data(format!(
                "Column {role} has {} rows, table index has {}.",
                values.len(),
                self.len
            )));
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(AppError::data(format!(
                "Column {role} has a gap at {}.",
                self.frequency.advance(self.start, pos)
            )));
        }
        self.columns.insert(role, values);
        self.source_ids.insert(role, source_id.into());
        Ok(())
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.len.checked_sub(1).map(|last| self.date_at(last))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn date_at(&self, i: usize) -> NaiveDate {
        self.frequency.advance(self.start, i)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        (0..self.len).map(|i| self.date_at(i)).collect()
    }

    pub fn roles(&self) -> impl Iterator<Item = SeriesRole> + '_ {
        self.columns.keys().copied()
    }

    pub fn contains(&self, role: SeriesRole) -> bool {
        self.columns.contains_key(&role)
    }

    pub fn column(&self, role: SeriesRole) -> Option<&[f64]> {
        self.columns.get(&role).map(Vec::as_slice)
    }

    pub fn source_id(&self, role: SeriesRole) -> Option<&str> {
        self.source_ids.get(&role).map(String::as_str)
    }

    /// Column as a `TimeSeries` named after its role label.
    pub fn get(&self, role: SeriesRole) -> Option<TimeSeries> {
        self.columns
            .get(&role)
            .map(|values| TimeSeries::new(role.label(), self.frequency, self.start, values.clone()))
    }

    /// Required column lookup; absence is a fatal data error.
    pub fn require(&self, role: SeriesRole) -> Result<TimeSeries, AppError> {
        self.get(role).ok_or_else(|| {
            AppError::data(format!(
                "Missing {} column ({}) required by the NIV formula.",
                role.label(),
                role.description()
            ))
        })
    }
}

/// Intermediate state variables shared by both NIV formulas.
#[derive(Debug, Clone, PartialEq)]
pub struct StateVariables {
    /// Policy intensity / discounted impulse.
    pub u: TimeSeries,
    /// Activation potential or idle capacity, depending on the formula.
    pub x: TimeSeries,
    /// Friction.
    pub f: TimeSeries,
    /// Regeneration / activation share.
    pub p: TimeSeries,
}

/// Composite indicator output.
#[derive(Debug, Clone, PartialEq)]
pub struct NivSeries {
    /// `NIV_t`, always finite.
    pub niv: TimeSeries,
    /// `NIV_Index`, rebased to 100 at the last observation (kernel/power only).
    pub index: Option<TimeSeries>,
}

impl NivSeries {
    /// The normalized indicator: the rebased index when present, else `NIV_t`.
    pub fn indicator(&self) -> &TimeSeries {
        self.index.as_ref().unwrap_or(&self.niv)
    }
}

/// Secondary series derived from the indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticsBundle {
    pub impulse: TimeSeries,
    pub drag: TimeSeries,
    pub lsi: TimeSeries,
}

/// Everything one computation over an aligned table produces.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub state: StateVariables,
    pub niv: NivSeries,
    pub diagnostics: DiagnosticsBundle,
    /// Non-fatal problems collected by every phase so far.
    pub warnings: Vec<String>,
}

impl RunOutput {
    /// Output columns in export order.
    pub fn columns(&self) -> Vec<&TimeSeries> {
        let mut out = vec![&self.niv.niv];
        out.extend(self.niv.index.as_ref());
        out.extend([
            &self.state.u,
            &self.state.p,
            &self.state.x,
            &self.state.f,
            &self.diagnostics.impulse,
            &self.diagnostics.drag,
            &self.diagnostics.lsi,
        ]);
        out
    }
}
