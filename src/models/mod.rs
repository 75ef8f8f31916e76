//! NIV formula strategies.
//!
//! Two formulas compute identically named state variables with different
//! meanings; their outputs are not comparable. Each is a `NivFormula`
//! selected by `formula:` in configuration:
//!
//! - `ratio_product`: `NIV = u * P * X / (F + eps)`, GDP-normalized,
//!   log-compressed and variance-scaled into `[-clip * scale, clip * scale]`
//! - `kernel_power`: `NIV = u * P^2 / (X + F)^eta`, rebased to an index of
//!   100 at the last observation

use crate::config::{Config, FormulaVersion};
use crate::domain::{AlignedTable, NivSeries, SeriesRole, StateVariables, TimeSeries};
use crate::error::AppError;

pub mod kernel_power;
pub mod ratio_product;

pub use kernel_power::KernelPower;
pub use ratio_product::RatioProduct;

pub trait NivFormula {
    fn version(&self) -> FormulaVersion;

    /// Columns the formula cannot run without.
    fn required_roles(&self) -> &'static [SeriesRole];

    /// Derive `{u, X, F, P}` from the aligned table.
    fn build_state(&self, table: &AlignedTable) -> Result<StateVariables, AppError>;

    /// Combine state variables into the composite indicator.
    fn compose(&self, table: &AlignedTable, state: &StateVariables) -> Result<NivSeries, AppError>;

    /// Series whose short/long volatility ratio is reported as LSI.
    fn lsi_source<'a>(&self, state: &'a StateVariables, niv: &'a NivSeries) -> &'a TimeSeries;
}

/// The formula strategy configured for this run.
pub fn formula_for(config: &Config) -> Box<dyn NivFormula> {
    match config.formula {
        FormulaVersion::RatioProduct => Box::new(RatioProduct::new(
            config.ratio_product.clone(),
            config.windows.growth_smoothing,
        )),
        FormulaVersion::KernelPower => Box::new(KernelPower::new(config.params.clone(), config.windows.clone())),
    }
}

/// Fail fast, naming every missing required column.
pub fn check_required(formula: &dyn NivFormula, table: &AlignedTable) -> Result<(), AppError> {
    let missing: Vec<&SeriesRole> = formula
        .required_roles()
        .iter()
        .filter(|role| !table.contains(**role))
        .collect();
    match missing.as_slice() {
        [] => Ok(()),
        [role] => table.require(**role).map(|_| ()),
        roles => Err(AppError::data(format!(
            "Missing columns required by the {} formula: {}.",
            formula.version().display_name(),
            roles.iter().map(|r| r.label()).collect::<Vec<_>>().join(", ")
        ))),
    }
}

/// Build state variables and the composite in one step.
pub fn compute_niv(formula: &dyn NivFormula, table: &AlignedTable) -> Result<(StateVariables, NivSeries), AppError> {
    check_required(formula, table)?;
    let state = formula.build_state(table)?;
    let niv = formula.compose(table, &state)?;
    Ok((state, niv))
}

/// Values of an optional column, or zeros when it is absent.
pub(crate) fn column_or_zero(table: &AlignedTable, role: SeriesRole) -> Vec<f64> {
    table
        .column(role)
        .map(<[f64]>::to_vec)
        .unwrap_or_else(|| vec![0.0; table.len()])
}
