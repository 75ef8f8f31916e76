//! Kernel/power NIV formula.
//!
//! The impulse `u` is a weighted blend of investment growth, money growth and
//! the policy-rate change, smoothed with a normalized exponential kernel.
//! `P` is the productive-spend share of GDP, `X` idle capacity and `F` the
//! term-spread plus debt-service friction:
//!
//! ```text
//! NIV = u * P^2 / (X + F)^eta
//! ```
//!
//! The result is also rebased so the last observation reads 100.

use tracing::warn;

use crate::config::{FormulaVersion, Params, Windows};
use crate::domain::{AlignedTable, NivSeries, SeriesRole, StateVariables, TimeSeries};
use crate::error::AppError;
use crate::math::{
    PCT_CHANGE_HI, PCT_CHANGE_LO, bounded_pct_change, causal_kernel_smooth, clip, diff, exponential_kernel,
    finite_or, pct_change, rolling_mean, safe_ratio,
};
use crate::models::{NivFormula, column_or_zero};

const REQUIRED: &[SeriesRole] = &[
    SeriesRole::Gdp,
    SeriesRole::Investment,
    SeriesRole::MoneySupply,
    SeriesRole::PolicyRate,
    SeriesRole::CapacityUtilization,
    SeriesRole::LongRate,
    SeriesRole::ShortRate,
];

#[derive(Debug, Clone)]
pub struct KernelPower {
    params: Params,
    windows: Windows,
}

impl KernelPower {
    pub fn new(params: Params, windows: Windows) -> Self {
        Self { params, windows }
    }

    /// Blended driver `a1*dG + a2*dA + a3*dr`; 0 wherever any term is missing.
    fn driver(&self, table: &AlignedTable, inv: &[f64], m2: &[f64], fedfunds: &[f64]) -> Vec<f64> {
        let d_g = bounded_pct_change(inv, 1, PCT_CHANGE_LO, PCT_CHANGE_HI);
        let yoy = pct_change(m2, table.frequency().periods_per_year());
        let d_a = clip(&rolling_mean(&yoy, self.windows.growth_smoothing, 1), PCT_CHANGE_LO, PCT_CHANGE_HI);
        let d_r = diff(fedfunds, 1);

        let p = &self.params;
        let blended: Vec<f64> = (0..table.len())
            .map(|t| p.alpha1 * d_g[t] + p.alpha2 * d_a[t] + p.alpha3 * d_r[t] / 100.0)
            .collect();
        finite_or(&blended, 0.0)
    }
}

impl NivFormula for KernelPower {
    fn version(&self) -> FormulaVersion {
        FormulaVersion::KernelPower
    }

    fn required_roles(&self) -> &'static [SeriesRole] {
        REQUIRED
    }

    fn build_state(&self, table: &AlignedTable) -> Result<StateVariables, AppError> {
        let gdp = table.require(SeriesRole::Gdp)?;
        let inv = table.require(SeriesRole::Investment)?;
        let m2 = table.require(SeriesRole::MoneySupply)?;
        let fedfunds = table.require(SeriesRole::PolicyRate)?;
        let tcu = table.require(SeriesRole::CapacityUtilization)?;
        let long = table.require(SeriesRole::LongRate)?;
        let short = table.require(SeriesRole::ShortRate)?;

        let kernel = exponential_kernel(self.params.lambda, self.windows.impulse)?;
        let driver = self.driver(table, inv.values(), m2.values(), fedfunds.values());
        let u = finite_or(&causal_kernel_smooth(&driver, &kernel), 0.0);

        let rnd = column_or_zero(table, SeriesRole::RndSpend);
        let edu = column_or_zero(table, SeriesRole::EducationSpend);
        let tdsp = column_or_zero(table, SeriesRole::DebtService);

        let p: Vec<f64> = (0..table.len())
            .map(|t| {
                let g = gdp.values()[t];
                if g <= 0.0 {
                    return 0.0;
                }
                let share = (inv.values()[t] + rnd[t] + edu[t]) / g;
                if share.is_finite() { share } else { 0.0 }
            })
            .collect();

        let x = clip(&tcu.values().iter().map(|c| 1.0 - c / 100.0).collect::<Vec<_>>(), 0.0, 1.0);

        let debt_share = safe_ratio(&tdsp, gdp.values(), 0.0);
        let f: Vec<f64> = (0..table.len())
            .map(|t| (long.values()[t] - short.values()[t]).max(0.0) + debt_share[t])
            .collect();

        Ok(StateVariables {
            u: gdp.with_values("u_t", u),
            x: gdp.with_values("X_t", x),
            f: gdp.with_values("F_t", f),
            p: gdp.with_values("P_t", p),
        })
    }

    fn compose(&self, _table: &AlignedTable, state: &StateVariables) -> Result<NivSeries, AppError> {
        let eta = self.params.eta;
        let niv: Vec<f64> = (0..state.u.len())
            .map(|t| {
                let p = state.p.values()[t];
                let v = state.u.values()[t] * p * p / (state.x.values()[t] + state.f.values()[t]).powf(eta);
                if v.is_finite() { v } else { 0.0 }
            })
            .collect();

        let index = rebase_to_last(&niv);
        Ok(NivSeries {
            niv: state.u.with_values("NIV_t", niv),
            index: Some(state.u.with_values("NIV_Index", index)),
        })
    }

    fn lsi_source<'a>(&self, _state: &'a StateVariables, niv: &'a NivSeries) -> &'a TimeSeries {
        &niv.niv
    }
}

/// `100 * v / base` where `base` is the last non-zero value. Bases too small
/// to divide by safely count as zero; overflowing ratios become 0.
fn rebase_to_last(values: &[f64]) -> Vec<f64> {
    let Some(pos) = values.iter().rposition(|v| v.abs() >= f64::MIN_POSITIVE) else {
        warn!("NIV is zero everywhere; index is zero");
        return vec![0.0; values.len()];
    };
    if pos + 1 != values.len() {
        warn!(
            base_row = pos,
            last_row = values.len() - 1,
            "last NIV value is zero; rebasing to the most recent non-zero value"
        );
    }
    let base = values[pos];
    finite_or(&values.iter().map(|v| 100.0 * v / base).collect::<Vec<_>>(), 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{macro_table, macro_table_without};

    fn formula() -> KernelPower {
        KernelPower::new(Params::default(), Windows::default())
    }

    #[test]
    fn index_reads_100_at_the_last_row() {
        let table = macro_table(120);
        let f = formula();
        let state = f.build_state(&table).unwrap();
        let niv = f.compose(&table, &state).unwrap();

        assert!(niv.niv.all_finite());
        let index = niv.index.as_ref().unwrap();
        assert_eq!(index.name(), "NIV_Index");
        assert!((index.values()[119] - 100.0).abs() < 1e-9);
        assert_eq!(niv.indicator().name(), "NIV_Index");
    }

    #[test]
    fn state_variables_match_hand_computation() {
        let table = macro_table(36);
        let state = formula().build_state(&table).unwrap();
        let col = |r| table.column(r).unwrap();
        let t = 20;

        let x = (1.0 - col(SeriesRole::CapacityUtilization)[t] / 100.0).clamp(0.0, 1.0);
        assert!((state.x.values()[t] - x).abs() < 1e-12);

        let gdp = col(SeriesRole::Gdp)[t];
        let p = (col(SeriesRole::Investment)[t] + col(SeriesRole::RndSpend)[t] + col(SeriesRole::EducationSpend)[t])
            / gdp;
        assert!((state.p.values()[t] - p).abs() < 1e-12);

        let f = (col(SeriesRole::LongRate)[t] - col(SeriesRole::ShortRate)[t]).max(0.0)
            + col(SeriesRole::DebtService)[t] / gdp;
        assert!((state.f.values()[t] - f).abs() < 1e-12);
    }

    #[test]
    fn composite_follows_power_law() {
        let table = macro_table(60);
        let params = Params {
            eta: 2.0,
            ..Params::default()
        };
        let f = KernelPower::new(params, Windows::default());
        let state = f.build_state(&table).unwrap();
        let niv = f.compose(&table, &state).unwrap();
        let t = 40;
        let (u, p, x, fr) = (
            state.u.values()[t],
            state.p.values()[t],
            state.x.values()[t],
            state.f.values()[t],
        );
        let expected = u * p * p / (x + fr).powf(2.0);
        assert!((niv.niv.values()[t] - expected).abs() < 1e-12);
    }

    #[test]
    fn optional_columns_default_to_zero() {
        let table = macro_table_without(
            36,
            &[SeriesRole::RndSpend, SeriesRole::EducationSpend, SeriesRole::DebtService],
        );
        let state = formula().build_state(&table).unwrap();
        let col = |r| table.column(r).unwrap();
        let t = 10;
        let p = col(SeriesRole::Investment)[t] / col(SeriesRole::Gdp)[t];
        assert!((state.p.values()[t] - p).abs() < 1e-12);
        assert!(state.u.all_finite());
    }

    #[test]
    fn non_positive_gdp_gives_zero_share() {
        let mut table = macro_table(24);
        let mut gdp = table.column(SeriesRole::Gdp).unwrap().to_vec();
        gdp[5] = 0.0;
        gdp[6] = -1.0;
        table.insert(SeriesRole::Gdp, "GDP", gdp).unwrap();

        let f = formula();
        let state = f.build_state(&table).unwrap();
        assert_eq!(state.p.values()[5], 0.0);
        assert_eq!(state.p.values()[6], 0.0);
        let niv = f.compose(&table, &state).unwrap();
        assert!(niv.niv.all_finite());
    }

    #[test]
    fn rebase_falls_back_to_last_non_zero() {
        assert_eq!(rebase_to_last(&[1.0, 2.0, 0.0]), vec![50.0, 100.0, 0.0]);
        assert_eq!(rebase_to_last(&[0.0, 0.0]), vec![0.0, 0.0]);
        assert_eq!(rebase_to_last(&[-2.0, 4.0]), vec![-50.0, 100.0]);
    }

    #[test]
    fn index_stays_finite_for_tiny_bases() {
        let tiny = f64::MIN_POSITIVE * 4.0;
        let index = rebase_to_last(&[1.0, -2.0, tiny]);
        assert!(index.iter().all(|v| v.is_finite()));
        assert_eq!(index[2], 100.0);
        assert_eq!(index[..2], [0.0, 0.0]);

        // Subnormal tail values are skipped as a base.
        let index = rebase_to_last(&[2.0, 4.0, 1e-310]);
        assert_eq!(index[..2], [50.0, 100.0]);
        assert!(index[2].abs() < 1e-300);
    }

    #[test]
    fn driver_is_zero_until_every_term_exists() {
        let table = macro_table(36);
        let f = formula();
        let col = |r| table.column(r).unwrap();
        let driver = f.driver(
            &table,
            col(SeriesRole::Investment),
            col(SeriesRole::MoneySupply),
            col(SeriesRole::PolicyRate),
        );
        // Year-over-year money growth needs 12 monthly periods.
        assert!(driver[..12].iter().all(|v| *v == 0.0));
        assert!(driver[12..].iter().all(|v| v.is_finite()));
        assert!(driver[12..].iter().any(|v| *v != 0.0));
    }

    #[test]
    fn lsi_uses_niv() {
        let table = macro_table(48);
        let f = formula();
        let state = f.build_state(&table).unwrap();
        let niv = f.compose(&table, &state).unwrap();
        assert_eq!(f.lsi_source(&state, &niv).name(), "NIV_t");
    }
}
