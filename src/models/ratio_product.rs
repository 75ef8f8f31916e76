//! Ratio/product NIV formula.
//!
//! State variables:
//!
//! - `u` = negative rolling mean of the long/short rate spread
//! - `X` = bounded investment growth x utilization fraction
//! - `F` = `clip(1 - money growth, 0, 2)`
//! - `P` = money growth x utilization fraction
//!
//! Composite: `(u * P * X) / (F + eps)`, divided by GDP, log-compressed,
//! divided by a floored trailing std, clipped and scaled.

use tracing::warn;

use crate::config::{FormulaVersion, RatioProductSettings};
use crate::domain::{AlignedTable, NivSeries, SeriesRole, StateVariables, TimeSeries};
use crate::error::AppError;
use crate::math::{
    PCT_CHANGE_HI, PCT_CHANGE_LO, bounded_pct_change, clip, clip_lower, finite_or, log_compress, pct_change,
    rolling_mean, rolling_std, zip_with,
};
use crate::models::NivFormula;

const REQUIRED: &[SeriesRole] = &[
    SeriesRole::Gdp,
    SeriesRole::Investment,
    SeriesRole::MoneySupply,
    SeriesRole::PolicyRate,
];

#[derive(Debug, Clone)]
pub struct RatioProduct {
    settings: RatioProductSettings,
    growth_smoothing: usize,
}

impl RatioProduct {
    pub fn new(settings: RatioProductSettings, growth_smoothing: usize) -> Self {
        Self {
            settings,
            growth_smoothing,
        }
    }

    /// Smoothed year-over-year money growth, clipped to the pct-change bounds.
    fn money_growth(&self, table: &AlignedTable, m2: &TimeSeries) -> Vec<f64> {
        let money = rolling_mean(m2.values(), self.settings.money_smoothing, 1);
        let yoy = pct_change(&money, table.frequency().periods_per_year());
        clip(&rolling_mean(&yoy, self.growth_smoothing, 1), PCT_CHANGE_LO, PCT_CHANGE_HI)
    }

    fn utilization(&self, table: &AlignedTable) -> Vec<f64> {
        match table.column(SeriesRole::CapacityUtilization) {
            Some(tcu) => tcu.iter().map(|v| v / 100.0).collect(),
            None => {
                warn!(
                    fallback = self.settings.utilization_fallback,
                    "no capacity utilization column; using constant utilization"
                );
                vec![self.settings.utilization_fallback; table.len()]
            }
        }
    }
}

impl NivFormula for RatioProduct {
    fn version(&self) -> FormulaVersion {
        FormulaVersion::RatioProduct
    }

    fn required_roles(&self) -> &'static [SeriesRole] {
        REQUIRED
    }

    fn build_state(&self, table: &AlignedTable) -> Result<StateVariables, AppError> {
        let investment = table.require(SeriesRole::Investment)?;
        let m2 = table.require(SeriesRole::MoneySupply)?;
        let policy = table.require(SeriesRole::PolicyRate)?;

        let util = self.utilization(table);
        let r_short: Vec<f64> = policy.values().iter().map(|v| v / 100.0).collect();
        let r_long: Vec<f64> = match table.column(SeriesRole::LongRate) {
            Some(long) => long.iter().map(|v| v / 100.0).collect(),
            None => {
                warn!("no long-rate column; spread falls back to zero");
                r_short.clone()
            }
        };

        let growth = self.money_growth(table, &m2);
        let d_inv = bounded_pct_change(investment.values(), 1, PCT_CHANGE_LO, PCT_CHANGE_HI);

        let spread = zip_with(&r_long, &r_short, |long, short| long - short);
        let u: Vec<f64> = rolling_mean(&spread, self.settings.spread_window, 1)
            .into_iter()
            .map(|v| -v)
            .collect();
        let x = finite_or(&zip_with(&d_inv, &util, |g, c| g * c), 0.0);
        let f = clip(&growth.iter().map(|g| 1.0 - g).collect::<Vec<_>>(), 0.0, 2.0);
        let p = finite_or(&zip_with(&growth, &util, |g, c| g * c), 0.0);

        Ok(StateVariables {
            u: investment.with_values("u_t", u),
            x: investment.with_values("X_t", x),
            f: investment.with_values("F_t", f),
            p: investment.with_values("P_t", p),
        })
    }

    fn compose(&self, table: &AlignedTable, state: &StateVariables) -> Result<NivSeries, AppError> {
        let s = &self.settings;
        let gdp = table.require(SeriesRole::Gdp)?;

        let raw: Vec<f64> = (0..table.len())
            .map(|i| {
                let v = state.u.values()[i] * state.p.values()[i] * state.x.values()[i]
                    / (state.f.values()[i] + s.epsilon);
                if v.is_finite() { v } else { 0.0 }
            })
            .collect();

        let gdp = clip_lower(gdp.values(), s.gdp_floor);
        let per_gdp = finite_or(&zip_with(&raw, &gdp, |n, g| n / g), 0.0);
        let compressed = log_compress(&per_gdp);

        // Rows before the normalizing std has warmed up are zero-filled.
        let spread = rolling_std(&compressed, s.std_window, s.std_min_periods);
        let niv: Vec<f64> = compressed
            .iter()
            .zip(&spread)
            .map(|(&v, &sd)| {
                if !sd.is_finite() {
                    return 0.0;
                }
                let scaled = (v / sd.max(s.std_floor)).clamp(-s.clip, s.clip) * s.scale;
                if scaled.is_finite() { scaled } else { 0.0 }
            })
            .collect();

        Ok(NivSeries {
            niv: state.u.with_values("NIV_t", niv),
            index: None,
        })
    }

    fn lsi_source<'a>(&self, state: &'a StateVariables, _niv: &'a NivSeries) -> &'a TimeSeries {
        &state.f
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Frequency;
    use crate::test_support::{macro_table, macro_table_without};

    fn formula() -> RatioProduct {
        RatioProduct::new(RatioProductSettings::default(), 3)
    }

    #[test]
    fn niv_stays_within_clip_range_and_is_finite() {
        let table = macro_table(240);
        let f = formula();
        let state = f.build_state(&table).unwrap();
        let niv = f.compose(&table, &state).unwrap();

        assert_eq!(niv.niv.len(), table.len());
        assert!(niv.niv.all_finite());
        assert!(niv.niv.values().iter().all(|v| (-50.0..=50.0).contains(v)));
        assert!(niv.index.is_none());
        // Warm-up rows before 30 observations of rolling std are zero.
        assert!(niv.niv.values()[..29].iter().all(|v| *v == 0.0));
        assert!(niv.niv.values()[29..].iter().any(|v| *v != 0.0));
    }

    #[test]
    fn extreme_inputs_are_still_clipped() {
        let mut table = AlignedTable::new(Frequency::Monthly, macro_table(1).start(), 80);
        let n = 80;
        let alternating: Vec<f64> = (0..n).map(|i| if i % 2 == 0 { 1.0 } else { 1e9 }).collect();
        table.insert(SeriesRole::Gdp, "GDP", vec![1e-12; n]).unwrap();
        table.insert(SeriesRole::Investment, "INVEST", alternating.clone()).unwrap();
        table.insert(SeriesRole::MoneySupply, "M2", alternating).unwrap();
        table
            .insert(SeriesRole::PolicyRate, "FEDFUNDS", (0..n).map(|i| (i % 7) as f64 * 10.0).collect())
            .unwrap();
        table.insert(SeriesRole::LongRate, "DGS10", vec![3.0; n]).unwrap();

        let f = formula();
        let state = f.build_state(&table).unwrap();
        let niv = f.compose(&table, &state).unwrap();
        assert!(niv.niv.all_finite());
        assert!(niv.niv.values().iter().all(|v| v.abs() <= 50.0));
    }

    #[test]
    fn state_variables_follow_definitions() {
        let table = macro_table(48);
        let state = formula().build_state(&table).unwrap();

        let tcu = table.column(SeriesRole::CapacityUtilization).unwrap();
        let inv = table.column(SeriesRole::Investment).unwrap();
        let long = table.column(SeriesRole::LongRate).unwrap();
        let short = table.column(SeriesRole::PolicyRate).unwrap();

        // u at t = 0 uses a single spread observation.
        let spread0 = long[0] / 100.0 - short[0] / 100.0;
        assert!((state.u.values()[0] + spread0).abs() < 1e-15);

        // X = clipped investment growth x utilization.
        let g = (inv[5] / inv[4] - 1.0).clamp(-0.5, 0.5);
        assert!((state.x.values()[5] - g * tcu[5] / 100.0).abs() < 1e-15);
        assert_eq!(state.x.values()[0], 0.0);

        // Friction is undefined until a year of money growth exists, then in [0, 2].
        assert!(state.f.values()[..12].iter().all(|v| v.is_nan()));
        assert!(state.f.values()[12..].iter().all(|v| (0.0..=2.0).contains(v)));
        // P is zero-filled over the same warm-up.
        assert!(state.p.values()[..12].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn optional_columns_fall_back() {
        let table = macro_table_without(48, &[SeriesRole::CapacityUtilization, SeriesRole::LongRate]);
        let state = formula().build_state(&table).unwrap();
        // No long rate: the spread is zero, so is u.
        assert!(state.u.values().iter().all(|v| *v == 0.0));
        let inv = table.column(SeriesRole::Investment).unwrap();
        let g = (inv[3] / inv[2] - 1.0).clamp(-0.5, 0.5);
        assert!((state.x.values()[3] - g * 0.8).abs() < 1e-15);
    }

    #[test]
    fn lsi_uses_friction() {
        let table = macro_table(48);
        let f = formula();
        let state = f.build_state(&table).unwrap();
        let niv = f.compose(&table, &state).unwrap();
        assert_eq!(f.lsi_source(&state, &niv).name(), "F_t");
    }
}
