//! Deterministic fixture tables for unit tests.

use chrono::NaiveDate;

use crate::domain::{AlignedTable, Frequency, SeriesRole};

/// A monthly table starting 1990-01 with smooth, plausible macro series.
pub fn macro_table(n: usize) -> AlignedTable {
    macro_table_without(n, &[])
}

/// Same as [`macro_table`] with some roles left out.
pub fn macro_table_without(n: usize, skip: &[SeriesRole]) -> AlignedTable {
    let start = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
    let mut table = AlignedTable::new(Frequency::Monthly, start, n);
    let series = |f: &dyn Fn(f64) -> f64| (0..n).map(|i| f(i as f64)).collect::<Vec<f64>>();

    let columns: Vec<(SeriesRole, Vec<f64>)> = vec![
        (SeriesRole::Gdp, series(&|t| 10_000.0 * 1.005_f64.powf(t) + 50.0 * (t / 7.0).sin())),
        (
            SeriesRole::Investment,
            series(&|t| 2_000.0 * 1.004_f64.powf(t) * (1.0 + 0.05 * (t / 5.0).sin())),
        ),
        (SeriesRole::MoneySupply, series(&|t| 3_000.0 * 1.006_f64.powf(t) + 20.0 * (t / 4.0).cos())),
        (SeriesRole::PolicyRate, series(&|t| 5.0 + 2.0 * (t / 12.0).sin())),
        (SeriesRole::LongRate, series(&|t| 6.0 + 1.5 * (t / 18.0).sin())),
        (SeriesRole::ShortRate, series(&|t| 4.5 + 2.0 * (t / 12.0 + 0.3).sin())),
        (SeriesRole::CapacityUtilization, series(&|t| 78.0 + 4.0 * (t / 9.0).sin())),
        (SeriesRole::RndSpend, series(&|t| 300.0 * 1.003_f64.powf(t))),
        (SeriesRole::EducationSpend, series(&|t| 500.0 * 1.002_f64.powf(t))),
        (SeriesRole::DebtService, series(&|t| 10.0 + (t / 20.0).cos())),
    ];

    for (role, values) in columns {
        if skip.contains(&role) {
            continue;
        }
        table.insert(role, role.label(), values).unwrap();
    }
    table
}
