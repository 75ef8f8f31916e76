//! Formatted terminal output for a run.
//!
//! Formatting lives here so the pipeline and the math stay free of
//! presentation concerns.

use crate::report::RunSummary;

/// Format the full run summary (parameters, coverage, column counts, NIV stats).
pub fn format_run_summary(summary: &RunSummary) -> String {
    let mut out = String::new();

    out.push_str("=== niv - National Impact Velocity ===\n");
    out.push_str(&format!("Formula: {}\n", summary.formula.display_name()));
    let p = &summary.params;
    out.push_str(&format!(
        "Params: alpha1={} alpha2={} alpha3={} lambda={} eta={}\n",
        p.alpha1, p.alpha2, p.alpha3, p.lambda, p.eta
    ));
    let w = &summary.windows;
    out.push_str(&format!(
        "Windows: impulse={} drag={} lsi={}/{} growth_smoothing={}\n",
        w.impulse, w.drag, w.lsi_short, w.lsi_long, w.growth_smoothing
    ));
    out.push_str(&format!(
        "Index: {} rows ({}) | {} .. {}\n",
        summary.rows,
        summary.frequency,
        summary.start,
        summary.end.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
    ));

    out.push_str("\nInputs:\n");
    for input in &summary.inputs {
        out.push_str(&format!("  {:<10} {}\n", input.series, input.source_id));
    }
    for excluded in &summary.excluded {
        out.push_str(&format!("  (excluded) {excluded}\n"));
    }

    out.push_str("\nOutput columns (non-null):\n");
    for col in &summary.outputs {
        out.push_str(&format!("  {:<10} {:>6}\n", col.column, col.non_null));
    }

    out.push('\n');
    match &summary.niv {
        Some(s) => out.push_str(&format!(
            "NIV_t: mean={} std={} min={} max={}\n",
            fmt_num(s.mean),
            fmt_num(s.std),
            fmt_num(s.min),
            fmt_num(s.max)
        )),
        None => out.push_str("NIV_t: no finite values\n"),
    }

    if !summary.warnings.is_empty() {
        out.push_str("\nWarnings:\n");
        for w in &summary.warnings {
            out.push_str(&format!("- {w}\n"));
        }
    }

    out
}

fn fmt_num(v: f64) -> String {
    if v != 0.0 && (v.abs() < 1e-3 || v.abs() >= 1e6) {
        format!("{v:.4e}")
    } else {
        format!("{v:.4}")
    }
}
