//! Secondary series derived from the composite: Impulse, Drag and LSI.

use crate::config::{DiagnosticsConfig, WarmupFill, Windows};
use crate::domain::{DiagnosticsBundle, NivSeries, TimeSeries};
use crate::math::{diff, rolling_std};

/// Builds [`DiagnosticsBundle`]s from a composite and the formula's LSI source.
#[derive(Debug, Clone)]
pub struct DiagnosticsBuilder {
    windows: Windows,
    settings: DiagnosticsConfig,
}

impl DiagnosticsBuilder {
    pub fn new(windows: Windows, settings: DiagnosticsConfig) -> Self {
        Self { windows, settings }
    }

    pub fn build(&self, niv: &NivSeries, lsi_source: &TimeSeries) -> DiagnosticsBundle {
        let w = &self.windows;
        let values = niv.niv.values();

        let impulse = diff(values, w.impulse);
        let drag = rolling_std(values, w.drag, w.drag);

        let short = rolling_std(lsi_source.values(), w.lsi_short, w.lsi_short);
        let long = rolling_std(lsi_source.values(), w.lsi_long, w.lsi_long);
        let eps = self.settings.lsi_epsilon;
        let lsi: Vec<f64> = short.iter().zip(&long).map(|(s, l)| s / (l + eps)).collect();

        DiagnosticsBundle {
            impulse: niv.niv.with_values("Impulse", self.warmup(impulse)),
            drag: niv.niv.with_values("Drag", self.warmup(drag)),
            lsi: niv.niv.with_values("LSI", self.warmup(lsi)),
        }
    }

    // Anything non-finite here is a warm-up row (or a gap in the LSI source).
    fn warmup(&self, values: Vec<f64>) -> Vec<f64> {
        let fill = match self.settings.warmup {
            WarmupFill::Undefined => f64::NAN,
            WarmupFill::Zero => 0.0,
        };
        values.into_iter().map(|v| if v.is_finite() { v } else { fill }).collect()
    }
}
