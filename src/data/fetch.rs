//! Batch retrieval of input series.
//!
//! Series are independent until alignment, so they are fetched in parallel.
//! A failed fetch never aborts the batch: it is logged and recorded, and the
//! aligner decides what a missing series means for the run.

use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::SeriesSpec;
use crate::domain::{RawSeries, SeriesRole};
use crate::error::AppError;

/// Anything that can return observations for a configured series.
pub trait SeriesSource: Sync {
    fn fetch_series(&self, role: SeriesRole, spec: &SeriesSpec) -> Result<RawSeries, AppError>;
}

/// A series that could not be retrieved.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchFailure {
    pub role: SeriesRole,
    pub source_id: String,
    pub message: String,
}

/// Results of one fetch batch.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub series: Vec<RawSeries>,
    pub failures: Vec<FetchFailure>,
}

impl FetchOutcome {
    /// Human-readable warnings for failed series.
    pub fn warnings(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|f| format!("Skipped {} ({}): {}", f.role, f.source_id, f.message))
            .collect()
    }
}

/// Fetch every requested series; output order follows `requests`.
pub fn fetch_all(source: &dyn SeriesSource, requests: &[(SeriesRole, SeriesSpec)]) -> FetchOutcome {
    let results: Vec<(SeriesRole, &SeriesSpec, Result<RawSeries, AppError>)> = requests
        .par_iter()
        .map(|(role, spec)| (*role, spec, source.fetch_series(*role, spec)))
        .collect();

    let mut outcome = FetchOutcome::default();
    for (role, spec, result) in results {
        match result {
            Ok(series) => {
                info!(role = %role, series = %spec.id, rows = series.observations.len(), "loaded series");
                outcome.series.push(series);
            }
            Err(err) => {
                warn!(role = %role, series = %spec.id, error = %err, "skipped series");
                outcome.failures.push(FetchFailure {
                    role,
                    source_id: spec.id.clone(),
                    message: err.to_string(),
                });
            }
        }
    }
    outcome
}
