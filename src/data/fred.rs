//! FRED API integration.
//!
//! One request per series; no retries. Values FRED reports as `"."` (missing)
//! are skipped rather than treated as errors.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::{Config, SeriesSpec};
use crate::data::credentials::CredentialSource;
use crate::data::fetch::SeriesSource;
use crate::domain::{Frequency, RawSeries, SeriesRole};
use crate::error::AppError;

const OBS_LIMIT: usize = 100_000;

pub struct FredClient {
    client: Client,
    api_key: String,
    base_url: String,
    observation_start: Option<NaiveDate>,
}

impl FredClient {
    pub fn new(api_key: String, base_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::source(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.into(),
            observation_start: None,
        })
    }

    /// Build a client from configuration, resolving the API key by name.
    pub fn from_config(config: &Config, credentials: &dyn CredentialSource) -> Result<Self, AppError> {
        let api_key = credentials.get_credential(&config.source.credential_env)?;
        let mut client = Self::new(
            api_key,
            config.source.base_url.clone(),
            Duration::from_secs(config.source.timeout_secs.max(1)),
        )?;
        client.observation_start = config.alignment.start_floor;
        Ok(client)
    }
}

impl SeriesSource for FredClient {
    fn fetch_series(&self, role: SeriesRole, spec: &SeriesSpec) -> Result<RawSeries, AppError> {
        let limit = OBS_LIMIT.to_string();
        let mut req = self.client.get(&self.base_url).query(&[
            ("series_id", spec.id.as_str()),
            ("api_key", self.api_key.as_str()),
            ("file_type", "json"),
            ("sort_order", "asc"),
            ("limit", limit.as_str()),
            // Let FRED average higher-frequency data (e.g. daily yields) into
            // the declared native period.
            ("frequency", fred_frequency(spec.frequency)),
            ("aggregation_method", "avg"),
        ]);

        if let Some(start) = self.observation_start {
            req = req.query(&[("observation_start", start.to_string())]);
        }

        let resp = req
            .send()
            .map_err(|e| AppError::source(format!("FRED request for {} failed: {e}", spec.id)))?;

        if !resp.status().is_success() {
            return Err(AppError::source(format!(
                "FRED request for {} failed with status {}.",
                spec.id,
                resp.status()
            )));
        }

        let body: ObservationsResponse = resp
            .json()
            .map_err(|e| AppError::source(format!("Failed to parse FRED response for {}: {e}", spec.id)))?;

        let observations = parse_observations(&body.observations)?;
        debug!(series = %spec.id, rows = observations.len(), "parsed FRED observations");

        Ok(RawSeries {
            role,
            source_id: spec.id.clone(),
            frequency: spec.frequency,
            observations,
        })
    }
}

fn fred_frequency(frequency: Frequency) -> &'static str {
    match frequency {
        Frequency::Monthly => "m",
        Frequency::Quarterly => "q",
        Frequency::Annual => "a",
    }
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    date: String,
    value: String,
}

fn parse_observations(raw: &[Observation]) -> Result<Vec<(NaiveDate, f64)>, AppError> {
    let mut out = Vec::with_capacity(raw.len());
    for obs in raw {
        let Some(value) = parse_value(&obs.value) else {
            continue;
        };
        let date = NaiveDate::parse_from_str(&obs.date, "%Y-%m-%d")
            .map_err(|e| AppError::source(format!("Invalid FRED date '{}': {e}", obs.date)))?;
        out.push((date, value));
    }
    Ok(out)
}

fn parse_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed == "." || trimmed.is_empty() {
        return None;
    }
    let v = trimmed.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}
