//! Run configuration loaded from YAML.
//!
//! Every field has a default, so an empty document (or no `--config` at all)
//! is a valid configuration. The `series:` block overrides the built-in
//! role -> FRED identifier mapping entry by entry instead of replacing it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Frequency, SeriesRole};
use crate::error::AppError;

/// Which NIV formula strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaVersion {
    /// `NIV = u * P * X / (F + eps)`, GDP-normalized and variance-scaled.
    RatioProduct,
    /// `NIV = u * P^2 / (X + F)^eta`, rebased to an index.
    #[default]
    KernelPower,
}

impl FormulaVersion {
    pub fn display_name(self) -> &'static str {
        match self {
            FormulaVersion::RatioProduct => "ratio/product",
            FormulaVersion::KernelPower => "kernel/power",
        }
    }
}

/// Formula coefficients (`params:` block).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Weight of investment growth in the impulse driver.
    pub alpha1: f64,
    /// Weight of money growth in the impulse driver.
    pub alpha2: f64,
    /// Weight of the policy-rate change in the impulse driver.
    pub alpha3: f64,
    /// Exponential kernel decay.
    pub lambda: f64,
    /// Friction exponent.
    pub eta: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            alpha1: 0.5,
            alpha2: 0.3,
            alpha3: -0.2,
            lambda: 0.05,
            eta: 1.0,
        }
    }
}

/// Window lengths, in periods of the aligned table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Windows {
    /// Impulse differencing horizon; also the discount kernel length.
    pub impulse: usize,
    pub drag: usize,
    pub lsi_short: usize,
    pub lsi_long: usize,
    /// Rolling window applied to money growth.
    pub growth_smoothing: usize,
}

impl Default for Windows {
    fn default() -> Self {
        Self {
            impulse: 12,
            drag: 24,
            lsi_short: 6,
            lsi_long: 24,
            growth_smoothing: 3,
        }
    }
}

/// Constants of the ratio/product formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatioProductSettings {
    /// Added to friction before dividing.
    pub epsilon: f64,
    /// Lower bound applied to the GDP level.
    pub gdp_floor: f64,
    /// Rolling window over the long/short rate spread.
    pub spread_window: usize,
    /// Rolling window applied to the money stock before growth is taken.
    pub money_smoothing: usize,
    /// Variance normalization window and its warm-up.
    pub std_window: usize,
    pub std_min_periods: usize,
    /// Lower bound on the normalizing rolling std.
    pub std_floor: f64,
    /// Symmetric clip applied after normalization (before scaling).
    pub clip: f64,
    pub scale: f64,
    /// Utilization fraction used when no capacity-utilization series exists.
    pub utilization_fallback: f64,
}

impl Default for RatioProductSettings {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            gdp_floor: 1e-6,
            spread_window: 3,
            money_smoothing: 3,
            std_window: 120,
            std_min_periods: 30,
            std_floor: 0.05,
            clip: 10.0,
            scale: 5.0,
            utilization_fallback: 0.8,
        }
    }
}

/// What to do when a configured series yields no observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingSeriesPolicy {
    /// Exclude the series and record a warning.
    #[default]
    Warn,
    /// Fail the run.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Target frequency of the aligned table (monthly or quarterly).
    pub frequency: Frequency,
    /// Rows before this date are dropped.
    pub start_floor: Option<NaiveDate>,
    pub on_missing: MissingSeriesPolicy,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            frequency: Frequency::Monthly,
            start_floor: NaiveDate::from_ymd_opt(1947, 1, 1),
            on_missing: MissingSeriesPolicy::Warn,
        }
    }
}

/// Fill policy for diagnostic rows without enough trailing history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarmupFill {
    /// Leave undefined (`NaN`, written as an empty CSV cell).
    #[default]
    Undefined,
    Zero,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub warmup: WarmupFill,
    /// Added to the long-window std in the LSI ratio.
    pub lsi_epsilon: f64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            warmup: WarmupFill::Undefined,
            lsi_epsilon: 1e-6,
        }
    }
}

/// Where input data comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Environment variable holding the FRED API key.
    pub credential_env: String,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Load a previously exported CSV instead of fetching.
    pub input_csv: Option<PathBuf>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            credential_env: "FRED_API_KEY".to_string(),
            base_url: "https://api.stlouisfed.org/fred/series/observations".to_string(),
            timeout_secs: 30,
            input_csv: None,
        }
    }
}

/// Provider identifier and alignment policy for one role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSpec {
    pub id: String,
    pub frequency: Frequency,
    /// Constant used before the series' first observation.
    #[serde(default)]
    pub fallback: Option<f64>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl SeriesSpec {
    pub fn new(id: &str, frequency: Frequency) -> Self {
        Self {
            id: id.to_string(),
            frequency,
            fallback: None,
            enabled: true,
        }
    }

    pub fn with_fallback(mut self, value: f64) -> Self {
        self.fallback = Some(value);
        self
    }
}

/// Built-in FRED mapping.
pub fn default_series() -> BTreeMap<SeriesRole, SeriesSpec> {
    BTreeMap::from([
        (SeriesRole::Gdp, SeriesSpec::new("GDPC1", Frequency::Quarterly)),
        (SeriesRole::Investment, SeriesSpec::new("GPDIC1", Frequency::Quarterly)),
        (SeriesRole::MoneySupply, SeriesSpec::new("M2SL", Frequency::Monthly)),
        // The funds rate starts in 1954; earlier rows use a nominal baseline.
        (
            SeriesRole::PolicyRate,
            SeriesSpec::new("FEDFUNDS", Frequency::Monthly).with_fallback(1.5),
        ),
        (SeriesRole::LongRate, SeriesSpec::new("DGS10", Frequency::Monthly)),
        (SeriesRole::ShortRate, SeriesSpec::new("TB3MS", Frequency::Monthly)),
        (SeriesRole::CapacityUtilization, SeriesSpec::new("TCU", Frequency::Monthly)),
        (SeriesRole::RndSpend, SeriesSpec::new("DSERRD3A086NBEA", Frequency::Annual)),
        (SeriesRole::EducationSpend, SeriesSpec::new("W211RC1A027NBEA", Frequency::Annual)),
        (SeriesRole::DebtService, SeriesSpec::new("TDSP", Frequency::Quarterly)),
    ])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    /// Write SVG charts.
    pub plots: bool,
    /// Print the terminal plot.
    pub ascii_plot: bool,
    pub ascii_width: usize,
    pub ascii_height: usize,
    pub chart_width: u32,
    pub chart_height: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            plots: true,
            ascii_plot: true,
            ascii_width: 100,
            ascii_height: 20,
            chart_width: 1200,
            chart_height: 600,
        }
    }
}

/// A full run's configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub formula: FormulaVersion,
    pub params: Params,
    pub windows: Windows,
    pub ratio_product: RatioProductSettings,
    pub alignment: AlignmentConfig,
    pub diagnostics: DiagnosticsConfig,
    pub source: SourceConfig,
    pub series: BTreeMap<SeriesRole, SeriesSpec>,
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            formula: FormulaVersion::default(),
            params: Params::default(),
            windows: Windows::default(),
            ratio_product: RatioProductSettings::default(),
            alignment: AlignmentConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
            source: SourceConfig::default(),
            series: default_series(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Load from `path`, or use defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let Some(path) = path else {
            let config = Config::default();
            config.validate()?;
            return Ok(config);
        };

        let text = fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("Failed to read config '{}': {e}", path.display())))?;
        Self::from_yaml_str(&text)
            .map_err(|e| AppError::config(format!("Invalid config '{}': {}", path.display(), e.message())))
    }

    /// Parse a YAML document, merging `series:` overrides into the defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self, AppError> {
        let mut config = if text.trim().is_empty() {
            Config::default()
        } else {
            let mut parsed: Config =
                serde_yaml::from_str(text).map_err(|e| AppError::config(format!("YAML error: {e}")))?;
            let overrides = std::mem::take(&mut parsed.series);
            parsed.series = default_series();
            parsed.series.extend(overrides);
            parsed
        };
        config.series.retain(|_, spec| spec.enabled);
        config.validate()?;
        Ok(config)
    }

    /// Enabled series, in role order.
    pub fn enabled_series(&self) -> impl Iterator<Item = (SeriesRole, &SeriesSpec)> {
        self.series
            .iter()
            .filter(|(_, spec)| spec.enabled)
            .map(|(role, spec)| (*role, spec))
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let p = &self.params;
        for (name, value) in [
            ("alpha1", p.alpha1),
            ("alpha2", p.alpha2),
            ("alpha3", p.alpha3),
            ("lambda", p.lambda),
            ("eta", p.eta),
        ] {
            if !value.is_finite() {
                return Err(AppError::config(format!("params.{name} must be finite (got {value}).")));
            }
        }

        let w = &self.windows;
        for (name, value) in [
            ("impulse", w.impulse),
            ("drag", w.drag),
            ("lsi_short", w.lsi_short),
            ("lsi_long", w.lsi_long),
            ("growth_smoothing", w.growth_smoothing),
        ] {
            if value == 0 {
                return Err(AppError::config(format!("windows.{name} must be >= 1.")));
            }
        }
        if w.lsi_short > w.lsi_long {
            return Err(AppError::config(format!(
                "windows.lsi_short ({}) must not exceed windows.lsi_long ({}).",
                w.lsi_short, w.lsi_long
            )));
        }

        let r = &self.ratio_product;
        if r.spread_window == 0 || r.money_smoothing == 0 || r.std_window == 0 {
            return Err(AppError::config("ratio_product windows must be >= 1."));
        }
        if r.std_min_periods > r.std_window {
            return Err(AppError::config("ratio_product.std_min_periods must not exceed std_window."));
        }
        if !(r.std_floor > 0.0 && r.clip > 0.0 && r.epsilon >= 0.0 && r.gdp_floor > 0.0) {
            return Err(AppError::config(
                "ratio_product.std_floor, clip and gdp_floor must be > 0; epsilon must be >= 0.",
            ));
        }
        if !(r.scale.is_finite() && r.utilization_fallback.is_finite()) {
            return Err(AppError::config("ratio_product.scale and utilization_fallback must be finite."));
        }

        if self.alignment.frequency == Frequency::Annual {
            return Err(AppError::config("alignment.frequency must be monthly or quarterly."));
        }
        if !(self.diagnostics.lsi_epsilon >= 0.0) {
            return Err(AppError::config("diagnostics.lsi_epsilon must be >= 0."));
        }
        if self.source.credential_env.trim().is_empty() {
            return Err(AppError::config("source.credential_env must name an environment variable."));
        }
        if self.enabled_series().next().is_none() {
            return Err(AppError::config("No input series configured."));
        }
        for (role, spec) in self.enabled_series() {
            if spec.id.trim().is_empty() {
                return Err(AppError::config(format!("series.{role}.id must not be empty.")));
            }
            if let Some(v) = spec.fallback {
                if !v.is_finite() {
                    return Err(AppError::config(format!("series.{role}.fallback must be finite.")));
                }
            }
        }
        if self.output.ascii_width < 10 || self.output.ascii_height < 5 {
            return Err(AppError::config("output.ascii_width/ascii_height too small (min 10x5)."));
        }
        Ok(())
    }
}
