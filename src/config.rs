use crate::error::Result;
use crate::models::YearRange;
use crate::utils::constants::{
    DEFAULT_COVARIATE_A, DEFAULT_COVARIATE_B, DEFAULT_END_YEAR, DEFAULT_RESPONSE,
    DEFAULT_SEPARATOR, DEFAULT_SIGNIFICANCE, DEFAULT_START_YEAR, ENV_PREFIX,
};
use crate::utils::filename::default_output_path;
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::{Validate, ValidationError};

/// How the trend fit treats a row whose response series is only partly present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValuePolicy {
    /// Drop missing years before fitting; at least two points are needed.
    #[default]
    PairwiseDrop,
    /// Any missing year makes the whole row's slope missing.
    Propagate,
}

impl std::str::FromStr for MissingValuePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "pairwise_drop" | "drop" => Ok(MissingValuePolicy::PairwiseDrop),
            "propagate" => Ok(MissingValuePolicy::Propagate),
            other => Err(format!("unknown missing-value policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CovariatePrefixes {
    #[serde(alias = "A")]
    #[validate(length(min = 1))]
    pub a: String,

    #[serde(alias = "B")]
    #[validate(length(min = 1))]
    pub b: String,
}

impl CovariatePrefixes {
    pub fn as_slice(&self) -> [&str; 2] {
        [&self.a, &self.b]
    }
}

/// Settings for one analysis run, passed explicitly into the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_config"))]
pub struct AnalysisConfig {
    pub year_range: YearRange,

    #[validate(length(min = 1))]
    pub response_prefix: String,

    #[validate(nested)]
    pub covariate_prefixes: CovariatePrefixes,

    pub input_path: PathBuf,

    pub output_path: PathBuf,

    #[serde(default = "default_separator")]
    pub column_separator: String,

    #[serde(default)]
    pub missing_policy: MissingValuePolicy,

    #[serde(default)]
    pub trend_diagnostics: bool,

    #[serde(default = "default_significance")]
    #[validate(range(exclusive_min = 0.0, exclusive_max = 1.0))]
    pub significance_level: f64,
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

fn default_significance() -> f64 {
    DEFAULT_SIGNIFICANCE
}

fn validate_config(config: &AnalysisConfig) -> std::result::Result<(), ValidationError> {
    if config.year_range.start > config.year_range.end {
        let mut err = ValidationError::new("year_range");
        err.message = Some(
            format!(
                "start year {} is after end year {}",
                config.year_range.start, config.year_range.end
            )
            .into(),
        );
        return Err(err);
    }
    if config.input_path.as_os_str().is_empty() {
        return Err(ValidationError::new("input_path_empty"));
    }
    if config.output_path.as_os_str().is_empty() {
        return Err(ValidationError::new("output_path_empty"));
    }
    if config.input_path == config.output_path {
        return Err(ValidationError::new("output_overwrites_input"));
    }
    Ok(())
}

/// Values supplied on the command line; each one wins over file and environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub input_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub response_prefix: Option<String>,
    pub covariate_a: Option<String>,
    pub covariate_b: Option<String>,
    pub column_separator: Option<String>,
    pub missing_policy: Option<MissingValuePolicy>,
    pub trend_diagnostics: Option<bool>,
    /// Derive the output path from the input when none is configured,
    /// e.g. `_slope` turns `grid.csv` into `grid_slope.csv`.
    pub output_suffix: Option<String>,
}

impl AnalysisConfig {
    /// Layer defaults, an optional config file, `BA_TRENDS_*` environment
    /// variables and command-line overrides, then validate.
    pub fn load(file: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("year_range.start", DEFAULT_START_YEAR as i64)?
            .set_default("year_range.end", DEFAULT_END_YEAR as i64)?
            .set_default("response_prefix", DEFAULT_RESPONSE)?
            .set_default("covariate_prefixes.a", DEFAULT_COVARIATE_A)?
            .set_default("covariate_prefixes.b", DEFAULT_COVARIATE_B)?
            .set_default("column_separator", DEFAULT_SEPARATOR)?
            .set_default("significance_level", DEFAULT_SIGNIFICANCE)?
            .set_default("input_path", "")?
            .set_default("output_path", "")?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path));
        }

        builder = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("input_path", path_value(&overrides.input_path))?
            .set_override_option("output_path", path_value(&overrides.output_path))?
            .set_override_option("year_range.start", overrides.start_year.map(i64::from))?
            .set_override_option("year_range.end", overrides.end_year.map(i64::from))?
            .set_override_option("response_prefix", overrides.response_prefix.clone())?
            .set_override_option("covariate_prefixes.a", overrides.covariate_a.clone())?
            .set_override_option("covariate_prefixes.b", overrides.covariate_b.clone())?
            .set_override_option("column_separator", overrides.column_separator.clone())?
            .set_override_option(
                "missing_policy",
                overrides.missing_policy.map(policy_value),
            )?
            .set_override_option("trend_diagnostics", overrides.trend_diagnostics)?;

        let mut config: AnalysisConfig = builder.build()?.try_deserialize()?;
        if config.output_path.as_os_str().is_empty() && !config.input_path.as_os_str().is_empty() {
            if let Some(suffix) = &overrides.output_suffix {
                config.output_path = default_output_path(&config.input_path, suffix);
            }
        }
        config.validate()?;
        Ok(config)
    }
}

fn path_value(path: &Option<PathBuf>) -> Option<String> {
    path.as_ref().map(|p| p.to_string_lossy().into_owned())
}

fn policy_value(policy: MissingValuePolicy) -> String {
    match policy {
        MissingValuePolicy::PairwiseDrop => "pairwise_drop".to_string(),
        MissingValuePolicy::Propagate => "propagate".to_string(),
    }
}
