//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.countydash.toml` files.

use crate::api::YearRange;
use crate::cli::{Args, Command, OutputFormat};
use crate::dashboard::{ChartKind, DashboardSettings};
use crate::metric::Metric;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the config file looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = ".countydash.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Comparison defaults.
    #[serde(default)]
    pub compare: CompareConfig,

    /// County list settings.
    #[serde(default)]
    pub counties: CountiesConfig,

    /// Interview list settings.
    #[serde(default)]
    pub interviews: InterviewsConfig,

    /// County detail settings.
    #[serde(default)]
    pub detail: DetailConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Statistics backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL including the `/api` prefix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5001/api".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Comparison defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareConfig {
    /// Metric compared when none is given.
    #[serde(default = "default_metric")]
    pub metric: Metric,

    #[serde(default = "default_start_year")]
    pub start_year: i32,

    #[serde(default = "default_end_year")]
    pub end_year: i32,

    /// Breakdown year used when the comparison returns no rows.
    #[serde(default = "default_end_year")]
    pub fallback_year: i32,

    /// Preferred chart shape.
    #[serde(default)]
    pub chart: ChartKind,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            metric: default_metric(),
            start_year: default_start_year(),
            end_year: default_end_year(),
            fallback_year: default_end_year(),
            chart: ChartKind::default(),
        }
    }
}

fn default_metric() -> Metric {
    Metric::Gdp
}

fn default_start_year() -> i32 {
    2010
}

fn default_end_year() -> i32 {
    2020
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountiesConfig {
    /// Counties shown in the list.
    #[serde(default = "default_display_limit")]
    pub display_limit: usize,
}

impl Default for CountiesConfig {
    fn default() -> Self {
        Self {
            display_limit: default_display_limit(),
        }
    }
}

fn default_display_limit() -> usize {
    12
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewsConfig {
    /// Interviews requested per load.
    #[serde(default = "default_interview_limit")]
    pub limit: usize,
}

impl Default for InterviewsConfig {
    fn default() -> Self {
        Self {
            limit: default_interview_limit(),
        }
    }
}

fn default_interview_limit() -> usize {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailConfig {
    /// Year of the crop sown-area breakdown.
    #[serde(default = "default_end_year")]
    pub crop_year: i32,
}

impl Default for DetailConfig {
    fn default() -> Self {
        Self {
            crop_year: default_end_year(),
        }
    }
}

/// Report generation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output format when `--format` is not given.
    #[serde(default)]
    pub format: OutputFormat,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, and only
    /// override when given explicitly.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref url) = args.api_url {
            self.api.base_url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = timeout;
        }
        if let Some(format) = args.format {
            self.report.format = format;
        }

        match &args.command {
            Some(Command::County {
                start_year,
                end_year,
                crop_year,
                ..
            }) => {
                self.merge_years(*start_year, *end_year);
                if let Some(year) = crop_year {
                    self.detail.crop_year = *year;
                }
            }
            Some(Command::Compare {
                metric,
                start_year,
                end_year,
                chart,
                ..
            }) => {
                self.merge_years(*start_year, *end_year);
                if let Some(metric) = metric {
                    self.compare.metric = *metric;
                }
                if let Some(chart) = chart {
                    self.compare.chart = *chart;
                }
            }
            _ => {}
        }
    }

    fn merge_years(&mut self, start: Option<i32>, end: Option<i32>) {
        if let Some(start) = start {
            self.compare.start_year = start;
        }
        if let Some(end) = end {
            self.compare.end_year = end;
        }
    }

    /// Check values a config file could get wrong.
    pub fn validate(&self) -> Result<()> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            anyhow::bail!("API URL must start with 'http://' or 'https://'");
        }
        if self.api.timeout_seconds == 0 {
            anyhow::bail!("Timeout must be at least 1 second");
        }
        if self.compare.start_year > self.compare.end_year {
            anyhow::bail!(
                "Start year {} is after end year {}",
                self.compare.start_year,
                self.compare.end_year
            );
        }
        if self.counties.display_limit == 0 || self.interviews.limit == 0 {
            anyhow::bail!("List limits must be at least 1");
        }
        Ok(())
    }

    /// Session defaults derived from this configuration.
    pub fn dashboard_settings(&self) -> DashboardSettings {
        DashboardSettings {
            metric: self.compare.metric,
            range: YearRange::new(self.compare.start_year, self.compare.end_year),
            chart: self.compare.chart,
            fallback_year: self.compare.fallback_year,
            crop_year: self.detail.crop_year,
            county_limit: self.counties.display_limit,
            interview_limit: self.interviews.limit,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
