//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::dashboard::ChartKind;
use crate::metric::Metric;
use crate::selection::{MAX_SELECTION, MIN_COMPARISON};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// countydash - county poverty-alleviation statistics from the terminal
///
/// Fetches statistics from the dashboard backend and renders overview cards,
/// county lists, county details, interviews and multi-county comparisons as
/// Markdown or JSON.
///
/// Examples:
///   countydash overview
///   countydash counties --province 贵州省 --search 桐梓
///   countydash county 520322 --start-year 2012
///   countydash compare 520322 520324 532329 --metric PerCapitaGDP --chart bar
///   countydash --format json --output compare.json compare 520322 520324
///   countydash session
///   countydash --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Base URL of the statistics API (including `/api`)
    ///
    /// Overrides `[api] base_url` from .countydash.toml.
    #[arg(long, value_name = "URL", env = "COUNTYDASH_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .countydash.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT", global = true)]
    pub format: Option<OutputFormat>,

    /// Write the rendered view to a file instead of stdout
    #[arg(short, long, value_name = "FILE", global = true)]
    pub output: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Generate a default .countydash.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Headline counts and distributions
    Overview,

    /// Provinces that have poverty counties
    Provinces,

    /// List counties
    Counties {
        /// Only counties in this region
        #[arg(long)]
        region: Option<String>,

        /// Only counties in this province
        #[arg(long)]
        province: Option<String>,

        /// Keep counties whose name or province contains this text
        #[arg(long, value_name = "KEYWORD")]
        search: Option<String>,
    },

    /// Economy, agriculture and crops of one county
    County {
        /// County code, e.g. 520322
        code: String,

        #[arg(long, value_name = "YEAR")]
        start_year: Option<i32>,

        #[arg(long, value_name = "YEAR")]
        end_year: Option<i32>,

        /// Year of the crop sown-area breakdown
        #[arg(long, value_name = "YEAR")]
        crop_year: Option<i32>,
    },

    /// Field interviews
    Interviews {
        #[arg(long)]
        county_code: Option<String>,

        #[arg(long)]
        surveyor_id: Option<String>,

        #[arg(long)]
        keyword: Option<String>,

        /// Search by keyword alone, ignoring the other filters
        #[arg(long, value_name = "KEYWORD")]
        quick: Option<String>,
    },

    /// Compare one metric across 2 to 5 counties
    Compare {
        /// Counties as CODE or CODE:NAME
        #[arg(required = true, num_args = 1.., value_name = "CODE[:NAME]")]
        counties: Vec<CountyArg>,

        /// Metric to compare (GDP, PerCapitaGDP, RuralDisposableIncome, AgriOutputValue)
        #[arg(short, long)]
        metric: Option<Metric>,

        #[arg(long, value_name = "YEAR")]
        start_year: Option<i32>,

        #[arg(long, value_name = "YEAR")]
        end_year: Option<i32>,

        /// Chart shape (line, bar)
        #[arg(long)]
        chart: Option<ChartKind>,

        /// Breakdown year (defaults to the latest year with data)
        #[arg(long)]
        year: Option<i32>,
    },

    /// List every known metric with its unit
    Metrics,

    /// Interactive session that keeps a selection between commands
    Session,
}

/// A county given on the command line as `CODE` or `CODE:NAME`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountyArg {
    pub code: String,
    pub name: Option<String>,
}

impl FromStr for CountyArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (code, name) = match s.split_once(':') {
            Some((code, name)) => (code.trim(), Some(name.trim())),
            None => (s.trim(), None),
        };
        if code.is_empty() {
            return Err(format!("missing county code in '{}'", s));
        }
        Ok(Self {
            code: code.to_string(),
            name: name.filter(|n| !n.is_empty()).map(String::from),
        })
    }
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        let Some(ref command) = self.command else {
            return Err("No command given (try --help)".to_string());
        };

        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        match command {
            Command::County {
                start_year: Some(start),
                end_year: Some(end),
                ..
            }
            | Command::Compare {
                start_year: Some(start),
                end_year: Some(end),
                ..
            } if start > end => {
                return Err(format!("Start year {} is after end year {}", start, end));
            }
            _ => {}
        }

        if let Command::Compare { counties, .. } = command {
            if counties.len() < MIN_COMPARISON || counties.len() > MAX_SELECTION {
                return Err(format!(
                    "Compare needs between {} and {} counties (got {})",
                    MIN_COMPARISON,
                    MAX_SELECTION,
                    counties.len()
                ));
            }
            for (i, county) in counties.iter().enumerate() {
                if counties[..i].iter().any(|c| c.code == county.code) {
                    return Err(format!("County {} is listed twice", county.code));
                }
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
