//! countydash - county poverty-alleviation statistics from the terminal
//!
//! A CLI client for the dashboard's statistics backend. Each view is a
//! subcommand rendered as Markdown or JSON; `session` keeps a county
//! selection alive for interactive comparisons.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad arguments, config, invalid comparison, etc.)
//!   2 - The backend could not be reached for the requested view

mod analysis;
mod api;
mod cli;
mod config;
mod dashboard;
mod metric;
mod models;
mod report;
mod selection;
mod session;

#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use api::{CountyFilters, StatsClient};
use cli::{Args, Command, OutputFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use dashboard::{Applied, Dashboard, InterviewFilters, MetricEntry};
use indicatif::{ProgressBar, ProgressStyle};
use report::{Report, ReportMetadata, ViewReport};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    debug!("countydash v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .countydash.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to set the API URL, default metric and year range.");
    Ok(())
}

/// Initialize logging on stderr. `RUST_LOG` overrides the verbosity flags.
fn init_logging(args: &Args) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(args.log_level()).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run one command. Returns the exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    let Some(command) = args.command.clone() else {
        return Ok(0);
    };

    let client = StatsClient::new(
        &config.api.base_url,
        Duration::from_secs(config.api.timeout_seconds),
    )?;
    info!("Using API at {}", client.base_url());
    let dashboard = Arc::new(Dashboard::new(client, config.dashboard_settings()));

    let spinner = spinner(args.quiet);
    let (view, applied) = match command {
        Command::Overview => {
            spinner.set_message("Loading overview...");
            let applied = dashboard.load_overview().await;
            (ViewReport::Overview(dashboard.snapshot().overview), applied)
        }
        Command::Provinces => {
            spinner.set_message("Loading provinces...");
            let applied = dashboard.load_provinces().await;
            (ViewReport::Provinces(dashboard.snapshot().provinces), applied)
        }
        Command::Counties {
            region,
            province,
            search,
        } => {
            spinner.set_message("Loading counties...");
            let applied = dashboard
                .load_counties(CountyFilters { region, province }, search)
                .await;
            (ViewReport::Counties(dashboard.snapshot().counties), applied)
        }
        Command::County { code, .. } => {
            spinner.set_message(format!("Loading county {}...", code));
            let applied = dashboard.show_county_detail(&code).await;
            let detail = dashboard
                .snapshot()
                .detail
                .context("County detail was not loaded")?;
            (ViewReport::CountyDetail(detail), applied)
        }
        Command::Interviews {
            county_code,
            surveyor_id,
            keyword,
            quick,
        } => {
            spinner.set_message("Loading interviews...");
            dashboard.set_interview_filters(InterviewFilters {
                county_code,
                surveyor_id,
                keyword,
            });
            let applied = dashboard.load_interviews(quick.as_deref()).await;
            (ViewReport::Interviews(dashboard.snapshot().interviews), applied)
        }
        Command::Compare { counties, year, .. } => {
            spinner.set_message("Comparing counties...");
            for county in &counties {
                dashboard.toggle_county(&county.code, county.name.as_deref())?;
            }
            dashboard.set_breakdown_year(year);
            let applied = match dashboard.refresh_comparison().await {
                Ok(applied) => applied,
                Err(e) => {
                    spinner.finish_and_clear();
                    return Err(e.into());
                }
            };
            (ViewReport::Comparison(dashboard.snapshot().comparison), applied)
        }
        Command::Metrics => (ViewReport::Metrics(MetricEntry::catalogue()), Applied::Updated),
        Command::Session => {
            spinner.finish_and_clear();
            session::preload_counties(&dashboard).await;
            session::run_session(dashboard).await?;
            return Ok(0);
        }
    };
    spinner.finish_and_clear();

    let report = Report {
        metadata: ReportMetadata::now(&config.api.base_url),
        view,
    };
    let output = match config.report.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    match args.output {
        Some(ref path) => {
            report::write_report(&output, path)?;
            if !args.quiet {
                println!("✅ Report saved to: {}", path.display());
            }
        }
        None => print!("{}", output),
    }

    if applied == Applied::Failed {
        eprintln!("\n⛔ The backend could not be reached (exit code 2).");
        return Ok(2);
    }

    Ok(0)
}

/// Spinner shown while requests run; hidden in quiet mode.
fn spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
