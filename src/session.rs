//! Interactive session.
//!
//! Reads one command per line from stdin and keeps the selection, metric and
//! year range between commands. Changing the metric or range refreshes the
//! comparison in a background task, so several refreshes may overlap; only
//! the latest one is applied.

use crate::api::{CountyFilters, YearRange};
use crate::cli::CountyArg;
use crate::dashboard::{Applied, ChartKind, CompareError, Dashboard, InterviewFilters};
use crate::metric::Metric;
use crate::report::{generate_view_markdown, ViewReport};
use anyhow::Result;
use clap::ValueEnum;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

const HELP: &str = "\
Commands:
  add CODE[:NAME]      toggle a county in the selection (max 5)
  remove CODE          remove a county from the selection
  clear                empty the selection
  selection            show the selected counties
  metric NAME          compare another metric
  years START END      set the year range
  chart line|bar       set the chart shape
  year YEAR|latest     pin the breakdown year
  cropyear YEAR        set the crop-structure year of the county view
  compare              fetch and show the comparison
  counties [KEYWORD]   list counties, optionally filtered
  county CODE          show one county
  interviews [KEYWORD] list interviews; a keyword overrides the filters
  filter county=CODE surveyor=ID keyword=WORD
                       set the interview filters (any subset)
  filter reset         clear the interview filters
  overview             show headline counts
  help                 show this help
  quit                 leave the session";

/// One parsed session command.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Toggle(CountyArg),
    Remove(String),
    Clear,
    Selection,
    Metric(Metric),
    Years(YearRange),
    Chart(ChartKind),
    BreakdownYear(Option<i32>),
    CropYear(i32),
    Compare,
    Counties(Option<String>),
    County(String),
    Interviews(Option<String>),
    Filter(InterviewFilters),
    ResetFilter,
    Overview,
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<SessionCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();
    let joined = (!rest.is_empty()).then(|| rest.join(" "));

    let command = match head.to_lowercase().as_str() {
        "add" | "toggle" => SessionCommand::Toggle(single(&rest, "add CODE[:NAME]")?.parse()?),
        "remove" | "rm" => SessionCommand::Remove(single(&rest, "remove CODE")?.to_string()),
        "clear" => SessionCommand::Clear,
        "selection" | "sel" => SessionCommand::Selection,
        "metric" => SessionCommand::Metric(
            single(&rest, "metric NAME")?
                .parse()
                .map_err(|e: crate::metric::MetricParseError| e.to_string())?,
        ),
        "years" => match rest.as_slice() {
            [start, end] => {
                let start: i32 = start.parse().map_err(|_| format!("bad year '{}'", start))?;
                let end: i32 = end.parse().map_err(|_| format!("bad year '{}'", end))?;
                if start > end {
                    return Err(format!("start year {} is after end year {}", start, end));
                }
                SessionCommand::Years(YearRange::new(start, end))
            }
            _ => return Err("usage: years START END".to_string()),
        },
        "chart" => SessionCommand::Chart(ChartKind::from_str(single(&rest, "chart line|bar")?, true)?),
        "year" => match single(&rest, "year YEAR|latest")? {
            "latest" => SessionCommand::BreakdownYear(None),
            year => SessionCommand::BreakdownYear(Some(
                year.parse().map_err(|_| format!("bad year '{}'", year))?,
            )),
        },
        "cropyear" => {
            let year = single(&rest, "cropyear YEAR")?;
            SessionCommand::CropYear(year.parse().map_err(|_| format!("bad year '{}'", year))?)
        }
        "compare" | "show" => SessionCommand::Compare,
        "counties" => SessionCommand::Counties(joined),
        "county" => SessionCommand::County(single(&rest, "county CODE")?.to_string()),
        "interviews" => SessionCommand::Interviews(joined),
        "filter" => match rest.as_slice() {
            ["reset"] => SessionCommand::ResetFilter,
            [] => return Err("usage: filter county=CODE surveyor=ID keyword=WORD | filter reset".to_string()),
            pairs => SessionCommand::Filter(parse_filters(pairs)?),
        },
        "overview" => SessionCommand::Overview,
        "help" | "?" => SessionCommand::Help,
        "quit" | "exit" | "q" => SessionCommand::Quit,
        other => return Err(format!("unknown command '{}' (try 'help')", other)),
    };

    Ok(Some(command))
}

fn parse_filters(pairs: &[&str]) -> Result<InterviewFilters, String> {
    let mut filters = InterviewFilters::default();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", pair))?;
        let value = Some(value.to_string()).filter(|v| !v.is_empty());
        match key {
            "county" => filters.county_code = value,
            "surveyor" => filters.surveyor_id = value,
            "keyword" => filters.keyword = value,
            other => return Err(format!("unknown filter '{}'", other)),
        }
    }
    Ok(filters)
}

fn single<'a>(rest: &[&'a str], usage: &str) -> Result<&'a str, String> {
    match rest {
        [one] => Ok(one),
        _ => Err(format!("usage: {}", usage)),
    }
}

/// Run the session until `quit` or end of input.
pub async fn run_session(dashboard: Arc<Dashboard>) -> Result<()> {
    println!("📊 countydash session. Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("⚠️  {}", e);
                continue;
            }
        };
        debug!("Session command: {:?}", command);

        if command == SessionCommand::Quit {
            break;
        }
        execute(&dashboard, command).await;
    }

    Ok(())
}

async fn execute(dashboard: &Arc<Dashboard>, command: SessionCommand) {
    match command {
        SessionCommand::Toggle(county) => {
            match dashboard.toggle_county(&county.code, county.name.as_deref()) {
                Ok(toggled) => println!("   {:?} {}", toggled, county.code),
                Err(e) => println!("⚠️  {}", e),
            }
            print_selection(dashboard);
        }
        SessionCommand::Remove(code) => {
            if !dashboard.remove_county(&code) {
                println!("   {} was not selected", code);
            }
            print_selection(dashboard);
        }
        SessionCommand::Clear => {
            dashboard.clear_selection();
            print_selection(dashboard);
        }
        SessionCommand::Selection => print_selection(dashboard),
        SessionCommand::Metric(metric) => {
            dashboard.set_metric(metric);
            spawn_refresh(dashboard);
        }
        SessionCommand::Years(range) => {
            dashboard.set_range(range);
            spawn_refresh(dashboard);
        }
        SessionCommand::Chart(chart) => {
            dashboard.set_chart(chart);
            spawn_refresh(dashboard);
        }
        SessionCommand::BreakdownYear(year) => {
            dashboard.set_breakdown_year(year);
            spawn_refresh(dashboard);
        }
        SessionCommand::CropYear(year) => {
            dashboard.set_crop_year(year);
            println!("   Crop year set to {}", year);
        }
        SessionCommand::Compare => match dashboard.refresh_comparison().await {
            Ok(_) => print_comparison(dashboard),
            Err(e) => println!("⚠️  {}", e),
        },
        SessionCommand::Counties(keyword) => {
            let filters = dashboard.with_state(|s| s.county_filters.clone());
            dashboard.load_counties(filters, keyword).await;
            let panel = dashboard.with_state(|s| s.counties.clone());
            print!("{}", generate_view_markdown(&ViewReport::Counties(panel)));
        }
        SessionCommand::County(code) => {
            dashboard.show_county_detail(&code).await;
            if let Some(detail) = dashboard.with_state(|s| s.detail.clone()) {
                print!("{}", generate_view_markdown(&ViewReport::CountyDetail(detail)));
            }
        }
        SessionCommand::Interviews(keyword) => show_interviews(dashboard, keyword.as_deref()).await,
        SessionCommand::Filter(filters) => {
            dashboard.set_interview_filters(filters);
            show_interviews(dashboard, None).await;
        }
        SessionCommand::ResetFilter => {
            dashboard.reset_interview_filters();
            show_interviews(dashboard, None).await;
        }
        SessionCommand::Overview => {
            dashboard.load_overview().await;
            let panel = dashboard.with_state(|s| s.overview.clone());
            print!("{}", generate_view_markdown(&ViewReport::Overview(panel)));
        }
        SessionCommand::Help => println!("{}", HELP),
        SessionCommand::Quit => {}
    }
}

/// Refresh the comparison in the background if the selection allows it.
fn spawn_refresh(dashboard: &Arc<Dashboard>) {
    let dashboard = Arc::clone(dashboard);
    tokio::spawn(async move {
        match dashboard.refresh_comparison().await {
            Ok(Applied::Updated) | Ok(Applied::Failed) => print_comparison(&dashboard),
            Ok(_) => {}
            Err(CompareError::Selection(e)) => debug!("Not refreshing comparison: {}", e),
            Err(e) => warn!("{}", e),
        }
    });
}

async fn show_interviews(dashboard: &Dashboard, quick: Option<&str>) {
    dashboard.load_interviews(quick).await;
    let panel = dashboard.with_state(|s| s.interviews.clone());
    print!("{}", generate_view_markdown(&ViewReport::Interviews(panel)));
}

fn print_selection(dashboard: &Dashboard) {
    let line = dashboard.with_state(|s| {
        if s.selection.is_empty() {
            return None;
        }
        let names: Vec<String> = s
            .selection
            .iter()
            .map(|c| format!("{} ({})", c.name, c.code))
            .collect();
        Some(format!("   Selected [{}]: {}", s.selection.len(), names.join(", ")))
    });
    println!("{}", line.as_deref().unwrap_or("   Selection is empty"));
}

fn print_comparison(dashboard: &Dashboard) {
    let panel = dashboard.with_state(|s| s.comparison.clone());
    print!("{}", generate_view_markdown(&ViewReport::Comparison(panel)));
}

/// Load the county list once so `add CODE` can pick up names.
pub async fn preload_counties(dashboard: &Dashboard) {
    if dashboard.load_counties(CountyFilters::default(), None).await == Applied::Failed {
        warn!("County list unavailable; names default to codes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> SessionCommand {
        parse_line(line).unwrap().unwrap()
    }

    #[test]
    fn test_parse_selection_commands() {
        assert_eq!(
            parse("add 520322:桐梓县"),
            SessionCommand::Toggle(CountyArg {
                code: "520322".to_string(),
                name: Some("桐梓县".to_string()),
            })
        );
        assert_eq!(parse("rm 520322"), SessionCommand::Remove("520322".to_string()));
        assert_eq!(parse("  CLEAR "), SessionCommand::Clear);
        assert_eq!(parse_line("   ").unwrap(), None);
    }

    #[test]
    fn test_parse_parameters() {
        assert_eq!(parse("metric gdp"), SessionCommand::Metric(Metric::Gdp));
        assert_eq!(
            parse("years 2012 2018"),
            SessionCommand::Years(YearRange::new(2012, 2018))
        );
        assert_eq!(parse("chart BAR"), SessionCommand::Chart(ChartKind::Bar));
        assert_eq!(parse("year latest"), SessionCommand::BreakdownYear(None));
        assert_eq!(parse("year 2016"), SessionCommand::BreakdownYear(Some(2016)));
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(
            parse("interviews 产业 扶贫"),
            SessionCommand::Interviews(Some("产业 扶贫".to_string()))
        );
        assert_eq!(parse("counties"), SessionCommand::Counties(None));
    }

    #[test]
    fn test_parse_interview_filters() {
        assert_eq!(
            parse("filter county=520322 keyword=养殖"),
            SessionCommand::Filter(InterviewFilters {
                county_code: Some("520322".to_string()),
                surveyor_id: None,
                keyword: Some("养殖".to_string()),
            })
        );
        assert_eq!(
            parse("filter surveyor="),
            SessionCommand::Filter(InterviewFilters::default())
        );
        assert_eq!(parse("filter reset"), SessionCommand::ResetFilter);
        assert_eq!(parse("cropyear 2019"), SessionCommand::CropYear(2019));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_line("metric Happiness").is_err());
        assert!(parse_line("years 2020 2010").is_err());
        assert!(parse_line("years 2020").is_err());
        assert!(parse_line("add").is_err());
        assert!(parse_line("dance").is_err());
        assert!(parse_line("filter").is_err());
        assert!(parse_line("filter town=1").is_err());
        assert!(parse_line("filter county").is_err());
        assert!(parse_line("cropyear soon").is_err());
    }
}
