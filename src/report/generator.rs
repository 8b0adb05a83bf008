//! Markdown and JSON report generation.
//!
//! A [`Report`] wraps one rendered view with metadata. Markdown output is
//! built section by section; JSON output serializes the view-model as is.
//! Missing values render as a dash, never as zero.

use crate::analysis::Breakdown;
use crate::dashboard::{
    ChartView, ComparisonView, CountyCard, CountyDetailView, CropShareView, InterviewCard,
    MetricEntry, OverviewView, Panel,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Placeholder for an absent value.
const MISSING: &str = "—";

/// Report metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub api_url: String,
    pub generated_at: DateTime<Utc>,
}

impl ReportMetadata {
    pub fn now(api_url: &str) -> Self {
        Self {
            api_url: api_url.to_string(),
            generated_at: Utc::now(),
        }
    }
}

/// The view being reported.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "view", content = "data", rename_all = "snake_case")]
pub enum ViewReport {
    Overview(Panel<OverviewView>),
    Provinces(Panel<Vec<String>>),
    Counties(Panel<Vec<CountyCard>>),
    CountyDetail(CountyDetailView),
    Interviews(Panel<Vec<InterviewCard>>),
    Comparison(Panel<ComparisonView>),
    Metrics(Vec<MetricEntry>),
}

impl ViewReport {
    fn title(&self) -> String {
        match self {
            ViewReport::Overview(_) => "Overview".to_string(),
            ViewReport::Provinces(_) => "Provinces".to_string(),
            ViewReport::Counties(_) => "Counties".to_string(),
            ViewReport::CountyDetail(detail) => format!("County {}", detail.title()),
            ViewReport::Interviews(_) => "Interviews".to_string(),
            ViewReport::Comparison(_) => "County Comparison".to_string(),
            ViewReport::Metrics(_) => "Metrics".to_string(),
        }
    }
}

/// A rendered view with its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    #[serde(flatten)]
    pub view: ViewReport,
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", report.view.title()));
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_view_markdown(&report.view));
    output.push_str(&generate_footer());

    output
}

/// Render just the view, without title or metadata.
pub fn generate_view_markdown(view: &ViewReport) -> String {
    match view {
        ViewReport::Overview(panel) => panel_section(panel, generate_overview_section),
        ViewReport::Provinces(panel) => panel_section(panel, |p| generate_provinces_section(p)),
        ViewReport::Counties(panel) => panel_section(panel, |c| generate_counties_section(c)),
        ViewReport::CountyDetail(detail) => generate_detail_section(detail),
        ViewReport::Interviews(panel) => {
            panel_section(panel, |i| generate_interviews_section(i))
        }
        ViewReport::Comparison(panel) => panel_section(panel, generate_comparison_section),
        ViewReport::Metrics(entries) => generate_metrics_section(entries),
    }
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str(&format!("- **API:** {}\n", metadata.api_url));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push('\n');

    section
}

/// Render a panel's content, or a note when it has none.
fn panel_section<T>(panel: &Panel<T>, render: impl FnOnce(&T) -> String) -> String {
    match panel {
        Panel::Ready(content) => render(content),
        Panel::Empty => "_No data loaded._\n\n".to_string(),
        Panel::Failed(message) => format!("> ⚠️ {}\n\n", message),
    }
}

fn generate_overview_section(overview: &OverviewView) -> String {
    let mut section = String::new();

    section.push_str("| Indicator | Count |\n|---|---:|\n");
    for card in &overview.cards {
        section.push_str(&format!("| {} | {} |\n", card.label, count_cell(card.value)));
    }
    section.push('\n');

    if !overview.by_region.is_empty() {
        section.push_str("## By Region\n\n| Region | Counties |\n|---|---:|\n");
        for (region, count) in &overview.by_region {
            section.push_str(&format!("| {} | {} |\n", region, count_cell(*count)));
        }
        section.push('\n');
    }

    if !overview.by_exit_year.is_empty() {
        section.push_str("## By Exit Year\n\n| Year | Counties |\n|---|---:|\n");
        for (year, count) in &overview.by_exit_year {
            section.push_str(&format!("| {} | {} |\n", year, count_cell(*count)));
        }
        section.push('\n');
    }

    section
}

fn count_cell(count: Option<u64>) -> String {
    count.map_or_else(|| MISSING.to_string(), |c| c.to_string())
}

fn generate_provinces_section(provinces: &[String]) -> String {
    let mut section = String::new();
    for province in provinces {
        section.push_str(&format!("- {}\n", province));
    }
    section.push('\n');
    section
}

fn generate_counties_section(counties: &[CountyCard]) -> String {
    if counties.is_empty() {
        return "_No matching counties._\n\n".to_string();
    }

    let mut section = String::new();
    section.push_str("| Code | Name | Province | City | Exit Year | Region |\n");
    section.push_str("|---|---|---|---|---|---|\n");
    for county in counties {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            county.code,
            county.name,
            county.province,
            county.city,
            county
                .exit_year
                .map(|y| y.to_string())
                .unwrap_or_else(|| MISSING.to_string()),
            county.region.as_deref().unwrap_or(MISSING),
        ));
    }
    section.push('\n');
    section
}

fn generate_detail_section(detail: &CountyDetailView) -> String {
    let mut section = String::new();

    section.push_str(&panel_section(&detail.county, |card| {
        let mut info = String::new();
        info.push_str(&format!("- **Code:** {}\n", card.code));
        info.push_str(&format!("- **Location:** {} {}\n", card.province, card.city));
        if let Some(year) = card.exit_year {
            info.push_str(&format!("- **Exit Year:** {}\n", year));
        }
        if let Some(ref region) = card.region {
            info.push_str(&format!("- **Region:** {}\n", region));
        }
        if let Some(relief) = detail.terrain_relief {
            info.push_str(&format!("- **Terrain Relief:** {:.2}\n", relief));
        }
        info.push('\n');
        info
    }));

    section.push_str("## Economy\n\n");
    section.push_str(&panel_section(&detail.economy, generate_chart_table));

    section.push_str("## Agriculture\n\n");
    section.push_str(&panel_section(&detail.agriculture, generate_chart_table));

    section.push_str("## Crops\n\n");
    section.push_str(&panel_section(&detail.crops, generate_crops_table));

    section
}

/// A chart as a year-by-series table.
fn generate_chart_table(chart: &ChartView) -> String {
    if chart.series.is_empty() {
        return "_No series._\n\n".to_string();
    }

    let mut table = String::new();
    table.push_str(&format!(
        "**{}** ({}, {} chart)\n\n",
        chart.title,
        chart.unit,
        chart_kind_name(chart)
    ));

    table.push_str("| Year |");
    for series in &chart.series {
        table.push_str(&format!(" {} |", series.name));
    }
    table.push_str("\n|---|");
    table.push_str(&"---:|".repeat(chart.series.len()));
    table.push('\n');

    for (i, year) in chart.years.iter().enumerate() {
        table.push_str(&format!("| {} |", year));
        for series in &chart.series {
            let value = series.values.get(i).copied().flatten();
            table.push_str(&format!(" {} |", format_value(value)));
        }
        table.push('\n');
    }
    table.push('\n');
    table
}

fn chart_kind_name(chart: &ChartView) -> &'static str {
    match chart.kind {
        crate::dashboard::ChartKind::Line => "line",
        crate::dashboard::ChartKind::Bar => "bar",
    }
}

fn generate_crops_table(crops: &CropShareView) -> String {
    let mut table = String::new();
    table.push_str(&format!("Sown area by crop, {}\n\n", crops.year));
    table.push_str("| Crop | Sown Area | Share |\n|---|---:|---:|\n");
    for crop in &crops.crops {
        table.push_str(&format!(
            "| {} | {} | {} |\n",
            crop.crop,
            format_value(crop.area),
            format_share(crop.share)
        ));
    }
    table.push('\n');
    table
}

fn generate_interviews_section(interviews: &[InterviewCard]) -> String {
    let mut section = String::new();

    for interview in interviews {
        section.push_str(&format!(
            "### {} · {}\n\n",
            interview.interviewee, interview.county_name
        ));
        if let Some(ref date) = interview.date {
            section.push_str(&format!("- **Date:** {}\n", date));
        }
        if let Some(ref surveyor) = interview.surveyor_name {
            section.push_str(&format!("- **Surveyor:** {}\n", surveyor));
        }
        if let Some(quality) = interview.quality {
            section.push_str(&format!("- **Quality:** {}\n", quality));
        }
        if let Some(ref info) = interview.interviewee_info {
            section.push_str(&format!("- **About:** {}\n", info));
        }
        section.push('\n');
        if !interview.excerpt.is_empty() {
            section.push_str(&format!("> {}\n\n", interview.excerpt.replace('\n', "\n> ")));
        }
    }

    section
}

fn generate_comparison_section(comparison: &ComparisonView) -> String {
    let mut section = String::new();

    let names: Vec<String> = comparison
        .counties
        .iter()
        .map(|c| format!("{} ({})", c.name, c.code))
        .collect();
    section.push_str(&format!("- **Counties:** {}\n", names.join(", ")));
    section.push_str(&format!(
        "- **Years:** {}–{}\n\n",
        comparison.range.start, comparison.range.end
    ));

    section.push_str("## Trend\n\n");
    section.push_str(&generate_chart_table(&comparison.chart));

    section.push_str(&format!("## Breakdown {}\n\n", comparison.breakdown.year()));
    match &comparison.breakdown {
        Breakdown::Empty { year } => {
            section.push_str(&format!("_No data for {}._\n\n", year));
        }
        Breakdown::Slices { slices, .. } => {
            section.push_str(&format!(
                "| County | {} ({}) | Share |\n|---|---:|---:|\n",
                comparison.chart.title, comparison.chart.unit
            ));
            for (slice, share) in slices.iter().zip(&comparison.shares) {
                section.push_str(&format!(
                    "| {} | {} | {} |\n",
                    slice.name,
                    format_value(slice.value),
                    format_share(*share)
                ));
            }
            section.push('\n');
        }
    }

    section
}

fn generate_metrics_section(entries: &[MetricEntry]) -> String {
    let mut section = String::new();
    section.push_str("| Metric | Label | Unit | Divisor | Comparable |\n");
    section.push_str("|---|---|---|---:|---|\n");
    for entry in entries {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            entry.metric,
            entry.label,
            entry.unit,
            entry.divisor,
            if entry.comparable { "yes" } else { "" }
        ));
    }
    section.push('\n');
    section
}

fn generate_footer() -> String {
    "---\n\n*Generated by countydash*\n".to_string()
}

fn format_value(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| MISSING.to_string())
}

fn format_share(share: Option<f64>) -> String {
    share
        .map(|s| format!("{:.1}%", s * 100.0))
        .unwrap_or_else(|| MISSING.to_string())
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered output to `path`.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::BreakdownSlice;
    use crate::api::YearRange;
    use crate::dashboard::panel::LOAD_FAILED_MESSAGE;
    use crate::dashboard::{ChartKind, SeriesView};
    use crate::models::Overview;
    use crate::metric::Metric;
    use crate::selection::SelectedCounty;

    fn create_test_comparison(breakdown: Breakdown) -> ComparisonView {
        let shares = breakdown.shares();
        ComparisonView {
            counties: vec![
                SelectedCounty {
                    code: "A".to_string(),
                    name: "Alpha".to_string(),
                },
                SelectedCounty {
                    code: "B".to_string(),
                    name: "Beta".to_string(),
                },
            ],
            metric: Metric::Gdp,
            range: YearRange::new(2010, 2011),
            chart: ChartView {
                title: "GDP".to_string(),
                metric: Metric::Gdp,
                unit: "万元",
                kind: ChartKind::Line,
                years: vec![2010, 2011],
                series: vec![
                    SeriesView {
                        code: "A".to_string(),
                        name: "Alpha".to_string(),
                        color: "#6366f1",
                        values: vec![Some(10.0), Some(11.0)],
                    },
                    SeriesView {
                        code: "B".to_string(),
                        name: "Beta".to_string(),
                        color: "#a855f7",
                        values: vec![None, Some(9.0)],
                    },
                ],
            },
            breakdown,
            shares,
        }
    }

    fn report(view: ViewReport) -> Report {
        Report {
            metadata: ReportMetadata::now("http://localhost:5001/api"),
            view,
        }
    }

    #[test]
    fn test_comparison_markdown() {
        let comparison = create_test_comparison(Breakdown::Slices {
            year: 2011,
            slices: vec![
                BreakdownSlice {
                    name: "Alpha".to_string(),
                    value: Some(11.0),
                    color: "#6366f1",
                },
                BreakdownSlice {
                    name: "Beta".to_string(),
                    value: Some(9.0),
                    color: "#a855f7",
                },
            ],
        });
        let markdown =
            generate_markdown_report(&report(ViewReport::Comparison(Panel::Ready(comparison))));

        assert!(markdown.contains("# County Comparison"));
        assert!(markdown.contains("Alpha (A), Beta (B)"));
        assert!(markdown.contains("| 2010 | 10.00 | — |"));
        assert!(markdown.contains("## Breakdown 2011"));
        assert!(markdown.contains("| Alpha | 11.00 | 55.0% |"));
    }

    #[test]
    fn test_empty_breakdown_markdown() {
        let comparison = create_test_comparison(Breakdown::Empty { year: 2020 });
        let markdown = generate_view_markdown(&ViewReport::Comparison(Panel::Ready(comparison)));
        assert!(markdown.contains("_No data for 2020._"));
    }

    #[test]
    fn test_failed_panel_markdown() {
        let markdown = generate_view_markdown(&ViewReport::Overview(Panel::Failed(
            LOAD_FAILED_MESSAGE.to_string(),
        )));
        assert!(markdown.contains(LOAD_FAILED_MESSAGE));
    }

    #[test]
    fn test_partial_overview_markdown() {
        let overview: Overview = serde_json::from_value(serde_json::json!({
            "poverty_counties": 832,
            "interviews": null,
            "by_region": [{"Region": "西南", "count": null}]
        }))
        .unwrap();
        let markdown =
            generate_view_markdown(&ViewReport::Overview(Panel::Ready(OverviewView::from(overview))));

        assert!(markdown.contains("| 贫困县总数 | 832 |"));
        assert!(markdown.contains("| 已摘帽县数 | — |"));
        assert!(markdown.contains("| 访谈记录 | — |"));
        assert!(markdown.contains("| 调研员 | — |"));
        assert!(markdown.contains("| 西南 | — |"));
        assert!(!markdown.contains("| 0 |"));
    }

    #[test]
    fn test_counties_markdown() {
        let cards = vec![CountyCard {
            code: "520322".to_string(),
            name: "桐梓县".to_string(),
            province: "贵州省".to_string(),
            city: "遵义市".to_string(),
            exit_year: None,
            region: None,
        }];
        let markdown = generate_view_markdown(&ViewReport::Counties(Panel::Ready(cards)));
        assert!(markdown.contains("| 520322 | 桐梓县 | 贵州省 | 遵义市 | — | — |"));
    }

    #[test]
    fn test_metrics_markdown() {
        let markdown = generate_view_markdown(&ViewReport::Metrics(MetricEntry::catalogue()));
        assert!(markdown.contains("| GrainOutput | Grain output | 千吨 | 1000 |"));
        assert!(markdown.contains("| GDP | GDP | 万元 | 10000 | yes |"));
    }

    #[test]
    fn test_generate_json_report() {
        let comparison = create_test_comparison(Breakdown::Empty { year: 2020 });
        let json =
            generate_json_report(&report(ViewReport::Comparison(Panel::Ready(comparison))))
                .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["view"], "comparison");
        assert_eq!(value["data"]["state"], "ready");
        assert_eq!(value["data"]["content"]["metric"], "GDP");
        assert_eq!(value["data"]["content"]["breakdown"]["kind"], "empty");
        assert!(value["data"]["content"]["chart"]["series"][1]["values"][0].is_null());
        assert_eq!(value["metadata"]["api_url"], "http://localhost:5001/api");
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.md");
        write_report("# hi\n", &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# hi\n");
    }
}
