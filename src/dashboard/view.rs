//! Typed view-models.
//!
//! Plain data handed to the renderers. Building them is where raw values get
//! scaled; absent values stay `None` so a renderer can draw a gap.

use crate::analysis::{
    build_aligned_series, build_breakdown, palette_color, select_year_for_breakdown,
    AlignedSeries, Breakdown,
};
use crate::api::YearRange;
use crate::metric::{scale_value, Metric};
use crate::models::{County, CountyDetail, CropRow, Interview, MetricRow, Overview, YearlyRow};
use crate::selection::SelectedCounty;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::panel::Panel;

/// Interview excerpts are cut to this many characters.
const EXCERPT_CHARS: usize = 300;

/// Preferred shape of a time-series chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Line,
    Bar,
}

/// One plotted series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesView {
    pub code: String,
    pub name: String,
    pub color: &'static str,
    /// Scaled values aligned to [`ChartView::years`].
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartView {
    pub title: String,
    pub metric: Metric,
    pub unit: &'static str,
    pub kind: ChartKind,
    pub years: Vec<i32>,
    pub series: Vec<SeriesView>,
}

impl ChartView {
    /// Scale an aligned table into a chart.
    pub fn from_aligned(aligned: &AlignedSeries, metric: Metric, kind: ChartKind) -> Self {
        let info = metric.info();
        let series = aligned
            .entities
            .iter()
            .enumerate()
            .map(|(i, entity)| SeriesView {
                code: entity.code.clone(),
                name: entity.name.clone(),
                color: palette_color(i),
                values: entity.values().map(|v| scale_value(v, metric)).collect(),
            })
            .collect();

        Self {
            title: info.label.to_string(),
            metric,
            unit: info.unit,
            kind,
            years: aligned.years.clone(),
            series,
        }
    }

    /// Chart one county's yearly rows for `metric`.
    pub fn for_county(
        code: &str,
        name: &str,
        rows: Vec<YearlyRow>,
        metric: Metric,
        kind: ChartKind,
    ) -> Self {
        let rows: Vec<MetricRow> = rows
            .into_iter()
            .map(|r| r.into_metric_row(code, name))
            .collect();
        Self::from_aligned(&build_aligned_series(&rows, metric), metric, kind)
    }
}

/// Result of a county comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonView {
    pub counties: Vec<SelectedCounty>,
    pub metric: Metric,
    pub range: YearRange,
    pub chart: ChartView,
    pub breakdown: Breakdown,
    /// Share of each breakdown slice in the year's total.
    pub shares: Vec<Option<f64>>,
}

/// What a comparison was asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRequest {
    pub counties: Vec<SelectedCounty>,
    pub metric: Metric,
    pub range: YearRange,
    pub chart: ChartKind,
    /// Breakdown year; the latest year with data when unset.
    pub year: Option<i32>,
    /// Breakdown year used when no rows came back at all.
    pub fallback_year: i32,
}

impl ComparisonView {
    pub fn build(request: ComparisonRequest, rows: &[MetricRow]) -> Self {
        let aligned = build_aligned_series(rows, request.metric);
        let year = request
            .year
            .unwrap_or_else(|| select_year_for_breakdown(&aligned.years, request.fallback_year));
        let breakdown = build_breakdown(rows, request.metric, year);
        let shares = breakdown.shares();

        Self {
            chart: ChartView::from_aligned(&aligned, request.metric, request.chart),
            counties: request.counties,
            metric: request.metric,
            range: request.range,
            breakdown,
            shares,
        }
    }
}

/// One line of the metric catalogue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricEntry {
    pub metric: Metric,
    pub label: &'static str,
    pub unit: &'static str,
    pub divisor: f64,
    /// Whether the metric can be compared across counties.
    pub comparable: bool,
}

impl MetricEntry {
    pub fn catalogue() -> Vec<MetricEntry> {
        Metric::ALL
            .into_iter()
            .map(|metric| {
                let info = metric.info();
                MetricEntry {
                    metric,
                    label: info.label,
                    unit: info.unit,
                    divisor: info.divisor,
                    comparable: metric.supports_trend(),
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatCard {
    pub label: &'static str,
    pub value: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewView {
    pub cards: Vec<StatCard>,
    pub by_region: Vec<(String, Option<u64>)>,
    pub by_exit_year: Vec<(i32, Option<u64>)>,
}

impl From<Overview> for OverviewView {
    fn from(o: Overview) -> Self {
        Self {
            cards: vec![
                StatCard {
                    label: "贫困县总数",
                    value: o.poverty_counties,
                },
                StatCard {
                    label: "已摘帽县数",
                    value: o.exited_counties,
                },
                StatCard {
                    label: "访谈记录",
                    value: o.interviews,
                },
                StatCard {
                    label: "调研员",
                    value: o.surveyors,
                },
            ],
            by_region: o
                .by_region
                .into_iter()
                .map(|r| (r.region.unwrap_or_else(|| "未知".to_string()), r.count))
                .collect(),
            by_exit_year: o
                .by_exit_year
                .into_iter()
                .filter_map(|e| e.exit_year.map(|y| (y, e.count)))
                .collect(),
        }
    }
}

/// A county in the list view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountyCard {
    pub code: String,
    pub name: String,
    pub province: String,
    pub city: String,
    pub exit_year: Option<i32>,
    pub region: Option<String>,
}

impl From<&County> for CountyCard {
    fn from(c: &County) -> Self {
        Self {
            code: c.code.clone(),
            name: c.display_name().to_string(),
            province: c.province.clone().unwrap_or_else(|| "未知".to_string()),
            city: c.city.clone().unwrap_or_else(|| "未知".to_string()),
            exit_year: c.exit_year,
            region: c.region.clone().filter(|r| !r.is_empty()),
        }
    }
}

/// Sown-area share of one crop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropShare {
    pub crop: String,
    pub area: Option<f64>,
    pub share: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropShareView {
    pub year: i32,
    pub crops: Vec<CropShare>,
}

impl CropShareView {
    pub fn from_rows(year: i32, rows: &[CropRow]) -> Self {
        let total: f64 = rows.iter().filter_map(|r| r.sown_area).sum();
        let crops = rows
            .iter()
            .map(|r| CropShare {
                crop: r.crop_type.clone().unwrap_or_else(|| "未知".to_string()),
                area: r.sown_area,
                share: r.sown_area.filter(|_| total > 0.0).map(|a| a / total),
            })
            .collect();
        Self { year, crops }
    }
}

/// Everything shown for one county. Each part loads independently.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountyDetailView {
    pub code: String,
    pub county: Panel<CountyCard>,
    pub terrain_relief: Option<f64>,
    pub economy: Panel<ChartView>,
    pub agriculture: Panel<ChartView>,
    pub crops: Panel<CropShareView>,
}

impl CountyDetailView {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            county: Panel::Empty,
            terrain_relief: None,
            economy: Panel::Empty,
            agriculture: Panel::Empty,
            crops: Panel::Empty,
        }
    }

    /// Title: the county name once loaded, the code before that.
    pub fn title(&self) -> &str {
        self.county
            .ready()
            .map(|c| c.name.as_str())
            .unwrap_or(&self.code)
    }
}

impl From<&CountyDetail> for CountyCard {
    fn from(d: &CountyDetail) -> Self {
        CountyCard::from(&d.county)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterviewCard {
    pub interviewee: String,
    pub county_name: String,
    pub date: Option<String>,
    pub surveyor_name: Option<String>,
    pub quality: Option<f64>,
    pub interviewee_info: Option<String>,
    pub excerpt: String,
}

impl From<&Interview> for InterviewCard {
    fn from(i: &Interview) -> Self {
        Self {
            interviewee: i
                .interviewee_name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "未知".to_string()),
            county_name: i.county_name.clone().unwrap_or_default(),
            date: i.date.as_deref().and_then(format_date),
            surveyor_name: i.surveyor_name.clone().filter(|n| !n.is_empty()),
            quality: i.quality.filter(|q| *q != 0.0),
            interviewee_info: i.interviewee_info.clone().filter(|n| !n.is_empty()),
            excerpt: excerpt(i.content.as_deref().unwrap_or(""), EXCERPT_CHARS),
        }
    }
}

/// Parse an ISO-ish or HTTP date and render it as `YYYY/M/D`.
pub fn format_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.date_naive()))
        .or_else(|| DateTime::parse_from_rfc2822(raw).ok().map(|d| d.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|d| d.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|d| d.date())
        })?;

    Some(date.format("%Y/%-m/%-d").to_string())
}

/// First `max_chars` characters, with an ellipsis when cut.
fn excerpt(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricRow;
    use std::collections::BTreeMap;

    fn row(code: &str, year: i32, gdp: Option<f64>) -> MetricRow {
        let mut values = BTreeMap::new();
        if let Some(v) = gdp {
            values.insert(Metric::Gdp, v);
        }
        MetricRow {
            entity_code: code.to_string(),
            entity_name: format!("County {}", code),
            year,
            values,
        }
    }

    #[test]
    fn test_chart_scales_and_keeps_gaps() {
        let rows = vec![
            row("A", 2010, Some(10_000.0)),
            row("A", 2011, None),
            row("B", 2011, Some(50_000.0)),
        ];
        let aligned = build_aligned_series(&rows, Metric::Gdp);
        let chart = ChartView::from_aligned(&aligned, Metric::Gdp, ChartKind::Bar);

        assert_eq!(chart.unit, "万元");
        assert_eq!(chart.kind, ChartKind::Bar);
        assert_eq!(chart.years, vec![2010, 2011]);
        assert_eq!(chart.series[0].values, vec![Some(1.0), None]);
        assert_eq!(chart.series[1].values, vec![None, Some(5.0)]);
        assert_ne!(chart.series[0].color, chart.series[1].color);
    }

    #[test]
    fn test_comparison_uses_latest_year() {
        let rows = vec![
            row("A", 2010, Some(10_000.0)),
            row("A", 2012, Some(30_000.0)),
            row("B", 2012, Some(10_000.0)),
        ];
        let request = ComparisonRequest {
            counties: vec![],
            metric: Metric::Gdp,
            range: YearRange::new(2010, 2020),
            chart: ChartKind::Line,
            year: None,
            fallback_year: 2020,
        };

        let view = ComparisonView::build(request.clone(), &rows);
        assert_eq!(view.breakdown.year(), 2012);
        assert_eq!(view.shares, vec![Some(0.75), Some(0.25)]);

        let pinned = ComparisonView::build(
            ComparisonRequest {
                year: Some(2011),
                ..request
            },
            &rows,
        );
        assert_eq!(pinned.breakdown, Breakdown::Empty { year: 2011 });
        assert!(pinned.shares.is_empty());
    }

    #[test]
    fn test_comparison_without_rows_falls_back() {
        let request = ComparisonRequest {
            counties: vec![],
            metric: Metric::Gdp,
            range: YearRange::new(2010, 2020),
            chart: ChartKind::Bar,
            year: None,
            fallback_year: 2020,
        };
        let view = ComparisonView::build(request, &[]);
        assert_eq!(view.breakdown, Breakdown::Empty { year: 2020 });
        assert!(view.chart.series.is_empty());
    }

    #[test]
    fn test_metric_catalogue() {
        let catalogue = MetricEntry::catalogue();
        assert_eq!(catalogue.len(), Metric::ALL.len());
        assert_eq!(catalogue.iter().filter(|e| e.comparable).count(), 4);
        let grain = catalogue
            .iter()
            .find(|e| e.metric == Metric::GrainOutput)
            .unwrap();
        assert_eq!(grain.unit, "千吨");
        assert!(!grain.comparable);
    }

    #[test]
    fn test_format_date_variants() {
        assert_eq!(format_date("2019-03-05").as_deref(), Some("2019/3/5"));
        assert_eq!(
            format_date("Tue, 05 Mar 2019 00:00:00 GMT").as_deref(),
            Some("2019/3/5")
        );
        assert_eq!(
            format_date("2019-03-05T08:00:00+08:00").as_deref(),
            Some("2019/3/5")
        );
        assert_eq!(format_date("2019-12-25 10:30:00").as_deref(), Some("2019/12/25"));
        assert_eq!(format_date("sometime"), None);
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("短文本", 300), "短文本");
        let long: String = "扶".repeat(301);
        let cut = excerpt(&long, 300);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), 303);
    }

    #[test]
    fn test_crop_shares() {
        let rows = vec![
            CropRow {
                year: 2018,
                crop_type: Some("玉米".to_string()),
                sown_area: Some(300.0),
            },
            CropRow {
                year: 2018,
                crop_type: Some("水稻".to_string()),
                sown_area: Some(100.0),
            },
            CropRow {
                year: 2018,
                crop_type: None,
                sown_area: None,
            },
        ];
        let view = CropShareView::from_rows(2018, &rows);
        assert_eq!(view.crops[0].share, Some(0.75));
        assert_eq!(view.crops[1].share, Some(0.25));
        assert_eq!(view.crops[2].crop, "未知");
        assert_eq!(view.crops[2].share, None);
    }

    #[test]
    fn test_county_card_defaults() {
        let county = County {
            code: "520322".to_string(),
            name: None,
            province: None,
            city: Some("遵义市".to_string()),
            region: Some(String::new()),
            exit_year: Some(2019),
            longitude: None,
            latitude: None,
            completeness_score: None,
        };
        let card = CountyCard::from(&county);
        assert_eq!(card.name, "520322");
        assert_eq!(card.province, "未知");
        assert_eq!(card.region, None);
    }
}
