//! Comparison aggregation.
//!
//! Reshapes per-county metric rows into series aligned on one shared year
//! axis, and derives a single-year breakdown across counties. Everything here
//! is a pure function of its inputs.

use crate::metric::{scale_value, Metric};
use crate::models::MetricRow;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Series colors, assigned by position and cycled.
pub const PALETTE: [&str; 5] = ["#6366f1", "#a855f7", "#ec4899", "#34d399", "#f59e0b"];

/// Color for the entity at `index`.
pub fn palette_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

/// One county's values on the shared year axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySeries {
    pub code: String,
    pub name: String,
    /// `(year, value)` pairs in axis order; `None` means no data.
    pub points: Vec<(i32, Option<f64>)>,
}

impl EntitySeries {
    pub fn values(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.points.iter().map(|(_, v)| *v)
    }
}

/// Per-county series sharing one sorted year axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlignedSeries {
    pub years: Vec<i32>,
    /// Entities in first-seen order.
    pub entities: Vec<EntitySeries>,
}

/// Group rows by county and align every county on the union of years.
///
/// Years are sorted numerically. When several rows match one (county, year),
/// the first one wins. Missing values stay `None`.
pub fn build_aligned_series(rows: &[MetricRow], metric: Metric) -> AlignedSeries {
    let years: Vec<i32> = rows
        .iter()
        .map(|r| r.year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut order: Vec<(&str, &str)> = Vec::new();
    let mut by_code: HashMap<&str, Vec<&MetricRow>> = HashMap::new();

    for row in rows {
        let entry = by_code.entry(row.entity_code.as_str()).or_insert_with(|| {
            order.push((row.entity_code.as_str(), row.entity_name.as_str()));
            Vec::new()
        });
        entry.push(row);
    }

    let entities = order
        .into_iter()
        .map(|(code, name)| {
            let entity_rows = &by_code[code];
            let points = years
                .iter()
                .map(|&year| {
                    let value = entity_rows
                        .iter()
                        .find(|r| r.year == year)
                        .and_then(|r| r.value(metric));
                    (year, value)
                })
                .collect();

            EntitySeries {
                code: code.to_string(),
                name: name.to_string(),
                points,
            }
        })
        .collect();

    AlignedSeries { years, entities }
}

/// One county's share in a single-year breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownSlice {
    pub name: String,
    /// Scaled value; `None` when the row exists but carries no data.
    pub value: Option<f64>,
    pub color: &'static str,
}

/// Single-year cross-county view of one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Breakdown {
    /// No county has a row for the requested year.
    Empty { year: i32 },
    Slices { year: i32, slices: Vec<BreakdownSlice> },
}

impl Breakdown {
    pub fn year(&self) -> i32 {
        match self {
            Breakdown::Empty { year } | Breakdown::Slices { year, .. } => *year,
        }
    }

    /// Share of each slice in the total of present values.
    ///
    /// Returns `None` per slice when its value is absent, and for every slice
    /// when the total is not positive.
    pub fn shares(&self) -> Vec<Option<f64>> {
        match self {
            Breakdown::Empty { .. } => Vec::new(),
            Breakdown::Slices { slices, .. } => {
                let total: f64 = slices.iter().filter_map(|s| s.value).sum();
                slices
                    .iter()
                    .map(|s| match s.value {
                        Some(v) if total > 0.0 => Some(v / total),
                        _ => None,
                    })
                    .collect()
            }
        }
    }
}

/// Build the breakdown of `metric` for exactly `year`, in input order.
pub fn build_breakdown(rows: &[MetricRow], metric: Metric, year: i32) -> Breakdown {
    let slices: Vec<BreakdownSlice> = rows
        .iter()
        .filter(|r| r.year == year)
        .enumerate()
        .map(|(i, r)| BreakdownSlice {
            name: r.entity_name.clone(),
            value: scale_value(r.value(metric), metric),
            color: palette_color(i),
        })
        .collect();

    if slices.is_empty() {
        Breakdown::Empty { year }
    } else {
        Breakdown::Slices { year, slices }
    }
}

/// Most recent year on the axis, or `fallback` when the axis is empty.
pub fn select_year_for_breakdown(years: &[i32], fallback: i32) -> i32 {
    years.iter().copied().max().unwrap_or(fallback)
}
