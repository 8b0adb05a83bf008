//! Data models for the statistics backend.
//!
//! Records mirror the backend's PascalCase column names. Every numeric field
//! is optional: a missing or `null` column means "no data", which is kept
//! distinct from zero all the way to the renderer.

use crate::metric::Metric;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Response envelope shared by every endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Aggregate counts for the landing cards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Overview {
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub poverty_counties: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub exited_counties: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub interviews: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub surveyors: Option<u64>,
    #[serde(default)]
    pub by_region: Vec<RegionCount>,
    #[serde(default)]
    pub by_exit_year: Vec<ExitYearCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionCount {
    #[serde(rename = "Region", default)]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub count: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitYearCount {
    #[serde(rename = "ExitYear", default, deserialize_with = "lenient::opt_i32")]
    pub exit_year: Option<i32>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub count: Option<u64>,
}

/// A county as listed by `/counties`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct County {
    #[serde(rename = "CountyCode")]
    pub code: String,
    #[serde(rename = "CountyName", default)]
    pub name: Option<String>,
    #[serde(rename = "Province", default)]
    pub province: Option<String>,
    #[serde(rename = "City", default)]
    pub city: Option<String>,
    #[serde(rename = "Region", default)]
    pub region: Option<String>,
    #[serde(rename = "ExitYear", default, deserialize_with = "lenient::opt_i32")]
    pub exit_year: Option<i32>,
    #[serde(rename = "Longitude", default, deserialize_with = "lenient::opt_f64")]
    pub longitude: Option<f64>,
    #[serde(rename = "Latitude", default, deserialize_with = "lenient::opt_f64")]
    pub latitude: Option<f64>,
    /// Precomputed ranking signal, used only to order lists.
    #[serde(
        rename = "CompletenessScore",
        default,
        deserialize_with = "lenient::opt_f64"
    )]
    pub completeness_score: Option<f64>,
}

impl County {
    /// Display name, falling back to the code.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.code)
    }
}

/// A single county as returned by `/counties/{code}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountyDetail {
    #[serde(flatten)]
    pub county: County,
    #[serde(rename = "TerrainRelief", default, deserialize_with = "lenient::opt_f64")]
    pub terrain_relief: Option<f64>,
}

/// One fact: a county, a year, and whatever metrics the row carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawMetricRow")]
pub struct MetricRow {
    pub entity_code: String,
    pub entity_name: String,
    pub year: i32,
    pub values: BTreeMap<Metric, f64>,
}

impl MetricRow {
    /// Value of `metric`, or `None` when the row has no data for it.
    pub fn value(&self, metric: Metric) -> Option<f64> {
        self.values.get(&metric).copied()
    }
}

#[derive(Deserialize)]
struct RawMetricRow {
    #[serde(rename = "CountyCode", default)]
    code: String,
    #[serde(rename = "CountyName", default)]
    name: Option<String>,
    #[serde(rename = "Year", deserialize_with = "lenient::year")]
    year: i32,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

impl From<RawMetricRow> for MetricRow {
    fn from(raw: RawMetricRow) -> Self {
        let entity_name = raw.name.unwrap_or_else(|| raw.code.clone());
        Self {
            entity_code: raw.code,
            entity_name,
            year: raw.year,
            values: metric_values(&raw.rest),
        }
    }
}

/// A per-year row from `/counties/{code}/economy` or `/agriculture`.
///
/// These rows carry no county columns; [`YearlyRow::into_metric_row`]
/// attaches them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawYearlyRow")]
pub struct YearlyRow {
    pub year: i32,
    pub values: BTreeMap<Metric, f64>,
}

impl YearlyRow {
    pub fn into_metric_row(self, code: &str, name: &str) -> MetricRow {
        MetricRow {
            entity_code: code.to_string(),
            entity_name: name.to_string(),
            year: self.year,
            values: self.values,
        }
    }
}

#[derive(Deserialize)]
struct RawYearlyRow {
    #[serde(rename = "Year", deserialize_with = "lenient::year")]
    year: i32,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

impl From<RawYearlyRow> for YearlyRow {
    fn from(raw: RawYearlyRow) -> Self {
        Self {
            year: raw.year,
            values: metric_values(&raw.rest),
        }
    }
}

/// Pick the known metric columns out of a row; unknown columns and nulls are dropped.
fn metric_values(columns: &Map<String, Value>) -> BTreeMap<Metric, f64> {
    columns
        .iter()
        .filter_map(|(key, value)| {
            let metric = key.parse::<Metric>().ok()?;
            lenient::number(value).map(|v| (metric, v))
        })
        .collect()
}

/// Sown area of one crop in one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropRow {
    #[serde(rename = "Year", deserialize_with = "lenient::year")]
    pub year: i32,
    #[serde(rename = "CropType", default)]
    pub crop_type: Option<String>,
    #[serde(rename = "SownArea", default, deserialize_with = "lenient::opt_f64")]
    pub sown_area: Option<f64>,
}

/// A recorded field interview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interview {
    #[serde(rename = "InterviewID", default)]
    pub id: Option<String>,
    #[serde(rename = "InterviewDate", default)]
    pub date: Option<String>,
    #[serde(rename = "IntervieweeName", default)]
    pub interviewee_name: Option<String>,
    #[serde(rename = "IntervieweeInfo", default)]
    pub interviewee_info: Option<String>,
    #[serde(rename = "Content", default)]
    pub content: Option<String>,
    #[serde(rename = "InterviewLocation", default)]
    pub location: Option<String>,
    #[serde(rename = "Quality", default, deserialize_with = "lenient::opt_f64")]
    pub quality: Option<f64>,
    #[serde(rename = "CountyCode", default)]
    pub county_code: Option<String>,
    #[serde(rename = "CountyName", default)]
    pub county_name: Option<String>,
    #[serde(rename = "SurveyorName", default)]
    pub surveyor_name: Option<String>,
    #[serde(rename = "SurveyorID", default)]
    pub surveyor_id: Option<String>,
}

/// Deserializers that accept numbers, numeric strings (DECIMAL columns) and null.
mod lenient {
    use super::*;

    pub fn number(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(number(&value))
    }

    pub fn opt_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(number(&value).filter(|v| *v >= 0.0).map(|v| v as u64))
    }

    pub fn opt_i32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i32>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(number(&value).map(|v| v as i32))
    }

    pub fn year<'de, D: Deserializer<'de>>(d: D) -> Result<i32, D::Error> {
        let value = Value::deserialize(d)?;
        number(&value)
            .map(|v| v as i32)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid year: {}", value)))
    }
}
