//! Metric catalogue.
//!
//! Every indicator the backend reports is a variant of [`Metric`]. Each variant
//! maps to a [`MetricInfo`] carrying its display divisor, unit and label, so
//! scaling is a total function and a misspelled metric name fails at parse
//! time instead of silently scaling by 1.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A numeric indicator reported per county and year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Metric {
    // county_economy
    Gdp,
    GdpPrimary,
    GdpSecondary,
    GdpTertiary,
    PerCapitaGdp,
    UrbanAvgWage,
    RuralDisposableIncome,
    FiscalRevenue,
    FiscalExpenditure,
    SavingsDeposit,
    LoanBalance,
    IndustrialOutput,
    IndustrialEnterpriseCount,
    FixedAssetInvestment,
    RetailSales,
    // county_agriculture
    CropArea,
    MachineryPower,
    GrainOutput,
    CottonOutput,
    OilOutput,
    MeatOutput,
    AgriOutputValue,
    RuralLaborForce,
    AgriLaborForce,
}

/// Display properties of a metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricInfo {
    /// Raw values are divided by this before display.
    pub divisor: f64,
    /// Unit of the scaled value.
    pub unit: &'static str,
    /// Human readable name.
    pub label: &'static str,
}

const CURRENCY: f64 = 10_000.0;
const MASS: f64 = 1_000.0;
const UNIT: f64 = 1.0;

fn info(divisor: f64, unit: &'static str, label: &'static str) -> MetricInfo {
    MetricInfo {
        divisor,
        unit,
        label,
    }
}

/// Error returned when a metric name is not in the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown metric '{0}' (run `countydash metrics` for the list)")]
pub struct MetricParseError(pub String);

impl Metric {
    /// All metrics in catalogue order.
    pub const ALL: [Metric; 24] = [
        Metric::Gdp,
        Metric::GdpPrimary,
        Metric::GdpSecondary,
        Metric::GdpTertiary,
        Metric::PerCapitaGdp,
        Metric::UrbanAvgWage,
        Metric::RuralDisposableIncome,
        Metric::FiscalRevenue,
        Metric::FiscalExpenditure,
        Metric::SavingsDeposit,
        Metric::LoanBalance,
        Metric::IndustrialOutput,
        Metric::IndustrialEnterpriseCount,
        Metric::FixedAssetInvestment,
        Metric::RetailSales,
        Metric::CropArea,
        Metric::MachineryPower,
        Metric::GrainOutput,
        Metric::CottonOutput,
        Metric::OilOutput,
        Metric::MeatOutput,
        Metric::AgriOutputValue,
        Metric::RuralLaborForce,
        Metric::AgriLaborForce,
    ];

    /// Metrics the `/compare/trend` endpoint accepts.
    pub const TREND: [Metric; 4] = [
        Metric::Gdp,
        Metric::PerCapitaGdp,
        Metric::RuralDisposableIncome,
        Metric::AgriOutputValue,
    ];

    /// Column name used by the backend.
    pub fn api_name(self) -> &'static str {
        match self {
            Metric::Gdp => "GDP",
            Metric::GdpPrimary => "GDP_Primary",
            Metric::GdpSecondary => "GDP_Secondary",
            Metric::GdpTertiary => "GDP_Tertiary",
            Metric::PerCapitaGdp => "PerCapitaGDP",
            Metric::UrbanAvgWage => "UrbanAvgWage",
            Metric::RuralDisposableIncome => "RuralDisposableIncome",
            Metric::FiscalRevenue => "FiscalRevenue",
            Metric::FiscalExpenditure => "FiscalExpenditure",
            Metric::SavingsDeposit => "SavingsDeposit",
            Metric::LoanBalance => "LoanBalance",
            Metric::IndustrialOutput => "IndustrialOutput",
            Metric::IndustrialEnterpriseCount => "IndustrialEnterpriseCount",
            Metric::FixedAssetInvestment => "FixedAssetInvestment",
            Metric::RetailSales => "RetailSales",
            Metric::CropArea => "CropArea",
            Metric::MachineryPower => "MachineryPower",
            Metric::GrainOutput => "GrainOutput",
            Metric::CottonOutput => "CottonOutput",
            Metric::OilOutput => "OilOutput",
            Metric::MeatOutput => "MeatOutput",
            Metric::AgriOutputValue => "AgriOutputValue",
            Metric::RuralLaborForce => "RuralLaborForce",
            Metric::AgriLaborForce => "AgriLaborForce",
        }
    }

    /// Divisor, unit and label for this metric.
    pub fn info(self) -> MetricInfo {
        match self {
            Metric::Gdp => info(CURRENCY, "万元", "GDP"),
            Metric::GdpPrimary => info(CURRENCY, "万元", "Primary industry GDP"),
            Metric::GdpSecondary => info(CURRENCY, "万元", "Secondary industry GDP"),
            Metric::GdpTertiary => info(CURRENCY, "万元", "Tertiary industry GDP"),
            Metric::PerCapitaGdp => info(CURRENCY, "万元", "GDP per capita"),
            Metric::UrbanAvgWage => info(CURRENCY, "万元", "Average urban wage"),
            Metric::RuralDisposableIncome => {
                info(CURRENCY, "万元", "Rural disposable income")
            }
            Metric::FiscalRevenue => info(CURRENCY, "万元", "Fiscal revenue"),
            Metric::FiscalExpenditure => info(CURRENCY, "万元", "Fiscal expenditure"),
            Metric::SavingsDeposit => info(CURRENCY, "万元", "Savings deposits"),
            Metric::LoanBalance => info(CURRENCY, "万元", "Loan balance"),
            Metric::IndustrialOutput => info(CURRENCY, "万元", "Industrial output"),
            Metric::IndustrialEnterpriseCount => info(UNIT, "个", "Industrial enterprises"),
            Metric::FixedAssetInvestment => {
                info(CURRENCY, "万元", "Fixed asset investment")
            }
            Metric::RetailSales => info(CURRENCY, "万元", "Retail sales"),
            Metric::CropArea => info(UNIT, "公顷", "Crop area"),
            Metric::MachineryPower => info(UNIT, "千瓦", "Machinery power"),
            Metric::GrainOutput => info(MASS, "千吨", "Grain output"),
            Metric::CottonOutput => info(MASS, "千吨", "Cotton output"),
            Metric::OilOutput => info(MASS, "千吨", "Oil crop output"),
            Metric::MeatOutput => info(MASS, "千吨", "Meat output"),
            Metric::AgriOutputValue => info(CURRENCY, "万元", "Agricultural output value"),
            Metric::RuralLaborForce => info(UNIT, "人", "Rural labor force"),
            Metric::AgriLaborForce => info(UNIT, "人", "Agricultural labor force"),
        }
    }

    /// Whether `/compare/trend` can be queried for this metric.
    pub fn supports_trend(self) -> bool {
        Self::TREND.contains(&self)
    }
}

/// Scale a raw value for display. Absent stays absent.
pub fn scale_value(value: Option<f64>, metric: Metric) -> Option<f64> {
    value.map(|v| v / metric.info().divisor)
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

impl FromStr for Metric {
    type Err = MetricParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Metric::ALL
            .into_iter()
            .find(|m| m.api_name().eq_ignore_ascii_case(needle))
            .ok_or_else(|| MetricParseError(needle.to_string()))
    }
}

impl TryFrom<String> for Metric {
    type Error = MetricParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Metric> for String {
    fn from(metric: Metric) -> Self {
        metric.api_name().to_string()
    }
}
