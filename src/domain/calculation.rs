use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{PerformanceGrade, PeriodInput, PeriodMetrics};

/// Aggregate of the period metrics belonging to one calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencySummary {
    pub total_electric_savings_kwh: f64,
    pub total_gas_savings_therms: f64,
    pub total_electric_cost_savings: f64,
    pub total_gas_cost_savings: f64,
    pub total_cost_savings: f64,
    pub average_electric_efficiency_improvement: f64,
    pub average_gas_efficiency_improvement: f64,
    /// Unweighted mean of the per-period overall improvements
    pub overall_efficiency_improvement: f64,
    pub performance_grade: PerformanceGrade,
}

impl EfficiencySummary {
    pub fn is_finite(&self) -> bool {
        [
            self.total_electric_savings_kwh,
            self.total_gas_savings_therms,
            self.total_electric_cost_savings,
            self.total_gas_cost_savings,
            self.total_cost_savings,
            self.average_electric_efficiency_improvement,
            self.average_gas_efficiency_improvement,
            self.overall_efficiency_improvement,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// One persisted run of the calculator for a building and measure.
///
/// `id` and `created_at` are `None` until the repository assigns them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyCalculation {
    #[serde(default)]
    pub id: Option<String>,
    pub building_id: String,
    pub measure_name: String,
    #[serde(with = "iso8601")]
    pub calculation_timestamp: DateTime<Utc>,
    pub periods: Vec<PeriodMetrics>,
    pub summary: EfficiencySummary,
    #[serde(default, with = "iso8601::option")]
    pub created_at: Option<DateTime<Utc>>,
}

impl EfficiencyCalculation {
    pub fn new(
        building_id: impl Into<String>,
        measure_name: impl Into<String>,
        periods: Vec<PeriodMetrics>,
        summary: EfficiencySummary,
    ) -> Self {
        Self {
            id: None,
            building_id: building_id.into(),
            measure_name: measure_name.into(),
            calculation_timestamp: Utc::now(),
            periods,
            summary,
            created_at: None,
        }
    }

    /// Creation time used for newest-first ordering. Falls back to the
    /// calculation timestamp for entities the store has not seen yet.
    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.created_at.unwrap_or(self.calculation_timestamp)
    }

    pub fn covers_period(&self, period: &str) -> bool {
        self.periods.iter().any(|p| p.period == period)
    }

    /// JSON has no representation for infinities or NaN, so a calculation
    /// carrying one cannot be stored or cached faithfully.
    pub fn is_finite(&self) -> bool {
        self.summary.is_finite() && self.periods.iter().all(PeriodMetrics::is_finite)
    }
}

/// Read-side view over a building's full calculation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingEfficiencySummary {
    pub building_id: String,
    pub total_calculations: u64,
    #[serde(default)]
    pub latest_calculation: Option<EfficiencyCalculation>,
    pub best_performance_grade: PerformanceGrade,
    pub average_efficiency_improvement: f64,
    pub total_cost_savings: f64,
    /// When the summary was produced
    #[serde(with = "iso8601")]
    pub created_at: DateTime<Utc>,
}

/// One page of the all-buildings listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingSummaryPage {
    pub summaries: Vec<BuildingEfficiencySummary>,
    /// Distinct buildings across all pages
    pub total_buildings: u64,
}

/// Inbound calculation request, validated before any computation happens.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CalculateEfficiencyRequest {
    #[validate(length(min = 1, max = 128))]
    pub building_id: String,
    #[validate(length(min = 1, max = 256))]
    pub measure_name: String,
    #[validate(length(min = 1), nested)]
    pub periods: Vec<PeriodInput>,
}

/// ISO-8601 timestamps. Serializes as RFC 3339; also reads offset-less
/// timestamps (taken as UTC) written by older producers.
mod iso8601 {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

    const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT).map(|naive| naive.and_utc()))
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(D::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            value.serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| parse(&raw).map_err(D::Error::custom))
                .transpose()
        }
    }
}
