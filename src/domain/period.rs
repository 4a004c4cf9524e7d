use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Metered consumption for one period, alongside its pre-intervention baseline.
///
/// Validation rules apply at the request boundary only. The calculator accepts
/// any finite values, including zero baselines and negative savings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PeriodInput {
    /// Period name, e.g. `business_hours`, `after_hours`, `weekend`
    #[validate(length(min = 1))]
    pub period: String,
    /// Time range label, e.g. `08:00-18:00`
    pub time_range: String,
    pub days: Vec<String>,

    #[validate(range(exclusive_min = 0.0), custom(function = "validate_finite"))]
    pub current_electric_kwh: f64,
    #[validate(range(exclusive_min = 0.0), custom(function = "validate_finite"))]
    pub current_gas_therms: f64,
    #[validate(range(exclusive_min = 0.0), custom(function = "validate_finite"))]
    pub baseline_electric_kwh: f64,
    #[validate(range(exclusive_min = 0.0), custom(function = "validate_finite"))]
    pub baseline_gas_therms: f64,

    /// Cost per kWh
    #[validate(range(exclusive_min = 0.0), custom(function = "validate_finite"))]
    pub electric_rate: f64,
    /// Cost per therm
    #[validate(range(exclusive_min = 0.0), custom(function = "validate_finite"))]
    pub gas_rate: f64,
}

/// Savings and improvement figures derived from a single [`PeriodInput`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodMetrics {
    pub period: String,
    pub time_range: String,
    pub days: Vec<String>,

    // Energy savings
    pub electric_savings_kwh: f64,
    pub gas_savings_therms: f64,

    // Cost savings
    pub electric_cost_savings: f64,
    pub gas_cost_savings: f64,
    pub total_cost_savings: f64,

    // Improvements (%)
    pub electric_efficiency_improvement: f64,
    pub gas_efficiency_improvement: f64,
    pub overall_efficiency_improvement: f64,
}

impl PeriodMetrics {
    /// False when an input magnitude overflowed into an infinite or NaN figure.
    pub fn is_finite(&self) -> bool {
        [
            self.electric_savings_kwh,
            self.gas_savings_therms,
            self.electric_cost_savings,
            self.gas_cost_savings,
            self.total_cost_savings,
            self.electric_efficiency_improvement,
            self.gas_efficiency_improvement,
            self.overall_efficiency_improvement,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

fn validate_finite(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::new("finite"))
    }
}
