//! Per-period savings and improvement metrics.
//!
//! Every function here is total: zero baselines yield a 0% improvement and
//! negative savings (consumption went up) are reported as-is.

use crate::domain::{PeriodInput, PeriodMetrics};

/// `savings / baseline * 100`, or 0 when there is no positive baseline.
fn improvement_pct(savings: f64, baseline: f64) -> f64 {
    if baseline > 0.0 {
        savings / baseline * 100.0
    } else {
        0.0
    }
}

/// Compute the metrics for a single period.
pub fn calculate_period_metrics(input: &PeriodInput) -> PeriodMetrics {
    let electric_savings = input.baseline_electric_kwh - input.current_electric_kwh;
    let gas_savings = input.baseline_gas_therms - input.current_gas_therms;

    let electric_cost_savings = electric_savings * input.electric_rate;
    let gas_cost_savings = gas_savings * input.gas_rate;

    // Electric and gas energy are summed as-is, without unit conversion
    let total_baseline = input.baseline_electric_kwh + input.baseline_gas_therms;
    let total_current = input.current_electric_kwh + input.current_gas_therms;

    PeriodMetrics {
        period: input.period.clone(),
        time_range: input.time_range.clone(),
        days: input.days.clone(),
        electric_savings_kwh: electric_savings,
        gas_savings_therms: gas_savings,
        electric_cost_savings,
        gas_cost_savings,
        total_cost_savings: electric_cost_savings + gas_cost_savings,
        electric_efficiency_improvement: improvement_pct(electric_savings, input.baseline_electric_kwh),
        gas_efficiency_improvement: improvement_pct(gas_savings, input.baseline_gas_therms),
        overall_efficiency_improvement: improvement_pct(total_baseline - total_current, total_baseline),
    }
}

/// Compute metrics for every period, preserving input order.
pub fn calculate_all(inputs: &[PeriodInput]) -> Vec<PeriodMetrics> {
    inputs.iter().map(calculate_period_metrics).collect()
}
