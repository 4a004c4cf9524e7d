use crate::domain::{EfficiencySummary, PerformanceGrade, PeriodMetrics};

/// Arithmetic mean, 0 for an empty iterator.
pub(crate) fn mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Reduce period metrics into totals, unweighted averages and a grade.
///
/// An empty slice produces an all-zero summary graded F.
pub fn summarize(metrics: &[PeriodMetrics]) -> EfficiencySummary {
    let overall = mean(metrics.iter().map(|m| m.overall_efficiency_improvement));

    EfficiencySummary {
        total_electric_savings_kwh: metrics.iter().map(|m| m.electric_savings_kwh).sum(),
        total_gas_savings_therms: metrics.iter().map(|m| m.gas_savings_therms).sum(),
        total_electric_cost_savings: metrics.iter().map(|m| m.electric_cost_savings).sum(),
        total_gas_cost_savings: metrics.iter().map(|m| m.gas_cost_savings).sum(),
        total_cost_savings: metrics.iter().map(|m| m.total_cost_savings).sum(),
        average_electric_efficiency_improvement: mean(
            metrics.iter().map(|m| m.electric_efficiency_improvement),
        ),
        average_gas_efficiency_improvement: mean(
            metrics.iter().map(|m| m.gas_efficiency_improvement),
        ),
        overall_efficiency_improvement: overall,
        performance_grade: PerformanceGrade::from_improvement(overall),
    }
}
