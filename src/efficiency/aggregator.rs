//! Cross-calculation reduction into per-building summaries.
//!
//! Repository adapters call into this module so that every store applies the
//! same ordering, tie-break and grade-ranking rules.

use chrono::{DateTime, Utc};
use itertools::Itertools;
use std::cmp::Ordering;

use super::summarizer::mean;
use crate::domain::{
    BuildingEfficiencySummary, BuildingSummaryPage, EfficiencyCalculation, PerformanceGrade,
};

/// Newest-first ordering: later `recorded_at` first, equal timestamps broken
/// by the higher identity. Identities are time-ordered, so the later insert wins.
pub fn newest_first(a: &EfficiencyCalculation, b: &EfficiencyCalculation) -> Ordering {
    b.recorded_at()
        .cmp(&a.recorded_at())
        .then_with(|| b.id.cmp(&a.id))
}

/// Sort a history in place, newest first.
pub fn sort_newest_first(history: &mut [EfficiencyCalculation]) {
    history.sort_by(newest_first);
}

/// The most recent calculation of a history, regardless of its order.
pub fn latest(history: &[EfficiencyCalculation]) -> Option<&EfficiencyCalculation> {
    history.iter().min_by(|a, b| newest_first(a, b))
}

/// Reduce one building's complete history.
///
/// `total_calculations` comes from an authoritative count, not from
/// `history.len()`. Returns `None` when the count is zero or the history is
/// empty; there is no synthetic zero summary.
pub fn summarize_building(
    building_id: &str,
    history: &[EfficiencyCalculation],
    total_calculations: u64,
    summarized_at: DateTime<Utc>,
) -> Option<BuildingEfficiencySummary> {
    if total_calculations == 0 {
        return None;
    }
    let newest = latest(history)?;
    let best = PerformanceGrade::best(history.iter().map(|c| c.summary.performance_grade))?;

    Some(BuildingEfficiencySummary {
        building_id: building_id.to_string(),
        total_calculations,
        latest_calculation: Some(newest.clone()),
        best_performance_grade: best,
        average_efficiency_improvement: mean(
            history.iter().map(|c| c.summary.overall_efficiency_improvement),
        ),
        total_cost_savings: history.iter().map(|c| c.summary.total_cost_savings).sum(),
        created_at: summarized_at,
    })
}

/// Summarize every building found in `calculations` and return one page.
///
/// Buildings are ordered by their own latest calculation, newest first
/// (building id ascending on equal timestamps), then `skip`/`limit` apply to
/// that building-level order. Each listed summary is stamped with its
/// building's latest creation time.
pub fn paginate_building_summaries(
    calculations: &[EfficiencyCalculation],
    skip: usize,
    limit: usize,
) -> BuildingSummaryPage {
    let by_building = calculations
        .iter()
        .cloned()
        .into_group_map_by(|c| c.building_id.clone());
    let total_buildings = by_building.len() as u64;

    let summaries = by_building
        .into_iter()
        .filter_map(|(building_id, history)| {
            let latest_at = latest(&history)?.recorded_at();
            summarize_building(&building_id, &history, history.len() as u64, latest_at)
        })
        .sorted_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.building_id.cmp(&b.building_id))
        })
        .skip(skip)
        .take(limit)
        .collect();

    BuildingSummaryPage {
        summaries,
        total_buildings,
    }
}
