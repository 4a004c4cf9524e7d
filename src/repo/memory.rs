use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::EfficiencyRepository;
use crate::domain::{BuildingEfficiencySummary, BuildingSummaryPage, EfficiencyCalculation};
use crate::efficiency::aggregator;

/// Store backed by a process-local vector. Used by the `memory` backend and
/// throughout the tests.
#[derive(Debug, Default)]
pub struct InMemoryEfficiencyRepository {
    calculations: RwLock<Vec<EfficiencyCalculation>>,
}

impl InMemoryEfficiencyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed pre-built calculations, keeping whatever identity and timestamps
    /// they carry.
    pub async fn seed(&self, calculations: impl IntoIterator<Item = EfficiencyCalculation>) {
        self.calculations.write().await.extend(calculations);
    }

    pub async fn len(&self) -> usize {
        self.calculations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn history<F>(&self, filter: F) -> Vec<EfficiencyCalculation>
    where
        F: Fn(&EfficiencyCalculation) -> bool,
    {
        let mut history: Vec<_> = self
            .calculations
            .read()
            .await
            .iter()
            .filter(|c| filter(c))
            .cloned()
            .collect();
        aggregator::sort_newest_first(&mut history);
        history
    }
}

#[async_trait]
impl EfficiencyRepository for InMemoryEfficiencyRepository {
    async fn create(&self, mut calculation: EfficiencyCalculation) -> Result<EfficiencyCalculation> {
        calculation.id = Some(Uuid::now_v7().to_string());
        calculation.created_at = Some(Utc::now());
        self.calculations.write().await.push(calculation.clone());
        debug!(
            building_id = %calculation.building_id,
            id = calculation.id.as_deref().unwrap_or_default(),
            "stored calculation"
        );
        Ok(calculation)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<EfficiencyCalculation>> {
        Ok(self
            .calculations
            .read()
            .await
            .iter()
            .find(|c| c.id.as_deref() == Some(id))
            .cloned())
    }

    async fn get_by_building(&self, building_id: &str) -> Result<Vec<EfficiencyCalculation>> {
        Ok(self.history(|c| c.building_id == building_id).await)
    }

    async fn get_by_building_and_period(
        &self,
        building_id: &str,
        period: &str,
    ) -> Result<Vec<EfficiencyCalculation>> {
        Ok(self
            .history(|c| c.building_id == building_id && c.covers_period(period))
            .await)
    }

    async fn get_building_summary(&self, building_id: &str) -> Result<Option<BuildingEfficiencySummary>> {
        let total = self.count_by_building(building_id).await?;
        if total == 0 {
            return Ok(None);
        }
        let history = self.get_by_building(building_id).await?;
        Ok(aggregator::summarize_building(building_id, &history, total, Utc::now()))
    }

    async fn get_latest(&self, building_id: &str) -> Result<Option<EfficiencyCalculation>> {
        let calculations = self.calculations.read().await;
        let history: Vec<_> = calculations
            .iter()
            .filter(|c| c.building_id == building_id)
            .cloned()
            .collect();
        Ok(aggregator::latest(&history).cloned())
    }

    async fn count_by_building(&self, building_id: &str) -> Result<u64> {
        Ok(self
            .calculations
            .read()
            .await
            .iter()
            .filter(|c| c.building_id == building_id)
            .count() as u64)
    }

    async fn list_building_summaries(&self, skip: usize, limit: usize) -> Result<BuildingSummaryPage> {
        let calculations = self.calculations.read().await;
        Ok(aggregator::paginate_building_summaries(&calculations, skip, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PerformanceGrade, PeriodInput};
    use crate::efficiency::{calculator, summarizer};

    fn calculation(building: &str, period: &str, baseline: f64) -> EfficiencyCalculation {
        let input = PeriodInput {
            period: period.to_string(),
            time_range: "08:00-18:00".to_string(),
            days: vec!["monday".to_string()],
            current_electric_kwh: 800.0,
            current_gas_therms: 90.0,
            baseline_electric_kwh: baseline,
            baseline_gas_therms: 100.0,
            electric_rate: 0.12,
            gas_rate: 1.5,
        };
        let periods = calculator::calculate_all(&[input]);
        let summary = summarizer::summarize(&periods);
        EfficiencyCalculation::new(building, "LED retrofit", periods, summary)
    }

    #[tokio::test]
    async fn test_create_assigns_identity() {
        let repo = InMemoryEfficiencyRepository::new();
        let stored = repo.create(calculation("b1", "weekend", 1000.0)).await.unwrap();

        assert!(stored.id.is_some());
        assert!(stored.created_at.is_some());
        let found = repo.get_by_id(stored.id.as_deref().unwrap()).await.unwrap();
        assert_eq!(found, Some(stored));
    }

    #[tokio::test]
    async fn test_history_is_newest_first_and_filtered() {
        let repo = InMemoryEfficiencyRepository::new();
        let first = repo.create(calculation("b1", "weekend", 1000.0)).await.unwrap();
        let second = repo.create(calculation("b1", "after_hours", 1000.0)).await.unwrap();
        repo.create(calculation("b2", "weekend", 1000.0)).await.unwrap();

        let all = repo.get_by_building("b1").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);

        let weekend = repo.get_by_building_and_period("b1", "weekend").await.unwrap();
        assert_eq!(weekend.len(), 1);
        assert_eq!(weekend[0].id, first.id);

        assert_eq!(repo.get_latest("b1").await.unwrap().unwrap().id, second.id);
        assert_eq!(repo.count_by_building("b1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_summary_absent_without_history() {
        let repo = InMemoryEfficiencyRepository::new();
        assert!(repo.get_building_summary("nowhere").await.unwrap().is_none());
        assert!(repo.get_latest("nowhere").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_equal_timestamps_prefer_highest_identity() {
        let repo = InMemoryEfficiencyRepository::new();
        let created_at = Utc::now();
        let lower = Uuid::now_v7().to_string();
        let higher = Uuid::now_v7().to_string();
        assert!(higher > lower);

        let stamped = |id: &str| {
            let mut calc = calculation("b1", "weekend", 1000.0);
            calc.id = Some(id.to_string());
            calc.created_at = Some(created_at);
            calc
        };
        // Insertion order must not decide the winner
        repo.seed([stamped(&higher), stamped(&lower)]).await;

        let latest = repo.get_latest("b1").await.unwrap().unwrap();
        assert_eq!(latest.id.as_deref(), Some(higher.as_str()));

        let history = repo.get_by_building("b1").await.unwrap();
        let ids: Vec<_> = history.iter().map(|c| c.id.clone().unwrap()).collect();
        assert_eq!(ids, vec![higher.clone(), lower.clone()]);

        let summary = repo.get_building_summary("b1").await.unwrap().unwrap();
        assert_eq!(summary.latest_calculation.unwrap().id, Some(higher));
    }

    #[tokio::test]
    async fn test_summary_reduces_history() {
        let repo = InMemoryEfficiencyRepository::new();
        // 19.09% overall -> B, then 1.1% overall -> F
        repo.create(calculation("b1", "weekend", 1000.0)).await.unwrap();
        let latest = repo.create(calculation("b1", "weekend", 800.0)).await.unwrap();

        let summary = repo.get_building_summary("b1").await.unwrap().unwrap();
        assert_eq!(summary.total_calculations, 2);
        assert_eq!(summary.best_performance_grade, PerformanceGrade::B);
        assert_eq!(summary.latest_calculation.unwrap().id, latest.id);
    }
}
