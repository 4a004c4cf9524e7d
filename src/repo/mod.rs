//! Durable store port for efficiency calculations.
//!
//! The store is the single source of truth. It assigns identity and creation
//! time, keeps histories newest-first, and answers the per-building summary
//! and listing queries using [`crate::efficiency::aggregator`].

pub mod memory;
#[cfg(feature = "db")]
pub mod pg;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{BuildingEfficiencySummary, BuildingSummaryPage, EfficiencyCalculation};

pub use memory::InMemoryEfficiencyRepository;
#[cfg(feature = "db")]
pub use pg::PgEfficiencyRepository;

#[async_trait]
pub trait EfficiencyRepository: Send + Sync {
    /// Persist a calculation, returning it with `id` and `created_at` set.
    async fn create(&self, calculation: EfficiencyCalculation) -> Result<EfficiencyCalculation>;

    async fn get_by_id(&self, id: &str) -> Result<Option<EfficiencyCalculation>>;

    /// All calculations of a building, newest first.
    async fn get_by_building(&self, building_id: &str) -> Result<Vec<EfficiencyCalculation>>;

    /// Calculations of a building that include `period`, newest first.
    async fn get_by_building_and_period(
        &self,
        building_id: &str,
        period: &str,
    ) -> Result<Vec<EfficiencyCalculation>>;

    /// `None` when the building has no calculations.
    async fn get_building_summary(&self, building_id: &str) -> Result<Option<BuildingEfficiencySummary>>;

    async fn get_latest(&self, building_id: &str) -> Result<Option<EfficiencyCalculation>>;

    async fn count_by_building(&self, building_id: &str) -> Result<u64>;

    /// Page over distinct buildings ordered by their latest calculation.
    async fn list_building_summaries(&self, skip: usize, limit: usize) -> Result<BuildingSummaryPage>;
}
