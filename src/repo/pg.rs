//! PostgreSQL store.
//!
//! Expects an `efficiency_calculations` table:
//! `id UUID PRIMARY KEY, building_id TEXT, measure_name TEXT,
//! calculation_timestamp TIMESTAMPTZ, periods JSONB, summary JSONB,
//! created_at TIMESTAMPTZ` with an index on `(building_id, created_at DESC)`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use super::EfficiencyRepository;
use crate::domain::{
    BuildingEfficiencySummary, BuildingSummaryPage, EfficiencyCalculation, EfficiencySummary,
    PeriodMetrics,
};
use crate::efficiency::aggregator;

const SELECT_COLUMNS: &str =
    "id, building_id, measure_name, calculation_timestamp, periods, summary, created_at";

#[derive(Debug, FromRow)]
struct CalculationRow {
    id: Uuid,
    building_id: String,
    measure_name: String,
    calculation_timestamp: DateTime<Utc>,
    periods: Json<Vec<PeriodMetrics>>,
    summary: Json<EfficiencySummary>,
    created_at: DateTime<Utc>,
}

impl From<CalculationRow> for EfficiencyCalculation {
    fn from(row: CalculationRow) -> Self {
        Self {
            id: Some(row.id.to_string()),
            building_id: row.building_id,
            measure_name: row.measure_name,
            calculation_timestamp: row.calculation_timestamp,
            periods: row.periods.0,
            summary: row.summary.0,
            created_at: Some(row.created_at),
        }
    }
}

pub struct PgEfficiencyRepository {
    pool: PgPool,
}

impl PgEfficiencyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .context("Failed to create database pool")?;
        info!("connected efficiency store");
        Ok(Self { pool })
    }

    /// Create the table and its index when missing.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS efficiency_calculations (
                id UUID PRIMARY KEY,
                building_id TEXT NOT NULL,
                measure_name TEXT NOT NULL,
                calculation_timestamp TIMESTAMPTZ NOT NULL,
                periods JSONB NOT NULL,
                summary JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create efficiency_calculations table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS efficiency_calculations_building_created \
             ON efficiency_calculations (building_id, created_at DESC)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create efficiency_calculations index")?;

        Ok(())
    }

    async fn fetch_history(&self, building_id: &str) -> Result<Vec<EfficiencyCalculation>> {
        let rows: Vec<CalculationRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM efficiency_calculations \
             WHERE building_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(building_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch building calculations")?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl EfficiencyRepository for PgEfficiencyRepository {
    async fn create(&self, mut calculation: EfficiencyCalculation) -> Result<EfficiencyCalculation> {
        let id = Uuid::now_v7();
        let created_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO efficiency_calculations
                (id, building_id, measure_name, calculation_timestamp, periods, summary, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING created_at
            "#,
        )
        .bind(id)
        .bind(&calculation.building_id)
        .bind(&calculation.measure_name)
        .bind(calculation.calculation_timestamp)
        .bind(Json(&calculation.periods))
        .bind(Json(&calculation.summary))
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert efficiency calculation")?;

        debug!(building_id = %calculation.building_id, %id, "inserted calculation");

        calculation.id = Some(id.to_string());
        calculation.created_at = Some(created_at);
        Ok(calculation)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<EfficiencyCalculation>> {
        // Malformed identities cannot exist in the table
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };
        let row: Option<CalculationRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM efficiency_calculations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch calculation by id")?;

        Ok(row.map(Into::into))
    }

    async fn get_by_building(&self, building_id: &str) -> Result<Vec<EfficiencyCalculation>> {
        self.fetch_history(building_id).await
    }

    async fn get_by_building_and_period(
        &self,
        building_id: &str,
        period: &str,
    ) -> Result<Vec<EfficiencyCalculation>> {
        let containment = serde_json::json!([{ "period": period }]);
        let rows: Vec<CalculationRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM efficiency_calculations \
             WHERE building_id = $1 AND periods @> $2 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(building_id)
        .bind(Json(containment))
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch building calculations for period")?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_building_summary(&self, building_id: &str) -> Result<Option<BuildingEfficiencySummary>> {
        let total = self.count_by_building(building_id).await?;
        if total == 0 {
            return Ok(None);
        }
        let history = self.fetch_history(building_id).await?;
        Ok(aggregator::summarize_building(building_id, &history, total, Utc::now()))
    }

    async fn get_latest(&self, building_id: &str) -> Result<Option<EfficiencyCalculation>> {
        let row: Option<CalculationRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM efficiency_calculations \
             WHERE building_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1"
        ))
        .bind(building_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch latest calculation")?;

        Ok(row.map(Into::into))
    }

    async fn count_by_building(&self, building_id: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM efficiency_calculations WHERE building_id = $1",
        )
        .bind(building_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count building calculations")?;

        Ok(count.max(0) as u64)
    }

    async fn list_building_summaries(&self, skip: usize, limit: usize) -> Result<BuildingSummaryPage> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT building_id) FROM efficiency_calculations",
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to count buildings")?;

        let building_ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT building_id
            FROM efficiency_calculations
            GROUP BY building_id
            ORDER BY MAX(created_at) DESC, building_id ASC
            OFFSET $1 LIMIT $2
            "#,
        )
        .bind(skip as i64)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to page buildings")?;

        let mut summaries = Vec::with_capacity(building_ids.len());
        for building_id in building_ids {
            let history = self.fetch_history(&building_id).await?;
            let Some(latest_at) = aggregator::latest(&history).map(|c| c.recorded_at()) else {
                continue;
            };
            summaries.extend(aggregator::summarize_building(
                &building_id,
                &history,
                history.len() as u64,
                latest_at,
            ));
        }

        Ok(BuildingSummaryPage {
            summaries,
            total_buildings: total.max(0) as u64,
        })
    }
}
