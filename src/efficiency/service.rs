//! Cache-aside coordination between callers, the cache and the store.
//!
//! Reads try the cache first and fall back to the store, then populate the
//! cache with a fixed TTL. Writes go straight to the store and leave cached
//! reads alone, so a reader may see data up to one TTL old after a write.
//! Every cache failure is logged and discarded here; only store failures
//! reach the caller.

use futures::future::join_all;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use validator::{Validate, ValidationError, ValidationErrors};

use super::{calculator, summarizer};
use crate::cache::{CacheKeys, CacheStats, CacheStore, DEFAULT_CACHE_TTL_SECONDS};
use crate::domain::{
    BuildingEfficiencySummary, BuildingSummaryPage, CalculateEfficiencyRequest,
    EfficiencyCalculation, PeriodInput,
};
use crate::error::EfficiencyResult;
use crate::repo::EfficiencyRepository;

/// Largest page the all-buildings listing will return.
pub const DEFAULT_MAX_PAGE_SIZE: usize = 1000;

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    decode_failures: AtomicU64,
    cache_errors: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            cache_errors: self.cache_errors.load(Ordering::Relaxed),
        }
    }
}

/// Result of a best-effort invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Invalidation {
    pub attempted: usize,
    pub failed: usize,
}

enum Target {
    Key(String),
    Pattern(String),
}

pub struct EfficiencyService {
    repository: Arc<dyn EfficiencyRepository>,
    cache: Arc<dyn CacheStore>,
    keys: CacheKeys,
    ttl_seconds: u64,
    max_page_size: usize,
    counters: Counters,
}

impl EfficiencyService {
    pub fn new(repository: Arc<dyn EfficiencyRepository>, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            repository,
            cache,
            keys: CacheKeys::default(),
            ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            counters: Counters::default(),
        }
    }

    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.keys = CacheKeys::new(prefix);
        self
    }

    pub fn with_max_page_size(mut self, max_page_size: usize) -> Self {
        self.max_page_size = max_page_size.max(1);
        self
    }

    pub fn keys(&self) -> &CacheKeys {
        &self.keys
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Compute metrics for every period, summarize them and persist the
    /// result. Cached reads for the building are not touched.
    pub async fn calculate_efficiency(
        &self,
        building_id: &str,
        measure_name: &str,
        periods: &[PeriodInput],
    ) -> EfficiencyResult<EfficiencyCalculation> {
        let metrics = calculator::calculate_all(periods);
        let summary = summarizer::summarize(&metrics);
        let calculation = EfficiencyCalculation::new(building_id, measure_name, metrics, summary);
        if !calculation.is_finite() {
            warn!(building_id, measure_name, "calculation overflowed, not storing");
            let mut errors = ValidationErrors::new();
            errors.add(
                "periods",
                ValidationError::new("overflow")
                    .with_message("inputs produce metrics outside the representable range".into()),
            );
            return Err(errors.into());
        }

        let stored = self.repository.create(calculation).await?;
        info!(
            building_id,
            id = stored.id.as_deref().unwrap_or_default(),
            grade = %stored.summary.performance_grade,
            overall_improvement = stored.summary.overall_efficiency_improvement,
            "efficiency calculation stored"
        );
        Ok(stored)
    }

    /// Validate a request, then calculate as [`Self::calculate_efficiency`].
    pub async fn calculate_efficiency_request(
        &self,
        request: &CalculateEfficiencyRequest,
    ) -> EfficiencyResult<EfficiencyCalculation> {
        request.validate()?;
        self.calculate_efficiency(&request.building_id, &request.measure_name, &request.periods)
            .await
    }

    /// Uncached lookup by identity.
    pub async fn get_calculation(&self, id: &str) -> EfficiencyResult<Option<EfficiencyCalculation>> {
        Ok(self.repository.get_by_id(id).await?)
    }

    pub async fn get_building_calculations(
        &self,
        building_id: &str,
    ) -> EfficiencyResult<Vec<EfficiencyCalculation>> {
        let key = self.keys.building_calculations(building_id);
        if let Some(cached) = self.read_cached(&key).await {
            return Ok(cached);
        }

        let calculations = self.repository.get_by_building(building_id).await?;
        self.write_cached(&key, &calculations).await;
        Ok(calculations)
    }

    pub async fn get_building_calculations_by_period(
        &self,
        building_id: &str,
        period: &str,
    ) -> EfficiencyResult<Vec<EfficiencyCalculation>> {
        let key = self.keys.building_period(building_id, period);
        if let Some(cached) = self.read_cached(&key).await {
            return Ok(cached);
        }

        let calculations = self
            .repository
            .get_by_building_and_period(building_id, period)
            .await?;
        self.write_cached(&key, &calculations).await;
        Ok(calculations)
    }

    /// `Ok(None)` when the building has no calculations. Absence is not cached.
    pub async fn get_building_summary(
        &self,
        building_id: &str,
    ) -> EfficiencyResult<Option<BuildingEfficiencySummary>> {
        let key = self.keys.building_summary(building_id);
        if let Some(cached) = self.read_cached(&key).await {
            return Ok(Some(cached));
        }

        let summary = self.repository.get_building_summary(building_id).await?;
        if let Some(summary) = &summary {
            self.write_cached(&key, summary).await;
        }
        Ok(summary)
    }

    pub async fn get_latest_calculation(
        &self,
        building_id: &str,
    ) -> EfficiencyResult<Option<EfficiencyCalculation>> {
        let key = self.keys.latest_calculation(building_id);
        if let Some(cached) = self.read_cached(&key).await {
            return Ok(Some(cached));
        }

        let latest = self.repository.get_latest(building_id).await?;
        if let Some(calculation) = &latest {
            self.write_cached(&key, calculation).await;
        }
        Ok(latest)
    }

    /// Uncached page over all buildings; `limit` is capped at the configured
    /// maximum page size.
    pub async fn list_building_summaries(
        &self,
        skip: usize,
        limit: usize,
    ) -> EfficiencyResult<BuildingSummaryPage> {
        let limit = limit.min(self.max_page_size);
        Ok(self.repository.list_building_summaries(skip, limit).await?)
    }

    /// Drop cached reads for one building, or the whole namespace when
    /// `building_id` is `None`. Failures are logged per target and never
    /// stop the remaining deletions.
    pub async fn clear_cache(&self, building_id: Option<&str>) -> Invalidation {
        let targets = match building_id {
            Some(building_id) => {
                let mut targets: Vec<Target> = self
                    .keys
                    .building_keys(building_id)
                    .into_iter()
                    .map(Target::Key)
                    .collect();
                targets.push(Target::Pattern(self.keys.building_period_pattern(building_id)));
                targets
            }
            None => vec![Target::Pattern(self.keys.namespace_pattern())],
        };

        let results = join_all(targets.iter().map(|target| async move {
            match target {
                Target::Key(key) => self.cache.delete(key).await.map_err(|e| (key, e)),
                Target::Pattern(pattern) => self
                    .cache
                    .delete_by_pattern(pattern)
                    .await
                    .map(|removed| debug!(pattern = %pattern, removed, "pattern invalidated"))
                    .map_err(|e| (pattern, e)),
            }
        }))
        .await;

        let mut failed = 0;
        for (target, e) in results.into_iter().filter_map(Result::err) {
            failed += 1;
            Counters::bump(&self.counters.cache_errors);
            warn!(cache_target = %target, error = %e, "cache invalidation failed");
        }

        info!(
            building_id = building_id.unwrap_or("*"),
            attempted = targets.len(),
            failed,
            "efficiency cache cleared"
        );
        Invalidation {
            attempted: targets.len(),
            failed,
        }
    }

    /// Decoded cache entry, or `None` on a miss, a cache error or an
    /// undecodable payload.
    async fn read_cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.cache.get(key).await {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => {
                Counters::bump(&self.counters.misses);
                debug!(cache_key = key, "cache miss");
                return None;
            }
            Err(e) => {
                Counters::bump(&self.counters.misses);
                Counters::bump(&self.counters.cache_errors);
                warn!(cache_key = key, error = %e, "cache read failed, using store");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                Counters::bump(&self.counters.hits);
                debug!(cache_key = key, "cache hit");
                Some(value)
            }
            Err(e) => {
                Counters::bump(&self.counters.misses);
                Counters::bump(&self.counters.decode_failures);
                error!(cache_key = key, error = %e, "cached payload could not be decoded, using store");
                None
            }
        }
    }

    /// Best-effort population after a store read.
    async fn write_cached<T: Serialize + Sync + ?Sized>(&self, key: &str, value: &T) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                Counters::bump(&self.counters.cache_errors);
                error!(cache_key = key, error = %e, "failed to encode cache payload");
                return;
            }
        };

        if let Err(e) = self.cache.set(key, &payload, self.ttl_seconds).await {
            Counters::bump(&self.counters.cache_errors);
            warn!(cache_key = key, error = %e, "failed to populate cache");
        }
    }
}
