//! End-to-end behaviour of the efficiency service over the in-memory store
//! and cache adapters.

use anyhow::anyhow;
use async_trait::async_trait;
use building_efficiency_tracker::cache::{CacheStore, InMemoryCache, NoopCache};
use building_efficiency_tracker::domain::{
    BuildingEfficiencySummary, BuildingSummaryPage, CalculateEfficiencyRequest,
    EfficiencyCalculation, PerformanceGrade, PeriodInput,
};
use building_efficiency_tracker::efficiency::{EfficiencyService, Invalidation};
use building_efficiency_tracker::repo::{EfficiencyRepository, InMemoryEfficiencyRepository};
use building_efficiency_tracker::EfficiencyError;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

const EPS: f64 = 1e-6;

fn period(name: &str, baseline_electric: f64, current_electric: f64) -> PeriodInput {
    PeriodInput {
        period: name.to_string(),
        time_range: "08:00-18:00".to_string(),
        days: vec!["monday".to_string(), "tuesday".to_string()],
        current_electric_kwh: current_electric,
        current_gas_therms: 90.0,
        baseline_electric_kwh: baseline_electric,
        baseline_gas_therms: 100.0,
        electric_rate: 0.12,
        gas_rate: 1.5,
    }
}

fn service() -> (EfficiencyService, Arc<InMemoryCache>, Arc<InMemoryEfficiencyRepository>) {
    let repo = Arc::new(InMemoryEfficiencyRepository::new());
    let cache = Arc::new(InMemoryCache::new());
    let service = EfficiencyService::new(repo.clone(), cache.clone());
    (service, cache, repo)
}

#[tokio::test]
async fn test_calculate_and_read_back() {
    let (service, _, _) = service();

    let stored = service
        .calculate_efficiency("hq", "LED retrofit", &[period("business_hours", 1000.0, 800.0)])
        .await
        .unwrap();

    let metrics = &stored.periods[0];
    assert!((metrics.electric_savings_kwh - 200.0).abs() < EPS);
    assert!((metrics.gas_savings_therms - 10.0).abs() < EPS);
    assert!((metrics.total_cost_savings - 39.0).abs() < EPS);
    assert!((metrics.overall_efficiency_improvement - 19.0909).abs() < 1e-3);
    assert_eq!(stored.summary.performance_grade, PerformanceGrade::B);

    let summary = service.get_building_summary("hq").await.unwrap().unwrap();
    assert_eq!(summary.total_calculations, 1);
    assert_eq!(summary.best_performance_grade, PerformanceGrade::B);
    assert_eq!(summary.latest_calculation.as_ref().unwrap().id, stored.id);
    assert!((summary.total_cost_savings - 39.0).abs() < EPS);

    let by_id = service.get_calculation(stored.id.as_deref().unwrap()).await.unwrap();
    assert_eq!(by_id, Some(stored));
}

#[tokio::test]
async fn test_request_validation_guards_the_store() {
    let (service, _, repo) = service();

    let request = CalculateEfficiencyRequest {
        building_id: String::new(),
        measure_name: "LED retrofit".to_string(),
        periods: vec![period("weekend", 1000.0, 800.0)],
    };
    let err = service.calculate_efficiency_request(&request).await.unwrap_err();
    assert!(matches!(err, EfficiencyError::InvalidInput(_)));
    assert!(repo.is_empty().await);

    let request = CalculateEfficiencyRequest {
        building_id: "hq".to_string(),
        ..request
    };
    service.calculate_efficiency_request(&request).await.unwrap();
    assert_eq!(repo.len().await, 1);
}

#[tokio::test]
async fn test_cached_read_is_stale_until_cleared() {
    let (service, cache, _) = service();

    assert!(service.get_building_calculations("hq").await.unwrap().is_empty());
    assert!(cache.keys().contains(&"efficiency:building_calculations:hq".to_string()));

    service
        .calculate_efficiency("hq", "LED retrofit", &[period("weekend", 1000.0, 800.0)])
        .await
        .unwrap();

    // Writes do not invalidate; the empty list is served until cleared
    assert!(service.get_building_calculations("hq").await.unwrap().is_empty());

    let outcome = service.clear_cache(Some("hq")).await;
    assert_eq!(outcome, Invalidation { attempted: 4, failed: 0 });
    assert_eq!(service.get_building_calculations("hq").await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cached_read_refreshes_after_ttl() {
    let (service, _, _) = service();

    assert!(service.get_building_calculations("hq").await.unwrap().is_empty());
    service
        .calculate_efficiency("hq", "LED retrofit", &[period("weekend", 1000.0, 800.0)])
        .await
        .unwrap();

    tokio::time::advance(Duration::from_secs(299)).await;
    assert!(service.get_building_calculations("hq").await.unwrap().is_empty());

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(service.get_building_calculations("hq").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_hit_matches_miss() {
    let (service, _, _) = service();
    service
        .calculate_efficiency("hq", "LED retrofit", &[period("weekend", 1000.0, 800.0)])
        .await
        .unwrap();

    let miss = service.get_latest_calculation("hq").await.unwrap();
    let hit = service.get_latest_calculation("hq").await.unwrap();
    assert_eq!(miss, hit);

    let miss = service.get_building_calculations_by_period("hq", "weekend").await.unwrap();
    let hit = service.get_building_calculations_by_period("hq", "weekend").await.unwrap();
    assert_eq!(miss, hit);

    let stats = service.cache_stats();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 2);
}

#[tokio::test]
async fn test_cache_outage_is_transparent() {
    let (service, cache, _) = service();
    cache.set_available(false);

    let stored = service
        .calculate_efficiency("hq", "LED retrofit", &[period("weekend", 1000.0, 800.0)])
        .await
        .unwrap();

    assert_eq!(service.get_building_calculations("hq").await.unwrap().len(), 1);
    assert_eq!(
        service
            .get_building_calculations_by_period("hq", "weekend")
            .await
            .unwrap()
            .len(),
        1
    );
    assert_eq!(service.get_latest_calculation("hq").await.unwrap(), Some(stored));
    assert!(service.get_building_summary("hq").await.unwrap().is_some());
    assert_eq!(service.clear_cache(None).await.failed, 1);

    assert!(service.cache_stats().cache_errors >= 4);
}

#[tokio::test]
async fn test_corrupt_entry_is_replaced() {
    let (service, cache, _) = service();
    service
        .calculate_efficiency("hq", "LED retrofit", &[period("weekend", 1000.0, 800.0)])
        .await
        .unwrap();
    cache.insert_raw("efficiency:building_summary:hq", "{\"truncated\":", 300);

    let summary = service.get_building_summary("hq").await.unwrap().unwrap();
    assert_eq!(summary.total_calculations, 1);
    assert_eq!(service.cache_stats().decode_failures, 1);

    let cached = cache.get("efficiency:building_summary:hq").await.unwrap().unwrap();
    let decoded: BuildingEfficiencySummary = serde_json::from_str(&cached).unwrap();
    assert_eq!(decoded.total_calculations, 1);
}

#[tokio::test]
async fn test_noop_cache_always_reads_through() {
    let repo = Arc::new(InMemoryEfficiencyRepository::new());
    let service = EfficiencyService::new(repo, Arc::new(NoopCache));

    assert!(service.get_latest_calculation("hq").await.unwrap().is_none());
    service
        .calculate_efficiency("hq", "LED retrofit", &[period("weekend", 1000.0, 800.0)])
        .await
        .unwrap();
    assert!(service.get_latest_calculation("hq").await.unwrap().is_some());
    assert_eq!(service.cache_stats().hits, 0);
}

#[tokio::test]
async fn test_clear_all_empties_namespace_only() {
    let (service, cache, _) = service();
    service.get_building_calculations("hq").await.unwrap();
    service.get_building_calculations_by_period("annex", "weekend").await.unwrap();
    cache.insert_raw("sessions:abc", "x", 300);

    let outcome = service.clear_cache(None).await;
    assert_eq!(outcome, Invalidation { attempted: 1, failed: 0 });
    assert_eq!(cache.keys(), vec!["sessions:abc".to_string()]);
}

#[tokio::test]
async fn test_listing_pages_by_latest_activity() {
    let (service, _, _) = service();
    for building in ["alpha", "bravo", "charlie"] {
        service
            .calculate_efficiency(building, "LED retrofit", &[period("weekend", 1000.0, 800.0)])
            .await
            .unwrap();
    }
    // Newer activity moves alpha to the front
    service
        .calculate_efficiency("alpha", "Boiler upgrade", &[period("weekend", 1000.0, 900.0)])
        .await
        .unwrap();

    let page = service.list_building_summaries(0, 2).await.unwrap();
    assert_eq!(page.total_buildings, 3);
    let ids: Vec<_> = page.summaries.iter().map(|s| s.building_id.as_str()).collect();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], "alpha");
    assert_eq!(page.summaries[0].total_calculations, 2);

    let rest = service.list_building_summaries(2, 2).await.unwrap();
    assert_eq!(rest.summaries.len(), 1);
    assert!(service.list_building_summaries(5, 2).await.unwrap().summaries.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_get_distinct_ids() {
    let (service, _, repo) = service();
    let service = Arc::new(service);

    let mut tasks = JoinSet::new();
    for i in 0..16 {
        let service = service.clone();
        tasks.spawn(async move {
            let periods = vec![period("weekend", 1000.0 + f64::from(i), 800.0)];
            service.calculate_efficiency("hq", "LED retrofit", &periods).await
        });
    }

    let mut ids = HashSet::new();
    while let Some(joined) = tasks.join_next().await {
        let stored = joined.unwrap().unwrap();
        assert!(ids.insert(stored.id.unwrap()));
    }
    assert_eq!(ids.len(), 16);
    assert_eq!(repo.count_by_building("hq").await.unwrap(), 16);
}

struct UnreachableStore;

#[async_trait]
impl EfficiencyRepository for UnreachableStore {
    async fn create(&self, _: EfficiencyCalculation) -> anyhow::Result<EfficiencyCalculation> {
        Err(anyhow!("connection refused"))
    }

    async fn get_by_id(&self, _: &str) -> anyhow::Result<Option<EfficiencyCalculation>> {
        Err(anyhow!("connection refused"))
    }

    async fn get_by_building(&self, _: &str) -> anyhow::Result<Vec<EfficiencyCalculation>> {
        Err(anyhow!("connection refused"))
    }

    async fn get_by_building_and_period(
        &self,
        _: &str,
        _: &str,
    ) -> anyhow::Result<Vec<EfficiencyCalculation>> {
        Err(anyhow!("connection refused"))
    }

    async fn get_building_summary(&self, _: &str) -> anyhow::Result<Option<BuildingEfficiencySummary>> {
        Err(anyhow!("connection refused"))
    }

    async fn get_latest(&self, _: &str) -> anyhow::Result<Option<EfficiencyCalculation>> {
        Err(anyhow!("connection refused"))
    }

    async fn count_by_building(&self, _: &str) -> anyhow::Result<u64> {
        Err(anyhow!("connection refused"))
    }

    async fn list_building_summaries(&self, _: usize, _: usize) -> anyhow::Result<BuildingSummaryPage> {
        Err(anyhow!("connection refused"))
    }
}

#[tokio::test]
async fn test_store_failure_reaches_caller() {
    let cache = Arc::new(InMemoryCache::new());
    let service = EfficiencyService::new(Arc::new(UnreachableStore), cache.clone());

    let err = service.get_building_calculations("hq").await.unwrap_err();
    assert!(matches!(err, EfficiencyError::Store(_)));
    assert!(err.to_string().contains("connection refused"));

    assert!(service
        .calculate_efficiency("hq", "LED retrofit", &[period("weekend", 1000.0, 800.0)])
        .await
        .is_err());
    assert!(service.list_building_summaries(0, 10).await.is_err());

    // Nothing is cached for a failed read
    assert!(cache.is_empty());
}
