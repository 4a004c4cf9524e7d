use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::cache::{CacheStore, InMemoryCache, NoopCache};
use crate::config::{CacheBackend, Config, RepositoryBackend};
use crate::efficiency::EfficiencyService;
use crate::repo::{EfficiencyRepository, InMemoryEfficiencyRepository};

#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub service: Arc<EfficiencyService>,
}

impl AppState {
    pub async fn new(cfg: Config) -> Result<Self> {
        let repository = build_repository(&cfg).await?;

        let cache: Arc<dyn CacheStore> = match cfg.cache.backend {
            CacheBackend::Memory => Arc::new(InMemoryCache::new()),
            CacheBackend::None => Arc::new(NoopCache),
        };

        let service = EfficiencyService::new(repository, cache)
            .with_ttl(cfg.cache.ttl_seconds)
            .with_key_prefix(cfg.cache.key_prefix.clone())
            .with_max_page_size(cfg.listing.max_limit);

        info!(
            repository = ?cfg.repository.backend,
            cache = ?cfg.cache.backend,
            ttl_seconds = cfg.cache.ttl_seconds,
            "efficiency service ready"
        );

        Ok(Self {
            cfg,
            service: Arc::new(service),
        })
    }
}

async fn build_repository(cfg: &Config) -> Result<Arc<dyn EfficiencyRepository>> {
    match cfg.repository.backend {
        RepositoryBackend::Memory => Ok(Arc::new(InMemoryEfficiencyRepository::new())),
        #[cfg(feature = "db")]
        RepositoryBackend::Postgres => {
            let repo =
                crate::repo::PgEfficiencyRepository::connect(&cfg.db.url, cfg.db.max_connections)
                    .await?;
            repo.ensure_schema().await?;
            Ok(Arc::new(repo))
        }
        #[cfg(not(feature = "db"))]
        RepositoryBackend::Postgres => {
            anyhow::bail!("repository backend `postgres` requires building with the `db` feature")
        }
    }
}
