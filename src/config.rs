use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::cache::{DEFAULT_CACHE_TTL_SECONDS, DEFAULT_KEY_PREFIX};
use crate::efficiency::DEFAULT_MAX_PAGE_SIZE;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub cache: CacheConfig,
    pub repository: RepositoryConfig,
    pub db: DbConfig,
    pub listing: ListingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub ttl_seconds: u64,
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub backend: RepositoryBackend,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self { backend: RepositoryBackend::Memory }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/efficiency".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_limit: 100,
            max_limit: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl Config {
    /// Defaults, then `config/default.toml` when present, then `BET__`
    /// environment variables (`BET__CACHE__TTL_SECONDS=60`).
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::figment(Toml::file("config/default.toml")).extract().map_err(Into::into)
    }

    fn figment(file: impl figment::Provider) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(file)
            .merge(Env::prefixed("BET__").split("__"))
    }
}
