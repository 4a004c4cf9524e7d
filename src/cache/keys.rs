/// Namespace shared by every efficiency cache entry.
pub const DEFAULT_KEY_PREFIX: &str = "efficiency";

/// Lifetime of a read-through entry. Writes never refresh cached reads, so
/// this is also the staleness bound after a write.
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;

/// Builds the cache keys for each read shape.
///
/// With the default prefix the keys are
/// `efficiency:building_calculations:{building}`,
/// `efficiency:building_period:{building}:{period}`,
/// `efficiency:building_summary:{building}` and
/// `efficiency:latest_calculation:{building}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeys {
    prefix: String,
}

impl Default for CacheKeys {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX)
    }
}

impl CacheKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn building_calculations(&self, building_id: &str) -> String {
        format!("{}:building_calculations:{}", self.prefix, building_id)
    }

    pub fn building_period(&self, building_id: &str, period: &str) -> String {
        format!("{}:building_period:{}:{}", self.prefix, building_id, period)
    }

    pub fn building_summary(&self, building_id: &str) -> String {
        format!("{}:building_summary:{}", self.prefix, building_id)
    }

    pub fn latest_calculation(&self, building_id: &str) -> String {
        format!("{}:latest_calculation:{}", self.prefix, building_id)
    }

    /// Matches every period-filtered entry of one building.
    pub fn building_period_pattern(&self, building_id: &str) -> String {
        format!("{}:building_period:{}:*", self.prefix, building_id)
    }

    /// Matches the whole namespace.
    pub fn namespace_pattern(&self) -> String {
        format!("{}:*", self.prefix)
    }

    /// Exact keys owned by one building (period variants excluded).
    pub fn building_keys(&self, building_id: &str) -> [String; 3] {
        [
            self.building_calculations(building_id),
            self.building_summary(building_id),
            self.latest_calculation(building_id),
        ]
    }
}
