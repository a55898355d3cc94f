//! Cache gateway: the only place cached sports data is read, written and expired.
//!
//! [`CacheGateway`] is the raw capability (Redis in production, an in-memory
//! map in tests). [`BestEffortCache`] wraps it with the calling contract the
//! rest of the crate relies on: a cache failure is logged and treated as a
//! miss, never surfaced to the caller.

pub mod memory;
pub mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::health::HealthState;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("cache payload could not be (de)serialized: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Raw key-value capability with per-entry expiry.
#[async_trait]
pub trait CacheGateway: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Delete every key matching a glob pattern (`*`, `?`). Returns how many were removed.
    async fn invalidate_pattern(&self, pattern: &str) -> Result<u64, CacheError>;

    async fn health_check(&self) -> Result<(), CacheError>;
}

/// Typed read. `Ok(None)` is a miss.
pub async fn get_json<T: DeserializeOwned>(
    cache: &dyn CacheGateway,
    key: &str,
) -> Result<Option<T>, CacheError> {
    match cache.get_raw(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Typed write with an explicit TTL.
pub async fn set_json<T: Serialize + ?Sized>(
    cache: &dyn CacheGateway,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Result<(), CacheError> {
    let payload = serde_json::to_string(value)?;
    cache.set_raw(key, payload, ttl).await
}

/// Deterministic, resource-scoped cache keys.
///
/// Everything about one match lives under `match:<id>:` so it can be
/// invalidated as a unit; squads live under `team:<id>:` so one cached squad
/// serves every lineup that references the team.
pub mod keys {
    pub fn fixtures_by_date(date: &str) -> String {
        format!("fixtures:{date}")
    }

    pub fn fixture(match_id: i64) -> String {
        format!("match:{match_id}:fixture")
    }

    pub fn lineup(match_id: i64) -> String {
        format!("match:{match_id}:lineup")
    }

    pub fn statistics(match_id: i64) -> String {
        format!("match:{match_id}:stats")
    }

    pub fn match_scope(match_id: i64) -> String {
        format!("match:{match_id}:*")
    }

    pub fn squad(team_id: i64) -> String {
        format!("team:{team_id}:squad")
    }

    fn slug(name: &str) -> String {
        name.trim().to_lowercase().replace(' ', "_")
    }

    pub fn headlines(home: &str, away: &str) -> String {
        format!("news:{}:{}", slug(home), slug(away))
    }

    /// Keyed by team name: the social search is by name, not provider id.
    pub fn sentiment(team: &str) -> String {
        format!("social:{}:sentiment", slug(team))
    }

    pub fn leagues(season: i32) -> String {
        format!("leagues:{season}")
    }

    pub fn standings(league_id: i64, season: i32) -> String {
        format!("league:{league_id}:standings:{season}")
    }
}

/// Cache access with the "failure is a miss" contract applied.
#[derive(Clone)]
pub struct BestEffortCache {
    inner: Arc<dyn CacheGateway>,
    health: HealthState,
}

impl BestEffortCache {
    pub fn new(inner: Arc<dyn CacheGateway>, health: HealthState) -> Self {
        Self { inner, health }
    }

    pub fn gateway(&self) -> &Arc<dyn CacheGateway> {
        &self.inner
    }

    /// Read and decode `key`. Any error (including a payload that no longer
    /// decodes into `T`) is logged and reported as a miss.
    pub async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match get_json::<T>(self.inner.as_ref(), key).await {
            Ok(Some(value)) => {
                self.health.record_cache_success().await;
                debug!("Cache hit for key {}", key);
                Some(value)
            }
            Ok(None) => {
                self.health.record_cache_success().await;
                debug!("Cache miss for key {}", key);
                None
            }
            Err(e) => {
                self.health.record_cache_error().await;
                warn!("Cache read failed for key {}: {}", key, e);
                None
            }
        }
    }

    /// Store `value` under `key` for `ttl`. Failures are logged only.
    pub async fn store<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) {
        match set_json(self.inner.as_ref(), key, value, ttl).await {
            Ok(()) => {
                self.health.record_cache_success().await;
                debug!("Stored cache key {} with TTL {:?}", key, ttl);
            }
            Err(e) => {
                self.health.record_cache_error().await;
                warn!("Cache write failed for key {}: {}", key, e);
            }
        }
    }

    /// Whether `key` is currently cached. An unreachable cache reports `false`.
    pub async fn contains(&self, key: &str) -> bool {
        match self.inner.exists(key).await {
            Ok(found) => {
                self.health.record_cache_success().await;
                found
            }
            Err(e) => {
                self.health.record_cache_error().await;
                warn!("Cache existence check failed for key {}: {}", key, e);
                false
            }
        }
    }

    /// Remove every key matching `pattern`. Returns 0 when the cache is unreachable.
    pub async fn invalidate(&self, pattern: &str) -> u64 {
        match self.inner.invalidate_pattern(pattern).await {
            Ok(removed) => {
                self.health.record_cache_success().await;
                debug!("Invalidated {} cache keys matching {}", removed, pattern);
                removed
            }
            Err(e) => {
                self.health.record_cache_error().await;
                warn!("Cache invalidation failed for pattern {}: {}", pattern, e);
                0
            }
        }
    }
}

/// Glob match supporting `*` (any run) and `?` (one char), as Redis `SCAN MATCH` does.
pub(crate) fn glob_matches(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut star_ti = 0usize;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            star_ti = ti;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            star_ti += 1;
            ti = star_ti;
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryCache;
    use super::*;
    use tokio_test::assert_ok;

    #[test]
    fn glob() {
        assert!(glob_matches("match:42:*", "match:42:lineup"));
        assert!(glob_matches("match:42:*", "match:42:"));
        assert!(!glob_matches("match:42:*", "match:420:lineup"));
        assert!(!glob_matches("match:42:*", "team:42:squad"));
        assert!(glob_matches("fixtures:2024-0?-01", "fixtures:2024-05-01"));
        assert!(glob_matches("*", "anything"));
        assert!(!glob_matches("a*c", "abd"));
    }

    #[test]
    fn keys_are_scoped() {
        assert_eq!(keys::lineup(7), "match:7:lineup");
        assert_eq!(keys::squad(7), "team:7:squad");
        assert!(glob_matches(&keys::match_scope(7), &keys::fixture(7)));
        assert!(glob_matches(&keys::match_scope(7), &keys::statistics(7)));
        assert!(!glob_matches(&keys::match_scope(7), &keys::squad(7)));
        assert_eq!(
            keys::headlines(" Real Madrid", "Barcelona "),
            "news:real_madrid:barcelona"
        );
        assert_eq!(keys::sentiment("Real Madrid"), "social:real_madrid:sentiment");
        assert_eq!(keys::standings(39, 2024), "league:39:standings:2024");
    }

    #[tokio::test]
    async fn failures_degrade_to_misses() {
        let memory = Arc::new(MemoryCache::new());
        let health = HealthState::new();
        let cache = BestEffortCache::new(memory.clone(), health.clone());

        cache.store("k", &vec![1, 2, 3], Duration::from_secs(60)).await;
        assert_eq!(cache.lookup::<Vec<i32>>("k").await, Some(vec![1, 2, 3]));

        memory.set_failing(true);
        assert_eq!(cache.lookup::<Vec<i32>>("k").await, None);
        cache.store("k2", &1, Duration::from_secs(60)).await;
        assert_eq!(cache.invalidate("*").await, 0);
        assert_eq!(*health.cache_error_count.read().await, 3);

        memory.set_failing(false);
        assert_ok!(memory.health_check().await);
        assert_eq!(cache.lookup::<i32>("k2").await, None);
    }

    #[tokio::test]
    async fn contains_reports_false_when_unreachable() {
        let memory = Arc::new(MemoryCache::new());
        let health = HealthState::new();
        let cache = BestEffortCache::new(memory.clone(), health.clone());

        cache.store("k", &1, Duration::from_secs(60)).await;
        assert!(cache.contains("k").await);
        assert!(!cache.contains("missing").await);

        memory.set_failing(true);
        assert!(!cache.contains("k").await);
        assert_eq!(*health.cache_error_count.read().await, 1);
    }

    #[tokio::test]
    async fn undecodable_payload_is_a_miss() {
        let memory = Arc::new(MemoryCache::new());
        let cache = BestEffortCache::new(memory.clone(), HealthState::new());
        assert_ok!(
            memory
                .set_raw("k", "not json".to_string(), Duration::from_secs(60))
                .await
        );
        assert_eq!(cache.lookup::<Vec<String>>("k").await, None);
    }
}
