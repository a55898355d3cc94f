//! Process health counters surfaced by `GET /health`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// Consecutive cache failures after which the service reports itself degraded.
pub const CACHE_DEGRADED_AFTER: usize = 5;

/// Service health state
#[derive(Clone)]
pub struct HealthState {
    pub started_at: DateTime<Utc>,
    pub last_cache_error: Arc<RwLock<Option<DateTime<Utc>>>>,
    pub cache_error_count: Arc<RwLock<usize>>,
    pub last_generation: Arc<RwLock<Option<DateTime<Utc>>>>,
    pub generation_count: Arc<RwLock<usize>>,
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            last_cache_error: Arc::new(RwLock::new(None)),
            cache_error_count: Arc::new(RwLock::new(0)),
            last_generation: Arc::new(RwLock::new(None)),
            generation_count: Arc::new(RwLock::new(0)),
        }
    }

    pub async fn record_cache_success(&self) {
        if *self.cache_error_count.read().await > 0 {
            *self.cache_error_count.write().await = 0;
        }
    }

    pub async fn record_cache_error(&self) {
        *self.last_cache_error.write().await = Some(Utc::now());
        *self.cache_error_count.write().await += 1;
    }

    pub async fn record_generation(&self) {
        *self.last_generation.write().await = Some(Utc::now());
        *self.generation_count.write().await += 1;
    }

    pub async fn cache_degraded(&self) -> bool {
        *self.cache_error_count.read().await > CACHE_DEGRADED_AFTER
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}
