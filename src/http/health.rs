use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;
use tracing::warn;

use super::AppState;
use crate::health::CACHE_DEGRADED_AFTER;

/// Health check handler
pub(super) async fn health_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    let (cache_check, store_ok) = tokio::join!(
        state.cache.gateway().health_check(),
        state.debates.store_healthy(),
    );
    let cache_ok = match cache_check {
        Ok(()) => true,
        Err(e) => {
            warn!("Cache health check failed: {}", e);
            false
        }
    };

    let cache_errors = *state.health.cache_error_count.read().await;
    let last_cache_error = *state.health.last_cache_error.read().await;
    let generations = *state.health.generation_count.read().await;
    let last_generation = *state.health.last_generation.read().await;

    // The cache only costs latency; the store is required.
    let status = if !store_ok {
        "unhealthy"
    } else if !cache_ok || cache_errors > CACHE_DEGRADED_AFTER {
        "degraded"
    } else {
        "ok"
    };
    let http_status = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(json!({
            "service": "matchday-debates",
            "version": env!("CARGO_PKG_VERSION"),
            "status": status,
            "checks": {
                "cache": if cache_ok { "ok" } else { "unavailable" },
                "database": if store_ok { "ok" } else { "unavailable" },
            },
            "started_at": state.health.started_at.to_rfc3339(),
            "consecutive_cache_errors": cache_errors,
            "last_cache_error": last_cache_error.map(|t| t.to_rfc3339()),
            "generations": generations,
            "last_generation": last_generation.map(|t| t.to_rfc3339()),
        })),
    )
}
