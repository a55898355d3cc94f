//! Thin HTTP surface over [`FeedService`] and [`DebateService`].

mod debates;
mod error;
mod extract;
mod futbol;
mod health;

use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use crate::cache::BestEffortCache;
use crate::debate::DebateService;
use crate::error::{parse_match_id, ServiceResult};
use crate::feed::FeedService;
use crate::health::HealthState;

#[derive(Clone)]
pub struct AppState {
    pub feed: FeedService,
    pub debates: DebateService,
    pub cache: BestEffortCache,
    pub health: HealthState,
}

/// `?match_id=` kept as a string so a bad value gets our validation error.
#[derive(Debug, Deserialize)]
pub(crate) struct MatchQuery {
    match_id: Option<String>,
}

impl MatchQuery {
    pub(crate) fn match_id(&self) -> ServiceResult<i64> {
        parse_match_id(self.match_id.as_deref().unwrap_or(""))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/futbol/matches", get(futbol::matches))
        .route("/futbol/lineup", get(futbol::lineup))
        .route("/futbol/leagues", get(futbol::leagues))
        .route("/futbol/standings", get(futbol::standings))
        .route(
            "/futbol/cache/:match_id",
            get(futbol::cache_status).delete(futbol::invalidate),
        )
        .route("/debates", post(debates::create))
        .route(
            "/debates/generate",
            post(debates::generate).get(debates::preview),
        )
        .route("/debates/match", get(debates::for_match))
        .route("/debates/top", get(debates::top))
        .route("/debates/cards", post(debates::create_card))
        .route(
            "/debates/votes",
            post(debates::cast_vote).delete(debates::remove_vote),
        )
        .route("/debates/comments", post(debates::add_comment))
        .route("/debates/:id", get(debates::get).delete(debates::delete))
        .route("/debates/:id/restore", post(debates::restore))
        .route("/debates/:id/comments", get(debates::comments))
        .with_state(state)
}
