use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{AppState, MatchQuery};
use crate::error::{parse_match_id, ServiceError, ServiceResult};
use crate::feed::MatchCacheStatus;
use crate::providers::{Fixture, League, LeagueTable};
use crate::reconcile::MatchLineup;

#[derive(Debug, Deserialize)]
pub(super) struct DateQuery {
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SeasonQuery {
    season: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct StandingsQuery {
    league_id: Option<String>,
    season: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct LeaguesResponse {
    season: i32,
    count: usize,
    leagues: Vec<League>,
}

#[derive(Debug, Serialize)]
pub(super) struct CacheStatusResponse {
    match_id: i64,
    cached: MatchCacheStatus,
}

/// Missing season means the current calendar year.
fn season_or_current(raw: Option<&str>) -> ServiceResult<i32> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(Utc::now().year()),
        Some(s) => s
            .parse()
            .map_err(|_| ServiceError::validation(format!("season must be a year, got '{s}'"))),
    }
}

#[derive(Debug, Serialize)]
pub(super) struct MatchesResponse {
    date: String,
    count: usize,
    matches: Vec<Fixture>,
}

#[derive(Debug, Serialize)]
pub(super) struct LineupResponse {
    match_id: i64,
    available: bool,
    lineup: Option<MatchLineup>,
}

/// GET /futbol/matches?date=YYYY-MM-DD
pub(super) async fn matches(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> ServiceResult<Json<MatchesResponse>> {
    let date = query.date.unwrap_or_default();
    let matches = state.feed.fixtures(&date).await?;
    Ok(Json(MatchesResponse {
        date: date.trim().to_string(),
        count: matches.len(),
        matches,
    }))
}

/// GET /futbol/lineup?match_id=
pub(super) async fn lineup(
    State(state): State<AppState>,
    Query(query): Query<MatchQuery>,
) -> ServiceResult<Json<LineupResponse>> {
    let match_id = query.match_id()?;
    let lineup = state.feed.lineup(match_id).await?;
    Ok(Json(LineupResponse {
        match_id,
        available: lineup.is_some(),
        lineup,
    }))
}

/// GET /futbol/leagues?season=
pub(super) async fn leagues(
    State(state): State<AppState>,
    Query(query): Query<SeasonQuery>,
) -> ServiceResult<Json<LeaguesResponse>> {
    let season = season_or_current(query.season.as_deref())?;
    let leagues = state.feed.leagues(season).await?;
    Ok(Json(LeaguesResponse {
        season,
        count: leagues.len(),
        leagues,
    }))
}

/// GET /futbol/standings?league_id=&season=
pub(super) async fn standings(
    State(state): State<AppState>,
    Query(query): Query<StandingsQuery>,
) -> ServiceResult<Json<LeagueTable>> {
    let raw = query.league_id.as_deref().map(str::trim).unwrap_or("");
    if raw.is_empty() {
        return Err(ServiceError::validation("league_id is required"));
    }
    let league_id: i64 = raw.parse().map_err(|_| {
        ServiceError::validation(format!("league_id must be an integer, got '{raw}'"))
    })?;
    let season = season_or_current(query.season.as_deref())?;
    Ok(Json(state.feed.standings(league_id, season).await?))
}

/// GET /futbol/cache/:match_id
pub(super) async fn cache_status(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> ServiceResult<Json<CacheStatusResponse>> {
    let match_id = parse_match_id(&match_id)?;
    let cached = state.feed.cache_status(match_id).await;
    Ok(Json(CacheStatusResponse { match_id, cached }))
}

/// DELETE /futbol/cache/:match_id
pub(super) async fn invalidate(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> ServiceResult<Json<serde_json::Value>> {
    let match_id = parse_match_id(&match_id)?;
    let removed = state.feed.invalidate_match(match_id).await;
    Ok(Json(json!({ "match_id": match_id, "removed": removed })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn season_defaults_to_this_year() {
        assert_eq!(season_or_current(None).unwrap(), Utc::now().year());
        assert_eq!(season_or_current(Some(" ")).unwrap(), Utc::now().year());
        assert_eq!(season_or_current(Some("2023")).unwrap(), 2023);
        assert!(season_or_current(Some("last")).is_err());
    }
}
