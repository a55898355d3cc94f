//! Fixture, lineup, squad, statistics, league and standings provider (API-Football v3).

pub mod wire;

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::{Quota, RateLimiter};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::FootballSettings;
use crate::freshness::MatchStatus;
use crate::reconcile::{RosterPlayer, TeamLineup};

use self::wire::v3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRef {
    pub id: i64,
    pub name: String,
    pub logo: Option<String>,
}

/// Goals so far; both `None` before kickoff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub home: Option<u32>,
    pub away: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: i64,
    pub kickoff: Option<DateTime<Utc>>,
    pub status: MatchStatus,
    pub elapsed: Option<u32>,
    pub venue: Option<String>,
    pub league: Option<String>,
    pub season: Option<i32>,
    pub home: TeamRef,
    pub away: TeamRef,
    pub goals: Score,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Squad {
    pub team_id: i64,
    pub team_name: String,
    pub players: Vec<RosterPlayer>,
}

/// Box-score figures for one team. Missing figures are 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamStats {
    pub team_id: i64,
    pub team_name: String,
    pub shots_on_goal: i64,
    pub total_shots: i64,
    pub possession: i64,
    pub fouls: i64,
    pub corners: i64,
    pub yellow_cards: i64,
    pub red_cards: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStats {
    pub home: TeamStats,
    pub away: TeamStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct League {
    pub id: i64,
    pub name: String,
    /// `League` or `Cup`.
    pub kind: Option<String>,
    pub country: Option<String>,
    pub logo: Option<String>,
}

/// One row of a league table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub rank: u32,
    pub team: TeamRef,
    pub points: i64,
    pub goal_difference: i64,
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub group: Option<String>,
    /// Recent results, most recent last, e.g. `WWDLW`.
    pub form: Option<String>,
    /// Qualification or relegation note for the position.
    pub description: Option<String>,
}

/// A league's standings for one season. Cup competitions carry one table per group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueTable {
    pub league_id: i64,
    pub league_name: String,
    pub season: i32,
    pub groups: Vec<Vec<Standing>>,
}

#[async_trait]
pub trait FootballProvider: Send + Sync {
    /// Every fixture on `date` (`YYYY-MM-DD`).
    async fn fixtures_by_date(&self, date: &str) -> Result<Vec<Fixture>>;

    async fn fixture(&self, match_id: i64) -> Result<Option<Fixture>>;

    /// Published lineups, normally two entries (home first). Empty before publication.
    async fn lineups(&self, match_id: i64) -> Result<Vec<TeamLineup>>;

    async fn squad(&self, team_id: i64) -> Result<Squad>;

    /// Per-team statistics, normally two entries (home first).
    async fn statistics(&self, match_id: i64) -> Result<Vec<TeamStats>>;

    /// Competitions covered in `season`.
    async fn leagues(&self, season: i32) -> Result<Vec<League>>;

    /// `None` when the provider has no table for the league and season.
    async fn standings(&self, league_id: i64, season: i32) -> Result<Option<LeagueTable>>;
}

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// HTTP client for API-Football via RapidAPI.
pub struct ApiFootballClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    rate_limiter: DirectRateLimiter,
}

impl ApiFootballClient {
    pub fn new(settings: &FootballSettings, timeout: Duration) -> Result<Self> {
        let per_minute = NonZeroU32::new(settings.requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .pool_max_idle_per_host(5)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            rate_limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
        })
    }

    /// One rate-limited GET against a v3 endpoint, returning the `response` array.
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<Vec<T>> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .header("x-rapidapi-key", &self.api_key)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {what}"))?;

        if let Some(remaining) = response.headers().get("x-ratelimit-requests-remaining") {
            debug!(
                "API-Football requests remaining: {}",
                remaining.to_str().unwrap_or("?")
            );
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "API-Football error fetching {} (status {}): {}",
                what,
                status,
                body
            ));
        }

        let envelope: v3::Envelope<T> =
            serde_json::from_str(&body).with_context(|| format!("Failed to parse {what}"))?;
        if envelope.has_errors() {
            return Err(anyhow!(
                "API-Football reported errors fetching {}: {}",
                what,
                envelope.errors
            ));
        }
        Ok(envelope.response)
    }
}

#[async_trait]
impl FootballProvider for ApiFootballClient {
    async fn fixtures_by_date(&self, date: &str) -> Result<Vec<Fixture>> {
        let items: Vec<v3::FixtureItem> = self
            .get("fixtures", &[("date", date.to_string())], "fixtures")
            .await?;
        info!("Fetched {} fixtures for {}", items.len(), date);
        Ok(items.into_iter().map(Fixture::from).collect())
    }

    async fn fixture(&self, match_id: i64) -> Result<Option<Fixture>> {
        let items: Vec<v3::FixtureItem> = self
            .get("fixtures", &[("id", match_id.to_string())], "fixture")
            .await?;
        Ok(items.into_iter().next().map(Fixture::from))
    }

    async fn lineups(&self, match_id: i64) -> Result<Vec<TeamLineup>> {
        let items: Vec<v3::LineupItem> = self
            .get(
                "fixtures/lineups",
                &[("fixture", match_id.to_string())],
                "lineups",
            )
            .await?;
        Ok(items.into_iter().map(TeamLineup::from).collect())
    }

    async fn squad(&self, team_id: i64) -> Result<Squad> {
        let items: Vec<v3::SquadItem> = self
            .get("players/squads", &[("team", team_id.to_string())], "squad")
            .await?;
        Ok(wire::squad_from(team_id, items))
    }

    async fn statistics(&self, match_id: i64) -> Result<Vec<TeamStats>> {
        let items: Vec<v3::StatisticsItem> = self
            .get(
                "fixtures/statistics",
                &[("fixture", match_id.to_string())],
                "statistics",
            )
            .await?;
        Ok(items.into_iter().map(TeamStats::from).collect())
    }

    async fn leagues(&self, season: i32) -> Result<Vec<League>> {
        let items: Vec<v3::LeagueItem> = self
            .get("leagues", &[("season", season.to_string())], "leagues")
            .await?;
        info!("Fetched {} leagues for season {}", items.len(), season);
        Ok(items.into_iter().map(League::from).collect())
    }

    async fn standings(&self, league_id: i64, season: i32) -> Result<Option<LeagueTable>> {
        let items: Vec<v3::StandingsItem> = self
            .get(
                "standings",
                &[("league", league_id.to_string()), ("season", season.to_string())],
                "standings",
            )
            .await?;
        Ok(items.into_iter().next().map(LeagueTable::from))
    }
}
