//! Cache-through reads of football data, headlines and fan sentiment.
//!
//! Every read checks the cache first; on a miss it fetches from the
//! provider, picks the TTL from the freshness policy based on the status of
//! what was fetched, and stores the result. Cache trouble only costs
//! latency: [`BestEffortCache`] turns it into a miss.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{keys, BestEffortCache};
use crate::error::{ServiceError, ServiceResult};
use crate::freshness::{FreshnessPolicy, MatchStatus};
use crate::providers::{
    Fixture, FootballProvider, League, LeagueTable, MatchStats, NewsProvider, SocialProvider,
    Squad,
};
use crate::reconcile::{reconcile_team, MatchLineup};
use crate::sentiment::{self, MatchSentiment, TeamSentiment};

#[derive(Clone)]
pub struct FeedService {
    football: Arc<dyn FootballProvider>,
    news: Arc<dyn NewsProvider>,
    social: Option<Arc<dyn SocialProvider>>,
    cache: BestEffortCache,
    policy: FreshnessPolicy,
    headline_cap: usize,
}

/// Which per-match resources are currently cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchCacheStatus {
    pub fixture: bool,
    pub lineup: bool,
    pub statistics: bool,
}

fn validate_season(season: i32) -> ServiceResult<()> {
    if !(1900..=2100).contains(&season) {
        return Err(ServiceError::validation(format!(
            "season must be a four-digit year, got {season}"
        )));
    }
    Ok(())
}

/// `YYYY-MM-DD`, strictly: zero-padded and a real calendar date.
fn validate_date(date: &str) -> ServiceResult<()> {
    let date = date.trim();
    if date.is_empty() {
        return Err(ServiceError::validation("date is required"));
    }
    if date.len() != 10 || NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
        return Err(ServiceError::validation(format!(
            "date must be formatted YYYY-MM-DD, got '{date}'"
        )));
    }
    Ok(())
}

impl FeedService {
    pub fn new(
        football: Arc<dyn FootballProvider>,
        news: Arc<dyn NewsProvider>,
        cache: BestEffortCache,
        policy: FreshnessPolicy,
        headline_cap: usize,
    ) -> Self {
        Self {
            football,
            news,
            social: None,
            cache,
            policy,
            headline_cap,
        }
    }

    /// Enable fan sentiment. Without a social provider, sentiment is always `None`.
    pub fn with_social(mut self, social: Arc<dyn SocialProvider>) -> Self {
        self.social = Some(social);
        self
    }

    pub fn policy(&self) -> &FreshnessPolicy {
        &self.policy
    }

    /// All fixtures on a date. One live fixture keeps the whole list short-lived.
    pub async fn fixtures(&self, date: &str) -> ServiceResult<Vec<Fixture>> {
        validate_date(date)?;
        let date = date.trim();
        let key = keys::fixtures_by_date(date);
        if let Some(cached) = self.cache.lookup::<Vec<Fixture>>(&key).await {
            return Ok(cached);
        }

        let fixtures = self
            .football
            .fixtures_by_date(date)
            .await
            .map_err(ServiceError::Upstream)?;

        let ttl = self
            .policy
            .ttl_for_collection(fixtures.iter().map(|f| &f.status));
        self.cache.store(&key, &fixtures, ttl).await;
        Ok(fixtures)
    }

    pub async fn fixture(&self, match_id: i64) -> ServiceResult<Fixture> {
        let key = keys::fixture(match_id);
        if let Some(cached) = self.cache.lookup::<Fixture>(&key).await {
            return Ok(cached);
        }

        let fixture = self
            .football
            .fixture(match_id)
            .await
            .map_err(ServiceError::Upstream)?
            .ok_or_else(|| ServiceError::not_found("match", match_id))?;

        self.cache
            .store(&key, &fixture, self.policy.ttl_for(&fixture.status))
            .await;
        Ok(fixture)
    }

    /// A team's roster, cached by team so every match involving the team shares it.
    pub async fn squad(&self, team_id: i64) -> ServiceResult<Squad> {
        let key = keys::squad(team_id);
        if let Some(cached) = self.cache.lookup::<Squad>(&key).await {
            return Ok(cached);
        }

        let squad = self
            .football
            .squad(team_id)
            .await
            .map_err(ServiceError::Upstream)?;
        self.cache.store(&key, &squad, self.policy.squad_ttl()).await;
        Ok(squad)
    }

    /// Status used to pick the TTL of per-match data. An unavailable fixture
    /// yields an unrecognized status, hence the default TTL.
    async fn status_for_ttl(&self, match_id: i64) -> MatchStatus {
        match self.fixture(match_id).await {
            Ok(fixture) => fixture.status,
            Err(e) => {
                warn!("Fixture status unavailable for match {}: {}", match_id, e);
                MatchStatus::Unknown(String::new())
            }
        }
    }

    async fn roster_or_empty(&self, team_id: i64) -> Squad {
        match self.squad(team_id).await {
            Ok(squad) => squad,
            Err(e) => {
                warn!("Squad unavailable for team {}, lineup will carry no photos: {}", team_id, e);
                Squad {
                    team_id,
                    ..Squad::default()
                }
            }
        }
    }

    /// Both lineups with squad photos merged in. `Ok(None)` until the
    /// provider has published lineups for both teams; that state is not cached.
    pub async fn lineup(&self, match_id: i64) -> ServiceResult<Option<MatchLineup>> {
        let key = keys::lineup(match_id);
        if let Some(cached) = self.cache.lookup::<MatchLineup>(&key).await {
            return Ok(Some(cached));
        }

        let mut teams = self
            .football
            .lineups(match_id)
            .await
            .map_err(ServiceError::Upstream)?;
        if teams.len() < 2 {
            info!(
                "Lineup for match {} not yet published ({} team entries)",
                match_id,
                teams.len()
            );
            return Ok(None);
        }
        if teams.len() > 2 {
            warn!(
                "Lineup for match {} has {} team entries, using the first two",
                match_id,
                teams.len()
            );
            teams.truncate(2);
        }
        let away = teams.remove(1);
        let home = teams.remove(0);

        let (home_squad, away_squad, status) = tokio::join!(
            self.roster_or_empty(home.team_id),
            self.roster_or_empty(away.team_id),
            self.status_for_ttl(match_id),
        );

        let merged = MatchLineup {
            home: reconcile_team(&home, &home_squad.players),
            away: reconcile_team(&away, &away_squad.players),
        };
        let with_photos = [&merged.home, &merged.away]
            .iter()
            .flat_map(|t| t.starters.iter().chain(t.substitutes.iter()))
            .filter(|p| p.photo.is_some())
            .count();
        debug!("Reconciled lineup for match {}: {} players with photos", match_id, with_photos);

        self.cache
            .store(&key, &merged, self.policy.ttl_for(&status))
            .await;
        Ok(Some(merged))
    }

    /// Box-score statistics. `Ok(None)` while fewer than two teams are reported.
    pub async fn statistics(&self, match_id: i64) -> ServiceResult<Option<MatchStats>> {
        let key = keys::statistics(match_id);
        if let Some(cached) = self.cache.lookup::<MatchStats>(&key).await {
            return Ok(Some(cached));
        }

        let mut teams = self
            .football
            .statistics(match_id)
            .await
            .map_err(ServiceError::Upstream)?;
        if teams.len() < 2 {
            debug!("Statistics for match {} not available yet", match_id);
            return Ok(None);
        }
        teams.truncate(2);
        let away = teams.remove(1);
        let home = teams.remove(0);
        let stats = MatchStats { home, away };

        let status = self.status_for_ttl(match_id).await;
        self.cache
            .store(&key, &stats, self.policy.ttl_for(&status))
            .await;
        Ok(Some(stats))
    }

    /// Headlines about either team and the matchup, capped. Each search is
    /// best-effort; if every search fails the result is empty and not cached.
    pub async fn headlines(&self, home: &str, away: &str) -> Vec<String> {
        let key = keys::headlines(home, away);
        if let Some(cached) = self.cache.lookup::<Vec<String>>(&key).await {
            return cached;
        }

        let matchup = format!("{home} vs {away}");
        let (home_news, away_news, matchup_news) = tokio::join!(
            self.news.search_headlines(home),
            self.news.search_headlines(away),
            self.news.search_headlines(&matchup),
        );

        let mut headlines = Vec::new();
        let mut any_succeeded = false;
        for (query, result) in [
            (home, home_news),
            (away, away_news),
            (matchup.as_str(), matchup_news),
        ] {
            match result {
                Ok(found) => {
                    any_succeeded = true;
                    headlines.extend(found);
                }
                Err(e) => warn!("News search for '{}' failed: {:#}", query, e),
            }
        }
        headlines.truncate(self.headline_cap);

        if any_succeeded {
            self.cache
                .store(&key, &headlines, self.policy.news_ttl())
                .await;
        }
        headlines
    }

    /// Sentiment for one team. Failures and empty samples are `None` and not cached.
    async fn team_sentiment(
        &self,
        social: &dyn SocialProvider,
        team: &str,
    ) -> Option<TeamSentiment> {
        let key = keys::sentiment(team);
        if let Some(cached) = self.cache.lookup::<TeamSentiment>(&key).await {
            return Some(cached);
        }

        let posts = match social.recent_posts(team).await {
            Ok(posts) => posts,
            Err(e) => {
                warn!("Social search for '{}' failed: {:#}", team, e);
                return None;
            }
        };
        let scored = sentiment::score(&posts)?;
        debug!("Sentiment for {}: {:.2} over {} posts", team, scored.score, scored.posts);
        self.cache
            .store(&key, &scored, self.policy.social_ttl())
            .await;
        Some(scored)
    }

    /// Fan sentiment for both teams. `None` when no social provider is
    /// configured or neither team could be scored.
    pub async fn sentiment(&self, home: &str, away: &str) -> Option<MatchSentiment> {
        let social = self.social.as_deref()?;
        let (home, away) = tokio::join!(
            self.team_sentiment(social, home),
            self.team_sentiment(social, away),
        );
        if home.is_none() && away.is_none() {
            return None;
        }
        Some(MatchSentiment { home, away })
    }

    /// Competitions covered in `season`.
    pub async fn leagues(&self, season: i32) -> ServiceResult<Vec<League>> {
        validate_season(season)?;
        let key = keys::leagues(season);
        if let Some(cached) = self.cache.lookup::<Vec<League>>(&key).await {
            return Ok(cached);
        }

        let leagues = self
            .football
            .leagues(season)
            .await
            .map_err(ServiceError::Upstream)?;
        self.cache
            .store(&key, &leagues, self.policy.leagues_ttl())
            .await;
        Ok(leagues)
    }

    pub async fn standings(&self, league_id: i64, season: i32) -> ServiceResult<LeagueTable> {
        if league_id <= 0 {
            return Err(ServiceError::validation("league_id must be a positive integer"));
        }
        validate_season(season)?;
        let key = keys::standings(league_id, season);
        if let Some(cached) = self.cache.lookup::<LeagueTable>(&key).await {
            return Ok(cached);
        }

        let table = self
            .football
            .standings(league_id, season)
            .await
            .map_err(ServiceError::Upstream)?
            .ok_or_else(|| {
                ServiceError::not_found("standings", format!("league {league_id} season {season}"))
            })?;
        self.cache
            .store(&key, &table, self.policy.standings_ttl())
            .await;
        Ok(table)
    }

    pub async fn cache_status(&self, match_id: i64) -> MatchCacheStatus {
        let fixture_key = keys::fixture(match_id);
        let lineup_key = keys::lineup(match_id);
        let statistics_key = keys::statistics(match_id);
        let (fixture, lineup, statistics) = tokio::join!(
            self.cache.contains(&fixture_key),
            self.cache.contains(&lineup_key),
            self.cache.contains(&statistics_key),
        );
        MatchCacheStatus {
            fixture,
            lineup,
            statistics,
        }
    }

    /// Drop every cached resource for one match (fixture, lineup, statistics).
    pub async fn invalidate_match(&self, match_id: i64) -> u64 {
        let removed = self.cache.invalidate(&keys::match_scope(match_id)).await;
        info!("Invalidated {} cached entries for match {}", removed, match_id);
        removed
    }
}
