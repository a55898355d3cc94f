#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use matchday_debates::cache::memory::MemoryCache;
use matchday_debates::cache::BestEffortCache;
use matchday_debates::debate::DebateService;
use matchday_debates::feed::FeedService;
use matchday_debates::freshness::{FreshnessPolicy, MatchStatus};
use matchday_debates::health::HealthState;
use matchday_debates::providers::football::{Score, TeamRef};
use matchday_debates::providers::{
    ContentGenerator, Fixture, FootballProvider, GeneratedCard, GeneratedDebate, GeneratorError,
    League, LeagueTable, NewsProvider, SocialPost, SocialProvider, Squad, TeamStats,
};
use matchday_debates::reconcile::{LineupPlayer, RosterPlayer, TeamLineup};
use matchday_debates::store::memory::MemoryStore;

pub const HOME_ID: i64 = 42;
pub const AWAY_ID: i64 = 49;

pub fn fixture(id: i64, status: &str) -> Fixture {
    Fixture {
        id,
        kickoff: None,
        status: MatchStatus::from_code(status),
        elapsed: None,
        venue: Some("Emirates Stadium".to_string()),
        league: Some("Premier League".to_string()),
        season: Some(2024),
        home: TeamRef { id: HOME_ID, name: "Arsenal".to_string(), logo: None },
        away: TeamRef { id: AWAY_ID, name: "Chelsea".to_string(), logo: None },
        goals: Score { home: Some(2), away: Some(1) },
    }
}

pub fn lineup_player(id: i64, name: &str, number: u32, position: &str) -> LineupPlayer {
    LineupPlayer {
        id,
        name: name.to_string(),
        number,
        position: position.to_string(),
        grid: None,
    }
}

pub fn roster_player(id: i64, name: &str, number: u32) -> RosterPlayer {
    RosterPlayer {
        id,
        name: name.to_string(),
        number,
        position: "Midfielder".to_string(),
        photo: format!("https://media.example/players/{id}.png"),
    }
}

pub fn team_lineup(team_id: i64, team_name: &str, starters: Vec<LineupPlayer>) -> TeamLineup {
    TeamLineup {
        team_id,
        team_name: team_name.to_string(),
        formation: Some("4-3-3".to_string()),
        starters,
        substitutes: Vec::new(),
    }
}

#[derive(Default)]
pub struct FakeFootball {
    pub fixtures: Mutex<HashMap<i64, Fixture>>,
    pub lineups: Mutex<HashMap<i64, Vec<TeamLineup>>>,
    pub squads: Mutex<HashMap<i64, Squad>>,
    pub stats: Mutex<HashMap<i64, Vec<TeamStats>>>,
    pub leagues: Mutex<Vec<League>>,
    pub tables: Mutex<HashMap<(i64, i32), LeagueTable>>,
    pub fixture_calls: AtomicUsize,
    pub date_calls: AtomicUsize,
    pub lineup_calls: AtomicUsize,
    pub squad_calls: AtomicUsize,
    pub league_calls: AtomicUsize,
    pub standings_calls: AtomicUsize,
}

impl FakeFootball {
    pub fn add_fixture(&self, fixture: Fixture) {
        self.fixtures.lock().unwrap().insert(fixture.id, fixture);
    }

    pub fn set_lineups(&self, match_id: i64, teams: Vec<TeamLineup>) {
        self.lineups.lock().unwrap().insert(match_id, teams);
    }

    pub fn add_squad(&self, team_id: i64, players: Vec<RosterPlayer>) {
        self.squads.lock().unwrap().insert(
            team_id,
            Squad {
                team_id,
                team_name: format!("team {team_id}"),
                players,
            },
        );
    }

    pub fn set_stats(&self, match_id: i64, stats: Vec<TeamStats>) {
        self.stats.lock().unwrap().insert(match_id, stats);
    }

    pub fn add_league(&self, league: League) {
        self.leagues.lock().unwrap().push(league);
    }

    pub fn add_table(&self, table: LeagueTable) {
        self.tables
            .lock()
            .unwrap()
            .insert((table.league_id, table.season), table);
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FootballProvider for FakeFootball {
    async fn fixtures_by_date(&self, _date: &str) -> Result<Vec<Fixture>> {
        self.date_calls.fetch_add(1, Ordering::SeqCst);
        let mut all: Vec<Fixture> = self.fixtures.lock().unwrap().values().cloned().collect();
        all.sort_by_key(|f| f.id);
        Ok(all)
    }

    async fn fixture(&self, match_id: i64) -> Result<Option<Fixture>> {
        self.fixture_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.fixtures.lock().unwrap().get(&match_id).cloned())
    }

    async fn lineups(&self, match_id: i64) -> Result<Vec<TeamLineup>> {
        self.lineup_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .lineups
            .lock()
            .unwrap()
            .get(&match_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn squad(&self, team_id: i64) -> Result<Squad> {
        self.squad_calls.fetch_add(1, Ordering::SeqCst);
        self.squads
            .lock()
            .unwrap()
            .get(&team_id)
            .cloned()
            .ok_or_else(|| anyhow!("squad {team_id} unavailable"))
    }

    async fn statistics(&self, match_id: i64) -> Result<Vec<TeamStats>> {
        Ok(self
            .stats
            .lock()
            .unwrap()
            .get(&match_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn leagues(&self, _season: i32) -> Result<Vec<League>> {
        self.league_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.leagues.lock().unwrap().clone())
    }

    async fn standings(&self, league_id: i64, season: i32) -> Result<Option<LeagueTable>> {
        self.standings_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.tables.lock().unwrap().get(&(league_id, season)).cloned())
    }
}

#[derive(Default)]
pub struct FakeNews {
    pub headlines: Mutex<HashMap<String, Vec<String>>>,
    pub failing: std::sync::atomic::AtomicBool,
    pub calls: AtomicUsize,
}

impl FakeNews {
    pub fn add(&self, query: &str, headlines: &[&str]) {
        self.headlines.lock().unwrap().insert(
            query.to_string(),
            headlines.iter().map(|h| h.to_string()).collect(),
        );
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl NewsProvider for FakeNews {
    async fn search_headlines(&self, query: &str) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("news search unavailable"));
        }
        Ok(self
            .headlines
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeSocial {
    pub posts: Mutex<HashMap<String, Vec<SocialPost>>>,
    pub failing: std::sync::atomic::AtomicBool,
    pub calls: AtomicUsize,
}

impl FakeSocial {
    pub fn add(&self, team: &str, texts: &[&str]) {
        self.posts.lock().unwrap().insert(
            team.to_string(),
            texts
                .iter()
                .map(|text| SocialPost {
                    text: text.to_string(),
                    ..SocialPost::default()
                })
                .collect(),
        );
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl SocialProvider for FakeSocial {
    async fn recent_posts(&self, team: &str) -> Result<Vec<SocialPost>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("social search rate limited"));
        }
        Ok(self.posts.lock().unwrap().get(team).cloned().unwrap_or_default())
    }
}

pub enum Scripted {
    Content(GeneratedDebate),
    Malformed,
    Unreachable,
}

pub struct FakeGenerator {
    pub script: Mutex<Scripted>,
    pub calls: AtomicUsize,
    pub last_user_prompt: Mutex<Option<String>>,
}

pub fn generated(headline: &str, cards: &[(&str, &str)]) -> GeneratedDebate {
    GeneratedDebate {
        headline: headline.to_string(),
        description: "Fans are split.".to_string(),
        cards: cards
            .iter()
            .map(|(stance, title)| GeneratedCard {
                stance: stance.to_string(),
                title: title.to_string(),
                description: format!("{title}, and here is why."),
            })
            .collect(),
    }
}

impl Default for FakeGenerator {
    fn default() -> Self {
        Self {
            script: Mutex::new(Scripted::Content(generated(
                "Can Arsenal finally beat Chelsea's press?",
                &[
                    ("agree", "Yes, the midfield is ready"),
                    ("disagree", "No, Chelsea will overrun them"),
                    ("wildcard", "It ends in a late penalty"),
                ],
            ))),
            calls: AtomicUsize::new(0),
            last_user_prompt: Mutex::new(None),
        }
    }
}

impl FakeGenerator {
    pub fn script(&self, script: Scripted) {
        *self.script.lock().unwrap() = script;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentGenerator for FakeGenerator {
    async fn generate(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
    ) -> Result<GeneratedDebate, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_user_prompt.lock().unwrap() = Some(user_prompt.to_string());
        // Give concurrent callers a chance to interleave.
        tokio::task::yield_now().await;
        match &*self.script.lock().unwrap() {
            Scripted::Content(content) => Ok(content.clone()),
            Scripted::Malformed => {
                Err(GeneratorError::Malformed("expected value at line 1".into()))
            }
            Scripted::Unreachable => Err(GeneratorError::Request(anyhow!("connection refused"))),
        }
    }
}

pub struct Harness {
    pub football: Arc<FakeFootball>,
    pub news: Arc<FakeNews>,
    pub social: Arc<FakeSocial>,
    pub generator: Arc<FakeGenerator>,
    pub cache: Arc<MemoryCache>,
    pub store: Arc<MemoryStore>,
    pub health: HealthState,
    pub policy: FreshnessPolicy,
    pub feed: FeedService,
    pub debates: DebateService,
}

impl Harness {
    pub fn new() -> Self {
        let football = Arc::new(FakeFootball::default());
        let news = Arc::new(FakeNews::default());
        let social = Arc::new(FakeSocial::default());
        let generator = Arc::new(FakeGenerator::default());
        let cache = Arc::new(MemoryCache::new());
        let store = Arc::new(MemoryStore::new());
        let health = HealthState::new();
        let policy = FreshnessPolicy::default();

        let football_dyn: Arc<dyn FootballProvider> = football.clone();
        let news_dyn: Arc<dyn NewsProvider> = news.clone();
        let social_dyn: Arc<dyn SocialProvider> = social.clone();
        let feed = FeedService::new(
            football_dyn,
            news_dyn,
            BestEffortCache::new(cache.clone(), health.clone()),
            policy,
            5,
        )
        .with_social(social_dyn);
        let debates = DebateService::new(
            store.clone(),
            feed.clone(),
            generator.clone(),
            health.clone(),
        );

        Self {
            football,
            news,
            social,
            generator,
            cache,
            store,
            health,
            policy,
            feed,
            debates,
        }
    }
}
