mod common;

use std::sync::atomic::Ordering;

use common::{
    fixture, lineup_player, roster_player, team_lineup, FakeFootball, Harness, AWAY_ID, HOME_ID,
};
use matchday_debates::cache::keys;
use matchday_debates::error::ServiceError;
use matchday_debates::freshness::MatchStatus;
use matchday_debates::providers::football::TeamRef;
use matchday_debates::providers::{League, LeagueTable, Standing, TeamStats};
use tokio_test::{assert_err, assert_ok};

const MATCH_ID: i64 = 1035037;

fn publish_lineups(h: &Harness, match_id: i64) {
    h.football.set_lineups(
        match_id,
        vec![
            team_lineup(
                HOME_ID,
                "Arsenal",
                vec![
                    lineup_player(1460, "B. Saka", 7, "M"),
                    // New signing: no provider id yet, matched by name.
                    lineup_player(0, "Martin Ødegaard", 8, "M"),
                ],
            ),
            team_lineup(AWAY_ID, "Chelsea", vec![lineup_player(0, "Unknown Trialist", 0, "F")]),
        ],
    );
    h.football.add_squad(
        HOME_ID,
        vec![roster_player(1460, "Bukayo Saka", 7), roster_player(37127, "Martin Odegaard", 8)],
    );
    h.football.add_squad(AWAY_ID, vec![roster_player(19545, "Reece James", 24)]);
}

#[tokio::test]
async fn lineup_is_reconciled_with_squad_photos() {
    let h = Harness::new();
    h.football.add_fixture(fixture(MATCH_ID, "NS"));
    publish_lineups(&h, MATCH_ID);

    let lineup = assert_ok!(h.feed.lineup(MATCH_ID).await).expect("lineup published");
    let saka = &lineup.home.starters[0];
    assert_eq!(saka.name, "B. Saka");
    assert_eq!(saka.photo.as_deref(), Some("https://media.example/players/1460.png"));
    let odegaard = &lineup.home.starters[1];
    assert_eq!(odegaard.photo.as_deref(), Some("https://media.example/players/37127.png"));
    assert_eq!(lineup.away.starters[0].photo, None);
    assert_eq!(lineup.home.formation.as_deref(), Some("4-3-3"));
}

#[tokio::test]
async fn lineup_ttl_follows_match_status() {
    let h = Harness::new();
    h.football.add_fixture(fixture(MATCH_ID, "1H"));
    h.football.add_fixture(fixture(MATCH_ID + 1, "FT"));
    publish_lineups(&h, MATCH_ID);
    publish_lineups(&h, MATCH_ID + 1);

    assert_ok!(h.feed.lineup(MATCH_ID).await);
    assert_ok!(h.feed.lineup(MATCH_ID + 1).await);

    assert_eq!(
        h.cache.ttl_of(&keys::lineup(MATCH_ID)),
        Some(h.policy.ttl_for(&MatchStatus::FirstHalf))
    );
    assert_eq!(
        h.cache.ttl_of(&keys::lineup(MATCH_ID + 1)),
        Some(h.policy.ttl_for(&MatchStatus::FullTime))
    );
}

#[tokio::test]
async fn cached_lineup_is_served_without_refetching() {
    let h = Harness::new();
    h.football.add_fixture(fixture(MATCH_ID, "NS"));
    publish_lineups(&h, MATCH_ID);

    let first = assert_ok!(h.feed.lineup(MATCH_ID).await);
    let second = assert_ok!(h.feed.lineup(MATCH_ID).await);
    assert_eq!(first, second);
    assert_eq!(FakeFootball::calls(&h.football.lineup_calls), 1);
}

#[tokio::test]
async fn squads_are_shared_across_matches() {
    let h = Harness::new();
    h.football.add_fixture(fixture(MATCH_ID, "NS"));
    h.football.add_fixture(fixture(MATCH_ID + 1, "NS"));
    publish_lineups(&h, MATCH_ID);
    publish_lineups(&h, MATCH_ID + 1);

    assert_ok!(h.feed.lineup(MATCH_ID).await);
    assert_ok!(h.feed.lineup(MATCH_ID + 1).await);

    // One fetch per team, not per match.
    assert_eq!(FakeFootball::calls(&h.football.squad_calls), 2);
    assert_eq!(
        h.cache.ttl_of(&keys::squad(HOME_ID)),
        Some(h.policy.squad_ttl())
    );
}

#[tokio::test]
async fn unpublished_lineup_is_none_and_not_cached() {
    let h = Harness::new();
    h.football.add_fixture(fixture(MATCH_ID, "NS"));
    h.football.set_lineups(MATCH_ID, vec![team_lineup(HOME_ID, "Arsenal", Vec::new())]);

    assert_eq!(assert_ok!(h.feed.lineup(MATCH_ID).await), None);
    assert_eq!(h.cache.ttl_of(&keys::lineup(MATCH_ID)), None);

    assert_eq!(assert_ok!(h.feed.lineup(MATCH_ID).await), None);
    assert_eq!(FakeFootball::calls(&h.football.lineup_calls), 2);
}

#[tokio::test]
async fn missing_squad_still_yields_a_lineup() {
    let h = Harness::new();
    h.football.add_fixture(fixture(MATCH_ID, "NS"));
    h.football.set_lineups(
        MATCH_ID,
        vec![
            team_lineup(HOME_ID, "Arsenal", vec![lineup_player(1460, "B. Saka", 7, "M")]),
            team_lineup(AWAY_ID, "Chelsea", vec![lineup_player(19545, "R. James", 24, "D")]),
        ],
    );

    let lineup = assert_ok!(h.feed.lineup(MATCH_ID).await).expect("lineup published");
    assert_eq!(lineup.home.starters[0].photo, None);
    assert_eq!(lineup.away.starters[0].name, "R. James");
}

#[tokio::test]
async fn reads_survive_a_dead_cache() {
    let h = Harness::new();
    h.football.add_fixture(fixture(MATCH_ID, "NS"));
    publish_lineups(&h, MATCH_ID);
    h.cache.set_failing(true);

    let lineup = assert_ok!(h.feed.lineup(MATCH_ID).await);
    assert!(lineup.is_some());
    let fixture = assert_ok!(h.feed.fixture(MATCH_ID).await);
    assert_eq!(fixture.home.name, "Arsenal");
    assert_eq!(h.cache.writes(), 0);
    assert!(*h.health.cache_error_count.read().await > 0);

    h.cache.set_failing(false);
    assert_ok!(h.feed.fixture(MATCH_ID).await);
    assert_eq!(*h.health.cache_error_count.read().await, 0);
}

#[tokio::test]
async fn fixture_list_ttl_is_the_shortest_member_ttl() {
    let h = Harness::new();
    h.football.add_fixture(fixture(1, "FT"));
    h.football.add_fixture(fixture(2, "2H"));
    h.football.add_fixture(fixture(3, "NS"));

    let fixtures = assert_ok!(h.feed.fixtures("2024-05-01").await);
    assert_eq!(fixtures.len(), 3);
    assert_eq!(
        h.cache.ttl_of(&keys::fixtures_by_date("2024-05-01")),
        Some(h.policy.ttl_for(&MatchStatus::SecondHalf))
    );

    assert_ok!(h.feed.fixtures("2024-05-01").await);
    assert_eq!(FakeFootball::calls(&h.football.date_calls), 1);

    let err = assert_err!(h.feed.fixtures("May 1st").await);
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn finished_fixture_lists_are_capped_at_the_default_ttl() {
    let h = Harness::new();
    h.football.add_fixture(fixture(1, "FT"));

    assert_ok!(h.feed.fixtures("2024-05-01").await);
    assert_eq!(
        h.cache.ttl_of(&keys::fixtures_by_date("2024-05-01")),
        Some(h.policy.config().default)
    );
}

#[tokio::test]
async fn invalidate_match_drops_only_that_match() {
    let h = Harness::new();
    h.football.add_fixture(fixture(MATCH_ID, "1H"));
    h.football.add_fixture(fixture(MATCH_ID + 1, "1H"));
    publish_lineups(&h, MATCH_ID);
    h.football.set_stats(
        MATCH_ID,
        vec![TeamStats::default(), TeamStats::default()],
    );

    assert_ok!(h.feed.lineup(MATCH_ID).await);
    assert!(assert_ok!(h.feed.statistics(MATCH_ID).await).is_some());
    assert_ok!(h.feed.fixture(MATCH_ID + 1).await);

    let removed = h.feed.invalidate_match(MATCH_ID).await;
    assert_eq!(removed, 3);
    assert_eq!(h.cache.ttl_of(&keys::lineup(MATCH_ID)), None);
    assert_eq!(h.cache.ttl_of(&keys::fixture(MATCH_ID)), None);
    assert!(h.cache.ttl_of(&keys::fixture(MATCH_ID + 1)).is_some());
    assert!(h.cache.ttl_of(&keys::squad(HOME_ID)).is_some());
}

#[tokio::test]
async fn headlines_are_capped_and_failures_not_cached() {
    let h = Harness::new();
    h.news.add("Arsenal", &["a1", "a2", "a3"]);
    h.news.add("Chelsea", &["c1", "c2"]);
    h.news.add("Arsenal vs Chelsea", &["m1"]);

    let headlines = h.feed.headlines("Arsenal", "Chelsea").await;
    assert_eq!(headlines, vec!["a1", "a2", "a3", "c1", "c2"]);
    assert_eq!(
        h.cache.ttl_of(&keys::headlines("Arsenal", "Chelsea")),
        Some(h.policy.news_ttl())
    );

    h.news.set_failing(true);
    assert!(h.feed.headlines("Spurs", "Everton").await.is_empty());
    assert_eq!(h.cache.ttl_of(&keys::headlines("Spurs", "Everton")), None);
    assert_eq!(h.news.calls.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn cache_status_reports_cached_match_resources() {
    let h = Harness::new();
    h.football.add_fixture(fixture(MATCH_ID, "NS"));
    publish_lineups(&h, MATCH_ID);

    let status = h.feed.cache_status(MATCH_ID).await;
    assert!(!status.fixture && !status.lineup && !status.statistics);

    assert_ok!(h.feed.lineup(MATCH_ID).await);
    let status = h.feed.cache_status(MATCH_ID).await;
    assert!(status.fixture);
    assert!(status.lineup);
    assert!(!status.statistics);

    h.cache.set_failing(true);
    let status = h.feed.cache_status(MATCH_ID).await;
    assert!(!status.fixture && !status.lineup);
}

#[tokio::test]
async fn leagues_are_cached_per_season() {
    let h = Harness::new();
    h.football.add_league(League {
        id: 39,
        name: "Premier League".to_string(),
        kind: Some("League".to_string()),
        country: Some("England".to_string()),
        logo: None,
    });

    let leagues = assert_ok!(h.feed.leagues(2024).await);
    assert_eq!(leagues[0].name, "Premier League");
    assert_ok!(h.feed.leagues(2024).await);
    assert_eq!(FakeFootball::calls(&h.football.league_calls), 1);
    assert_eq!(h.cache.ttl_of(&keys::leagues(2024)), Some(h.policy.leagues_ttl()));

    let err = assert_err!(h.feed.leagues(24).await);
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn standings_are_cached_and_missing_tables_are_not_found() {
    let h = Harness::new();
    h.football.add_table(LeagueTable {
        league_id: 39,
        league_name: "Premier League".to_string(),
        season: 2024,
        groups: vec![vec![Standing {
            rank: 1,
            team: TeamRef { id: HOME_ID, name: "Arsenal".to_string(), logo: None },
            points: 89,
            ..Standing::default()
        }]],
    });

    let table = assert_ok!(h.feed.standings(39, 2024).await);
    assert_eq!(table.groups[0][0].team.name, "Arsenal");
    assert_ok!(h.feed.standings(39, 2024).await);
    assert_eq!(FakeFootball::calls(&h.football.standings_calls), 1);
    assert_eq!(
        h.cache.ttl_of(&keys::standings(39, 2024)),
        Some(h.policy.standings_ttl())
    );

    let err = assert_err!(h.feed.standings(39, 2023).await);
    assert!(matches!(err, ServiceError::NotFound { entity: "standings", .. }));
    assert_eq!(h.cache.ttl_of(&keys::standings(39, 2023)), None);

    let err = assert_err!(h.feed.standings(0, 2024).await);
    assert!(matches!(err, ServiceError::Validation(_)));
}
