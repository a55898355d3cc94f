//! API-Football wire shapes, versioned, plus the mapping into core types.
//!
//! Only the fields the service reads are modelled. Every struct defaults
//! missing fields so that upstream additions and omissions do not break
//! decoding; shape churn stops here.

pub mod v3 {
    use chrono::{DateTime, Utc};
    use serde::Deserialize;

    /// Every v3 endpoint wraps its payload the same way.
    #[derive(Debug, Deserialize)]
    pub struct Envelope<T> {
        #[serde(default = "Vec::new")]
        pub response: Vec<T>,
        /// `[]` on success, an object or non-empty array of messages otherwise.
        #[serde(default)]
        pub errors: serde_json::Value,
    }

    impl<T> Envelope<T> {
        pub fn has_errors(&self) -> bool {
            match &self.errors {
                serde_json::Value::Array(items) => !items.is_empty(),
                serde_json::Value::Object(map) => !map.is_empty(),
                serde_json::Value::Null => false,
                _ => true,
            }
        }
    }

    #[derive(Debug, Deserialize, Clone, Default)]
    #[serde(default)]
    pub struct Team {
        pub id: i64,
        pub name: String,
        pub logo: Option<String>,
    }

    #[derive(Debug, Deserialize, Clone, Default)]
    #[serde(default)]
    pub struct FixtureItem {
        pub fixture: FixtureInfo,
        pub league: League,
        pub teams: Teams,
        pub goals: Goals,
    }

    #[derive(Debug, Deserialize, Clone, Default)]
    #[serde(default)]
    pub struct FixtureInfo {
        pub id: i64,
        pub date: Option<DateTime<Utc>>,
        pub venue: Venue,
        pub status: Status,
    }

    #[derive(Debug, Deserialize, Clone, Default)]
    #[serde(default)]
    pub struct Venue {
        pub name: Option<String>,
        pub city: Option<String>,
    }

    #[derive(Debug, Deserialize, Clone, Default)]
    #[serde(default)]
    pub struct Status {
        pub long: Option<String>,
        pub short: String,
        pub elapsed: Option<u32>,
    }

    #[derive(Debug, Deserialize, Clone, Default)]
    #[serde(default)]
    pub struct League {
        pub id: i64,
        pub name: Option<String>,
        pub season: Option<i32>,
        pub round: Option<String>,
    }

    #[derive(Debug, Deserialize, Clone, Default)]
    #[serde(default)]
    pub struct Teams {
        pub home: Team,
        pub away: Team,
    }

    #[derive(Debug, Deserialize, Clone, Default)]
    #[serde(default)]
    pub struct Goals {
        pub home: Option<u32>,
        pub away: Option<u32>,
    }

    #[derive(Debug, Deserialize, Clone, Default)]
    #[serde(default)]
    pub struct LineupItem {
        pub team: Team,
        pub formation: Option<String>,
        #[serde(rename = "startXI")]
        pub start_xi: Vec<PlayerSlot>,
        pub substitutes: Vec<PlayerSlot>,
    }

    #[derive(Debug, Deserialize, Clone, Default)]
    #[serde(default)]
    pub struct PlayerSlot {
        pub player: LineupPlayer,
    }

    /// Lineup entries: id and number are null for some players, grid is
    /// null for substitutes.
    #[derive(Debug, Deserialize, Clone, Default)]
    #[serde(default)]
    pub struct LineupPlayer {
        pub id: Option<i64>,
        pub name: Option<String>,
        pub number: Option<u32>,
        pub pos: Option<String>,
        pub grid: Option<String>,
    }

    #[derive(Debug, Deserialize, Clone, Default)]
    #[serde(default)]
    pub struct SquadItem {
        pub team: Team,
        pub players: Vec<SquadPlayer>,
    }

    #[derive(Debug, Deserialize, Clone, Default)]
    #[serde(default)]
    pub struct SquadPlayer {
        pub id: Option<i64>,
        pub name: Option<String>,
        pub number: Option<u32>,
        #[serde(alias = "pos")]
        pub position: Option<String>,
        pub photo: Option<String>,
    }

    #[derive(Debug, Deserialize, Clone, Default)]
    #[serde(default)]
    pub struct StatisticsItem {
        pub team: Team,
        pub statistics: Vec<StatEntry>,
    }

    /// `value` is a number, a percentage string such as `"55%"`, or null.
    #[derive(Debug, Deserialize, Clone, Default)]
    #[serde(default)]
    pub struct StatEntry {
        #[serde(rename = "type")]
        pub kind: String,
        pub value: serde_json::Value,
    }

    #[derive(Debug, Deserialize, Clone, Default)]
    #[serde(default)]
    pub struct LeagueItem {
        pub league: LeagueInfo,
        pub country: Country,
    }

    #[derive(Debug, Deserialize, Clone, Default)]
    #[serde(default)]
    pub struct LeagueInfo {
        pub id: i64,
        pub name: String,
        #[serde(rename = "type")]
        pub kind: Option<String>,
        pub logo: Option<String>,
    }

    #[derive(Debug, Deserialize, Clone, Default)]
    #[serde(default)]
    pub struct Country {
        pub name: Option<String>,
        pub code: Option<String>,
    }

    #[derive(Debug, Deserialize, Clone, Default)]
    #[serde(default)]
    pub struct StandingsItem {
        pub league: StandingsLeague,
    }

    /// `standings` is a list of groups; ordinary leagues have exactly one.
    #[derive(Debug, Deserialize, Clone, Default)]
    #[serde(default)]
    pub struct StandingsLeague {
        pub id: i64,
        pub name: String,
        pub season: i32,
        pub standings: Vec<Vec<StandingRow>>,
    }

    #[derive(Debug, Deserialize, Clone, Default)]
    #[serde(default)]
    pub struct StandingRow {
        pub rank: u32,
        pub team: Team,
        pub points: i64,
        #[serde(rename = "goalsDiff")]
        pub goals_diff: i64,
        pub group: Option<String>,
        pub form: Option<String>,
        pub description: Option<String>,
        pub all: Record,
    }

    #[derive(Debug, Deserialize, Clone, Default)]
    #[serde(default)]
    pub struct Record {
        pub played: u32,
        pub win: u32,
        pub draw: u32,
        pub lose: u32,
        pub goals: RecordGoals,
    }

    #[derive(Debug, Deserialize, Clone, Default)]
    #[serde(default)]
    pub struct RecordGoals {
        #[serde(rename = "for")]
        pub scored: u32,
        pub against: u32,
    }
}

use super::{Fixture, League, LeagueTable, Score, Squad, Standing, TeamRef, TeamStats};
use crate::freshness::MatchStatus;
use crate::reconcile::{LineupPlayer, RosterPlayer, TeamLineup};

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl From<v3::Team> for TeamRef {
    fn from(team: v3::Team) -> Self {
        Self {
            id: team.id,
            name: team.name,
            logo: non_empty(team.logo),
        }
    }
}

impl From<v3::FixtureItem> for Fixture {
    fn from(item: v3::FixtureItem) -> Self {
        Self {
            id: item.fixture.id,
            kickoff: item.fixture.date,
            status: MatchStatus::from_code(&item.fixture.status.short),
            elapsed: item.fixture.status.elapsed,
            venue: non_empty(item.fixture.venue.name),
            league: non_empty(item.league.name),
            season: item.league.season,
            home: item.teams.home.into(),
            away: item.teams.away.into(),
            goals: Score {
                home: item.goals.home,
                away: item.goals.away,
            },
        }
    }
}

impl From<v3::LineupPlayer> for LineupPlayer {
    fn from(player: v3::LineupPlayer) -> Self {
        Self {
            id: player.id.unwrap_or(0),
            name: player.name.unwrap_or_default(),
            number: player.number.unwrap_or(0),
            position: player.pos.unwrap_or_default(),
            grid: non_empty(player.grid),
        }
    }
}

impl From<v3::LineupItem> for TeamLineup {
    fn from(item: v3::LineupItem) -> Self {
        Self {
            team_id: item.team.id,
            team_name: item.team.name,
            formation: non_empty(item.formation),
            starters: item.start_xi.into_iter().map(|s| s.player.into()).collect(),
            substitutes: item
                .substitutes
                .into_iter()
                .map(|s| s.player.into())
                .collect(),
        }
    }
}

impl From<v3::SquadPlayer> for RosterPlayer {
    fn from(player: v3::SquadPlayer) -> Self {
        Self {
            id: player.id.unwrap_or(0),
            name: player.name.unwrap_or_default(),
            number: player.number.unwrap_or(0),
            position: player.position.unwrap_or_default(),
            photo: player.photo.unwrap_or_default(),
        }
    }
}

/// The squads endpoint answers with zero or one item per team.
pub fn squad_from(team_id: i64, items: Vec<v3::SquadItem>) -> Squad {
    match items.into_iter().next() {
        Some(item) => Squad {
            team_id: if item.team.id != 0 { item.team.id } else { team_id },
            team_name: item.team.name,
            players: item.players.into_iter().map(RosterPlayer::from).collect(),
        },
        None => Squad {
            team_id,
            ..Squad::default()
        },
    }
}

/// Numbers are truncated, `"55%"` becomes 55, null and anything else become 0.
pub fn stat_value(value: &serde_json::Value) -> i64 {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        serde_json::Value::String(s) => s
            .trim()
            .trim_end_matches('%')
            .trim()
            .parse::<f64>()
            .map(|f| f as i64)
            .unwrap_or(0),
        _ => 0,
    }
}

impl From<v3::StatisticsItem> for TeamStats {
    fn from(item: v3::StatisticsItem) -> Self {
        let get = |kind: &str| {
            item.statistics
                .iter()
                .find(|s| s.kind.eq_ignore_ascii_case(kind))
                .map(|s| stat_value(&s.value))
                .unwrap_or(0)
        };
        Self {
            team_id: item.team.id,
            team_name: item.team.name.clone(),
            shots_on_goal: get("Shots on Goal"),
            total_shots: get("Total Shots"),
            possession: get("Ball Possession"),
            fouls: get("Fouls"),
            corners: get("Corner Kicks"),
            yellow_cards: get("Yellow Cards"),
            red_cards: get("Red Cards"),
        }
    }
}

impl From<v3::LeagueItem> for League {
    fn from(item: v3::LeagueItem) -> Self {
        Self {
            id: item.league.id,
            name: item.league.name,
            kind: non_empty(item.league.kind),
            country: non_empty(item.country.name),
            logo: non_empty(item.league.logo),
        }
    }
}

impl From<v3::StandingRow> for Standing {
    fn from(row: v3::StandingRow) -> Self {
        Self {
            rank: row.rank,
            team: row.team.into(),
            points: row.points,
            goal_difference: row.goals_diff,
            played: row.all.played,
            won: row.all.win,
            drawn: row.all.draw,
            lost: row.all.lose,
            goals_for: row.all.goals.scored,
            goals_against: row.all.goals.against,
            group: non_empty(row.group),
            form: non_empty(row.form),
            description: non_empty(row.description),
        }
    }
}

impl From<v3::StandingsItem> for LeagueTable {
    fn from(item: v3::StandingsItem) -> Self {
        Self {
            league_id: item.league.id,
            league_name: item.league.name,
            season: item.league.season,
            groups: item
                .league
                .standings
                .into_iter()
                .map(|group| group.into_iter().map(Standing::from).collect())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fixture_maps_status_and_optional_score() {
        let body = json!({
            "errors": [],
            "response": [{
                "fixture": {
                    "id": 1035037,
                    "date": "2024-05-01T19:00:00+00:00",
                    "venue": {"name": "Emirates Stadium", "city": "London"},
                    "status": {"long": "Not Started", "short": "NS", "elapsed": null}
                },
                "league": {"id": 39, "name": "Premier League", "season": 2023},
                "teams": {
                    "home": {"id": 42, "name": "Arsenal", "logo": "a.png"},
                    "away": {"id": 49, "name": "Chelsea", "logo": ""}
                },
                "goals": {"home": null, "away": null}
            }]
        });
        let envelope: v3::Envelope<v3::FixtureItem> = serde_json::from_value(body).unwrap();
        assert!(!envelope.has_errors());
        let fixture: Fixture = envelope.response.into_iter().next().unwrap().into();

        assert_eq!(fixture.id, 1035037);
        assert_eq!(fixture.status, MatchStatus::NotStarted);
        assert_eq!(fixture.home.name, "Arsenal");
        assert_eq!(fixture.away.logo, None);
        assert_eq!(fixture.goals.home, None);
        assert!(fixture.kickoff.is_some());
    }

    #[test]
    fn unknown_status_is_preserved() {
        let item: v3::FixtureItem =
            serde_json::from_value(json!({"fixture": {"id": 1, "status": {"short": "XX"}}}))
                .unwrap();
        let fixture = Fixture::from(item);
        assert_eq!(fixture.status, MatchStatus::Unknown("XX".to_string()));
    }

    #[test]
    fn lineup_handles_null_ids_and_grids() {
        let item: v3::LineupItem = serde_json::from_value(json!({
            "team": {"id": 42, "name": "Arsenal"},
            "formation": "4-3-3",
            "startXI": [{"player": {"id": 1100, "name": "B. Saka", "number": 7, "pos": "F", "grid": "4:3"}}],
            "substitutes": [{"player": {"id": null, "name": "New Signing", "number": null, "pos": "M", "grid": null}}]
        }))
        .unwrap();
        let lineup = TeamLineup::from(item);

        assert_eq!(lineup.starters[0].grid.as_deref(), Some("4:3"));
        assert_eq!(lineup.substitutes[0].id, 0);
        assert_eq!(lineup.substitutes[0].number, 0);
        assert_eq!(lineup.substitutes[0].grid, None);
    }

    #[test]
    fn stat_values() {
        assert_eq!(stat_value(&json!(14)), 14);
        assert_eq!(stat_value(&json!("55%")), 55);
        assert_eq!(stat_value(&json!(null)), 0);
        assert_eq!(stat_value(&json!("n/a")), 0);
        assert_eq!(stat_value(&json!(1.9)), 1);
    }

    #[test]
    fn statistics_by_type() {
        let item: v3::StatisticsItem = serde_json::from_value(json!({
            "team": {"id": 42, "name": "Arsenal"},
            "statistics": [
                {"type": "Total Shots", "value": 17},
                {"type": "Ball Possession", "value": "61%"},
                {"type": "Red Cards", "value": null}
            ]
        }))
        .unwrap();
        let stats = TeamStats::from(item);
        assert_eq!(stats.total_shots, 17);
        assert_eq!(stats.possession, 61);
        assert_eq!(stats.red_cards, 0);
        assert_eq!(stats.fouls, 0);
    }

    #[test]
    fn error_envelope_is_detected() {
        let envelope: v3::Envelope<v3::FixtureItem> = serde_json::from_value(json!({
            "errors": {"token": "Error/Missing application key"},
            "response": []
        }))
        .unwrap();
        assert!(envelope.has_errors());
    }

    #[test]
    fn empty_squad_keeps_requested_team() {
        let squad = squad_from(42, Vec::new());
        assert_eq!(squad.team_id, 42);
        assert!(squad.players.is_empty());
    }

    #[test]
    fn league_country_and_blank_logo() {
        let item: v3::LeagueItem = serde_json::from_value(json!({
            "league": {"id": 39, "name": "Premier League", "type": "League", "logo": " "},
            "country": {"name": "England", "code": "GB"},
            "seasons": [{"year": 2024, "current": true}]
        }))
        .unwrap();
        let league = League::from(item);
        assert_eq!(league.id, 39);
        assert_eq!(league.kind.as_deref(), Some("League"));
        assert_eq!(league.country.as_deref(), Some("England"));
        assert_eq!(league.logo, None);
    }

    #[test]
    fn standings_keep_groups_and_records() {
        let item: v3::StandingsItem = serde_json::from_value(json!({
            "league": {
                "id": 39, "name": "Premier League", "season": 2024,
                "standings": [[
                    {"rank": 1, "team": {"id": 42, "name": "Arsenal"}, "points": 89,
                     "goalsDiff": 62, "group": "Premier League", "form": "WWWWW",
                     "description": "Promotion - Champions League (Group Stage)",
                     "all": {"played": 38, "win": 28, "draw": 5, "lose": 5,
                             "goals": {"for": 91, "against": 29}}},
                    {"rank": 2, "team": {"id": 49, "name": "Chelsea"}, "points": 63,
                     "goalsDiff": 14, "form": null, "all": {"played": 38}}
                ]]
            }
        }))
        .unwrap();
        let table = LeagueTable::from(item);
        assert_eq!(table.season, 2024);
        assert_eq!(table.groups.len(), 1);
        let leader = &table.groups[0][0];
        assert_eq!(leader.team.name, "Arsenal");
        assert_eq!((leader.won, leader.drawn, leader.lost), (28, 5, 5));
        assert_eq!((leader.goals_for, leader.goals_against), (91, 29));
        assert_eq!(table.groups[0][1].form, None);
        assert_eq!(table.groups[0][1].goals_for, 0);
    }
}
