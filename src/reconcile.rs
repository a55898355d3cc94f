//! Player identity reconciliation between the lineup feed and the squad feed.
//!
//! The lineup feed is authoritative for who played where (position, grid
//! slot, starting status) but carries no photos. The squad feed carries
//! photos but knows nothing about a given match. Both are keyed by provider
//! player id, except that the lineup feed sometimes omits ids (new signings),
//! so the match falls back to names and shirt numbers.

use serde::{Deserialize, Serialize};

use crate::normalize::normalize_name;

/// Minimum substring-overlap ratio for a fuzzy name match to be accepted.
pub const FUZZY_MATCH_THRESHOLD: f32 = 0.7;

/// A player as listed in a fixture lineup. `id == 0` and `number == 0` mean unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineupPlayer {
    pub id: i64,
    pub name: String,
    pub number: u32,
    pub position: String,
    pub grid: Option<String>,
}

/// A player as listed in a team's squad roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterPlayer {
    pub id: i64,
    pub name: String,
    pub number: u32,
    pub position: String,
    pub photo: String,
}

/// Merged player: lineup fields verbatim, photo from the matched roster entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: i64,
    pub name: String,
    pub number: u32,
    #[serde(rename = "pos")]
    pub position: String,
    pub grid: Option<String>,
    pub photo: Option<String>,
}

/// One team's entry in the lineup feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamLineup {
    pub team_id: i64,
    pub team_name: String,
    pub formation: Option<String>,
    pub starters: Vec<LineupPlayer>,
    pub substitutes: Vec<LineupPlayer>,
}

/// One team's reconciled lineup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSheet {
    pub team_id: i64,
    pub team_name: String,
    pub formation: Option<String>,
    pub starters: Vec<PlayerRecord>,
    pub substitutes: Vec<PlayerRecord>,
}

/// Both reconciled lineups for a match, in feed order (home first).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchLineup {
    pub home: TeamSheet,
    pub away: TeamSheet,
}

/// Find the roster entry that best corresponds to `target`.
///
/// Priority: provider id, then (in a single roster scan) exact normalized
/// name or shirt number, whichever entry comes first, then the best fuzzy
/// substring overlap above [`FUZZY_MATCH_THRESHOLD`].
pub fn find_roster_match<'a>(
    target: &LineupPlayer,
    roster: &'a [RosterPlayer],
) -> Option<&'a RosterPlayer> {
    if target.id != 0 {
        if let Some(hit) = roster.iter().find(|p| p.id == target.id) {
            return Some(hit);
        }
    }

    let wanted = normalize_name(&target.name);
    let mut best: Option<&RosterPlayer> = None;
    let mut best_similarity: f32 = 0.0;

    for candidate in roster {
        let name = normalize_name(&candidate.name);

        if !wanted.is_empty() && name == wanted {
            return Some(candidate);
        }

        // An empty target name would divide by zero; it can only match by id or number.
        if !wanted.is_empty() && (name.contains(&wanted) || wanted.contains(&name)) {
            let similarity = name.chars().count() as f32 / wanted.chars().count() as f32;
            if similarity > best_similarity {
                best_similarity = similarity;
                best = Some(candidate);
            }
        }

        if target.number != 0 && candidate.number == target.number {
            return Some(candidate);
        }
    }

    if best_similarity > FUZZY_MATCH_THRESHOLD {
        best
    } else {
        None
    }
}

/// Merge a lineup entry with its roster match. Only the photo comes from the roster.
pub fn reconcile(target: &LineupPlayer, roster: &[RosterPlayer]) -> PlayerRecord {
    let photo = find_roster_match(target, roster)
        .map(|p| p.photo.trim())
        .filter(|photo| !photo.is_empty())
        .map(str::to_string);

    PlayerRecord {
        id: target.id,
        name: target.name.clone(),
        number: target.number,
        position: target.position.clone(),
        grid: target.grid.clone(),
        photo,
    }
}

/// Reconcile every starter and substitute of one team against its squad.
pub fn reconcile_team(lineup: &TeamLineup, roster: &[RosterPlayer]) -> TeamSheet {
    TeamSheet {
        team_id: lineup.team_id,
        team_name: lineup.team_name.clone(),
        formation: lineup.formation.clone(),
        starters: lineup.starters.iter().map(|p| reconcile(p, roster)).collect(),
        substitutes: lineup
            .substitutes
            .iter()
            .map(|p| reconcile(p, roster))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lineup(id: i64, name: &str, number: u32) -> LineupPlayer {
        LineupPlayer {
            id,
            name: name.to_string(),
            number,
            position: "F".to_string(),
            grid: Some("4:1".to_string()),
        }
    }

    fn roster(id: i64, name: &str, number: u32, photo: &str) -> RosterPlayer {
        RosterPlayer {
            id,
            name: name.to_string(),
            number,
            position: "Attacker".to_string(),
            photo: photo.to_string(),
        }
    }

    #[test]
    fn id_match_wins_over_name_mismatch() {
        let squad = vec![
            roster(3, "A. Smith", 0, "wrong.jpg"),
            roster(7, "Alan Smith", 0, "p.jpg"),
        ];
        let merged = reconcile(&lineup(7, "A. Smith", 0), &squad);
        assert_eq!(merged.photo.as_deref(), Some("p.jpg"));
    }

    #[test]
    fn shirt_number_corroborates_when_id_missing() {
        let squad = vec![roster(1, "Alan Smith", 9, "p.jpg")];
        let merged = reconcile(&lineup(0, "A. Smith", 9), &squad);
        assert_eq!(merged.photo.as_deref(), Some("p.jpg"));
    }

    #[test]
    fn unknown_id_falls_through_to_name() {
        let squad = vec![roster(1, "Olivier Giroud", 9, "og.jpg")];
        let merged = reconcile(&lineup(99, "olivier giroud", 0), &squad);
        assert_eq!(merged.photo.as_deref(), Some("og.jpg"));
    }

    #[test]
    fn exact_normalized_name_match() {
        let squad = vec![
            roster(1, "Jordan Henderson", 14, "jh.jpg"),
            roster(2, "O. Giroud", 9, "og.jpg"),
        ];
        let merged = reconcile(&lineup(0, "o giroud", 0), &squad);
        assert_eq!(merged.photo.as_deref(), Some("og.jpg"));
    }

    #[test]
    fn earlier_number_match_precedes_later_exact_name() {
        let squad = vec![
            roster(1, "Someone Else", 10, "number.jpg"),
            roster(2, "Bukayo Saka", 7, "name.jpg"),
        ];
        let merged = reconcile(&lineup(0, "Bukayo Saka", 10), &squad);
        assert_eq!(merged.photo.as_deref(), Some("number.jpg"));
    }

    #[test]
    fn fuzzy_substring_above_threshold() {
        // "saka" is contained in "bukayo saka": 11 / 4 > 0.7
        let squad = vec![roster(1, "Bukayo Saka", 7, "saka.jpg")];
        let merged = reconcile(&lineup(0, "Saka", 0), &squad);
        assert_eq!(merged.photo.as_deref(), Some("saka.jpg"));
    }

    #[test]
    fn fuzzy_substring_below_threshold_is_rejected() {
        // "son" is contained in "heungmin son": 3 / 12 < 0.7
        let squad = vec![roster(1, "Son", 0, "son.jpg")];
        let merged = reconcile(&lineup(0, "Heung-Min Son", 0), &squad);
        assert_eq!(merged.photo, None);
    }

    #[test]
    fn fuzzy_keeps_highest_similarity() {
        let squad = vec![
            roster(1, "Silva", 0, "silva.jpg"),
            roster(2, "Bernardo Silva", 0, "bernardo.jpg"),
        ];
        let merged = reconcile(&lineup(0, "Bernardo M. Silva", 0), &squad);
        // Only "silva" overlaps (5/16), which is under the threshold.
        assert_eq!(merged.photo, None);

        let merged = reconcile(&lineup(0, "B Silva", 0), &squad);
        // "silva" is in "b silva" (5/7), "bernardo silva" is not a superstring of "b silva".
        assert_eq!(merged.photo.as_deref(), Some("silva.jpg"));
    }

    #[test]
    fn no_similar_name_means_no_photo() {
        let squad = vec![
            roster(1, "Alan Smith", 9, "p.jpg"),
            roster(2, "John Doe", 4, "d.jpg"),
        ];
        let merged = reconcile(&lineup(0, "Xyz Unknown", 0), &squad);
        assert_eq!(merged.photo, None);
    }

    #[test]
    fn empty_target_name_does_not_panic() {
        let squad = vec![roster(1, "Alan Smith", 9, "p.jpg"), roster(2, "", 4, "e.jpg")];
        assert_eq!(reconcile(&lineup(0, "", 0), &squad).photo, None);
        assert_eq!(
            reconcile(&lineup(0, "", 4), &squad).photo.as_deref(),
            Some("e.jpg")
        );
    }

    #[test]
    fn lineup_fields_are_kept_verbatim() {
        let squad = vec![RosterPlayer {
            id: 7,
            name: "Alan Smith".to_string(),
            number: 11,
            position: "Midfielder".to_string(),
            photo: "p.jpg".to_string(),
        }];
        let target = lineup(7, "A. Smith", 9);
        let merged = reconcile(&target, &squad);

        assert_eq!(merged.id, 7);
        assert_eq!(merged.name, "A. Smith");
        assert_eq!(merged.number, 9);
        assert_eq!(merged.position, "F");
        assert_eq!(merged.grid.as_deref(), Some("4:1"));
    }

    #[test]
    fn blank_roster_photo_is_not_attached() {
        let squad = vec![roster(7, "Alan Smith", 9, "  ")];
        assert_eq!(reconcile(&lineup(7, "Alan Smith", 9), &squad).photo, None);
    }

    #[test]
    fn reconcile_team_covers_starters_and_substitutes() {
        let team = TeamLineup {
            team_id: 42,
            team_name: "Arsenal".to_string(),
            formation: Some("4-3-3".to_string()),
            starters: vec![lineup(7, "B. Saka", 7)],
            substitutes: vec![LineupPlayer {
                grid: None,
                ..lineup(0, "Trossard", 19)
            }],
        };
        let squad = vec![
            roster(7, "Bukayo Saka", 7, "saka.jpg"),
            roster(19, "Leandro Trossard", 19, "trossard.jpg"),
        ];

        let sheet = reconcile_team(&team, &squad);
        assert_eq!(sheet.team_id, 42);
        assert_eq!(sheet.starters[0].photo.as_deref(), Some("saka.jpg"));
        assert_eq!(sheet.substitutes[0].photo.as_deref(), Some("trossard.jpg"));
        assert_eq!(sheet.substitutes[0].grid, None);
    }
}
