//! Prompt rendering for the content generator.

use std::fmt::Write as _;

use super::model::DebateType;
use crate::aggregate::MatchContext;
use crate::reconcile::TeamSheet;

const RESPONSE_SHAPE: &str = r#"Respond with a single JSON object of this shape:
{
  "headline": "a provocative, debatable headline",
  "description": "one or two sentences of context",
  "cards": [
    {"stance": "agree", "title": "...", "description": "..."},
    {"stance": "disagree", "title": "...", "description": "..."},
    {"stance": "wildcard", "title": "...", "description": "..."}
  ]
}
"stance" must be one of agree, disagree, wildcard. Return JSON only."#;

pub fn system_prompt(debate_type: DebateType) -> String {
    let framing = match debate_type {
        DebateType::PreMatch => {
            "You write football debate prompts for fans BEFORE a match. The match has not been \
             played: talk about selection, tactics, form, rivalries and predictions. Never mention \
             a result or a final score."
        }
        DebateType::PostMatch => {
            "You write football debate prompts for fans AFTER a match. The result is known: \
             talk about turning points, refereeing, individual performances, tactical changes \
             and what the result means."
        }
    };
    format!("{framing}\nKeep it provocative but respectful.\n\n{RESPONSE_SHAPE}")
}

fn starters(sheet: &TeamSheet) -> String {
    sheet
        .starters
        .iter()
        .map(|p| {
            if p.position.is_empty() {
                p.name.clone()
            } else {
                format!("{} ({})", p.name, p.position)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn user_prompt(debate_type: DebateType, context: &MatchContext) -> String {
    let fixture = &context.fixture;
    let mut out = String::new();

    let _ = writeln!(out, "Generate a {debate_type} debate for this match.\n");
    let _ = writeln!(out, "Match: {} vs {}", fixture.home.name, fixture.away.name);
    if let Some(kickoff) = fixture.kickoff {
        let _ = writeln!(out, "Kickoff: {}", kickoff.format("%Y-%m-%d %H:%M UTC"));
    }
    let _ = writeln!(out, "Status: {}", fixture.status);
    if let Some(venue) = &fixture.venue {
        let _ = writeln!(out, "Venue: {venue}");
    }
    if let Some(league) = &fixture.league {
        let _ = writeln!(out, "League: {league}");
    }
    if let Some(season) = fixture.season {
        let _ = writeln!(out, "Season: {season}");
    }

    if let Some(lineup) = &context.lineup {
        let _ = writeln!(out, "\nLINEUPS:");
        for sheet in [&lineup.home, &lineup.away] {
            let formation = sheet.formation.as_deref().unwrap_or("unknown formation");
            let _ = writeln!(out, "{} ({}): {}", sheet.team_name, formation, starters(sheet));
        }
    }

    if debate_type == DebateType::PostMatch {
        if let (Some(home), Some(away)) = (fixture.goals.home, fixture.goals.away) {
            let _ = writeln!(
                out,
                "\nFinal score: {} {}-{} {}",
                fixture.home.name, home, away, fixture.away.name
            );
        }
        if let Some(stats) = &context.stats {
            let (h, a) = (&stats.home, &stats.away);
            let _ = writeln!(out, "\nMATCH STATS (home-away):");
            let _ = writeln!(
                out,
                "Shots: {}-{} (on target {}-{})",
                h.total_shots, a.total_shots, h.shots_on_goal, a.shots_on_goal
            );
            let _ = writeln!(out, "Possession: {}%-{}%", h.possession, a.possession);
            let _ = writeln!(out, "Fouls: {}-{}", h.fouls, a.fouls);
            let _ = writeln!(out, "Corners: {}-{}", h.corners, a.corners);
            let _ = writeln!(
                out,
                "Cards: yellow {}-{}, red {}-{}",
                h.yellow_cards, a.yellow_cards, h.red_cards, a.red_cards
            );
        }
    }

    if !context.headlines.is_empty() {
        let _ = writeln!(out, "\nNEWS HEADLINES:");
        for headline in &context.headlines {
            let _ = writeln!(out, "- {headline}");
        }
    }

    if let Some(sentiment) = &context.sentiment {
        let _ = writeln!(out, "\nFAN SENTIMENT (-1 negative to +1 positive):");
        for (team, score) in [
            (&fixture.home.name, sentiment.home),
            (&fixture.away.name, sentiment.away),
        ] {
            if let Some(score) = score {
                let _ = writeln!(out, "{team}: {:+.2} from {} posts", score.score, score.posts);
            }
        }
        if let Some(overall) = sentiment.overall() {
            let _ = writeln!(out, "Overall: {overall:+.2}");
        }
    }

    if !context.top_topics.is_empty() {
        let _ = writeln!(out, "\nTOP TOPICS: {}", context.top_topics.join(", "));
    }

    out.push_str("\nGenerate a compelling debate from this information. Return only valid JSON.");
    out
}
