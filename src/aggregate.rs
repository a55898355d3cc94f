//! Gathers everything known about a match into one [`MatchContext`].
//!
//! Every enrichment source is optional: a failure is logged and the context
//! is built from whatever did arrive.

use serde::Serialize;
use tracing::warn;

use crate::feed::FeedService;
use crate::freshness::MatchPhase;
use crate::providers::{Fixture, MatchStats};
use crate::reconcile::MatchLineup;
use crate::sentiment::MatchSentiment;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchContext {
    pub fixture: Fixture,
    pub lineup: Option<MatchLineup>,
    pub stats: Option<MatchStats>,
    pub headlines: Vec<String>,
    pub sentiment: Option<MatchSentiment>,
    pub top_topics: Vec<String>,
}

impl MatchContext {
    pub fn phase(&self) -> MatchPhase {
        self.fixture.status.phase()
    }
}

/// Talking points derived from the fixture alone.
pub fn top_topics(fixture: &Fixture) -> Vec<String> {
    vec![
        format!("{} performance", fixture.home.name),
        format!("{} performance", fixture.away.name),
        "match analysis".to_string(),
        "team tactics".to_string(),
    ]
}

/// Lineups are worth fetching until the match ends; statistics once it has started.
fn wants(phase: MatchPhase) -> (bool, bool) {
    match phase {
        MatchPhase::NotStarted => (true, false),
        MatchPhase::InProgress => (true, true),
        MatchPhase::Finished => (false, true),
        MatchPhase::Void | MatchPhase::Unrecognized => (false, false),
    }
}

pub async fn gather(feed: &FeedService, fixture: Fixture) -> MatchContext {
    let match_id = fixture.id;
    let (want_lineup, want_stats) = wants(fixture.status.phase());

    let lineup = async {
        if !want_lineup {
            return None;
        }
        match feed.lineup(match_id).await {
            Ok(lineup) => lineup,
            Err(e) => {
                warn!("Lineup enrichment failed for match {}: {}", match_id, e);
                None
            }
        }
    };
    let stats = async {
        if !want_stats {
            return None;
        }
        match feed.statistics(match_id).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!("Statistics enrichment failed for match {}: {}", match_id, e);
                None
            }
        }
    };
    let headlines = feed.headlines(&fixture.home.name, &fixture.away.name);
    let sentiment = feed.sentiment(&fixture.home.name, &fixture.away.name);

    let (lineup, stats, headlines, sentiment) = tokio::join!(lineup, stats, headlines, sentiment);

    MatchContext {
        top_topics: top_topics(&fixture),
        fixture,
        lineup,
        stats,
        headlines,
        sentiment,
    }
}
