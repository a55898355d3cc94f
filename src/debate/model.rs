//! Debate domain types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Primary key type for every persisted row.
pub type DbId = i64;

pub type Timestamp = DateTime<Utc>;

/// Which side of kickoff a debate is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebateType {
    PreMatch,
    PostMatch,
}

impl DebateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreMatch => "pre_match",
            Self::PostMatch => "post_match",
        }
    }
}

impl FromStr for DebateType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pre_match" => Ok(Self::PreMatch),
            "post_match" => Ok(Self::PostMatch),
            other => Err(format!(
                "debate type must be 'pre_match' or 'post_match', got '{other}'"
            )),
        }
    }
}

impl fmt::Display for DebateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    Agree,
    Disagree,
    Wildcard,
}

impl Stance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agree => "agree",
            Self::Disagree => "disagree",
            Self::Wildcard => "wildcard",
        }
    }
}

impl FromStr for Stance {
    type Err = String;

    /// Case-insensitive: generated content is not always consistent about case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "agree" => Ok(Self::Agree),
            "disagree" => Ok(Self::Disagree),
            "wildcard" => Ok(Self::Wildcard),
            _ => Err(format!(
                "stance must be 'agree', 'disagree' or 'wildcard', got '{}'",
                s.trim()
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteType {
    Upvote,
    Downvote,
    Emoji,
}

impl VoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upvote => "upvote",
            Self::Downvote => "downvote",
            Self::Emoji => "emoji",
        }
    }
}

impl FromStr for VoteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "upvote" => Ok(Self::Upvote),
            "downvote" => Ok(Self::Downvote),
            "emoji" => Ok(Self::Emoji),
            other => Err(format!(
                "vote_type must be 'upvote', 'downvote' or 'emoji', got '{other}'"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debate {
    pub id: DbId,
    pub match_id: i64,
    pub debate_type: DebateType,
    pub headline: String,
    pub description: Option<String>,
    pub ai_generated: bool,
    /// Set for generated debates; ties log lines and stored rows together.
    pub generation_id: Option<Uuid>,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Debate {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateCard {
    pub id: DbId,
    pub debate_id: DbId,
    pub stance: Stance,
    pub title: String,
    pub description: Option<String>,
    pub ai_generated: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub id: DbId,
    pub card_id: DbId,
    pub user_id: i64,
    pub vote_type: VoteType,
    pub emoji: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: DbId,
    pub debate_id: DbId,
    pub parent_comment_id: Option<DbId>,
    pub user_id: i64,
    pub content: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Derived engagement figures for one debate. Always recomputable from
/// votes and comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementSnapshot {
    pub debate_id: DbId,
    pub total_votes: i64,
    pub total_comments: i64,
    pub score: f64,
    pub updated_at: Timestamp,
}

/// One `GROUP BY (card, vote_type, emoji)` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteTally {
    pub card_id: DbId,
    pub vote_type: VoteType,
    pub emoji: Option<String>,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCounts {
    pub upvotes: i64,
    pub downvotes: i64,
    pub emojis: BTreeMap<String, i64>,
}

impl VoteCounts {
    /// Fold the tallies belonging to `card_id` into per-card counts.
    pub fn for_card(card_id: DbId, tallies: &[VoteTally]) -> Self {
        let mut counts = Self::default();
        for tally in tallies.iter().filter(|t| t.card_id == card_id) {
            match tally.vote_type {
                VoteType::Upvote => counts.upvotes += tally.count,
                VoteType::Downvote => counts.downvotes += tally.count,
                VoteType::Emoji => {
                    if let Some(emoji) = &tally.emoji {
                        *counts.emojis.entry(emoji.clone()).or_insert(0) += tally.count;
                    }
                }
            }
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardView {
    #[serde(flatten)]
    pub card: DebateCard,
    pub vote_counts: VoteCounts,
}

/// A debate as returned to readers: cards with their vote counts, plus engagement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebateView {
    #[serde(flatten)]
    pub debate: Debate,
    pub cards: Vec<CardView>,
    pub engagement: Option<EngagementSnapshot>,
}

/// A debate with its engagement, as ranked by `top_debates`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedDebate {
    #[serde(flatten)]
    pub debate: Debate,
    pub engagement: EngagementSnapshot,
}
