//! Persistence capability for debates, cards, votes, comments and engagement.
//!
//! The service layer decides whether and what to write; implementations
//! decide how. [`postgres::PgStore`] is the production store,
//! [`memory::MemoryStore`] backs tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::debate::model::{
    Comment, Debate, DebateCard, DbId, DebateType, EngagementSnapshot, RankedDebate, Stance, Vote,
    VoteTally, VoteType,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The at-most-one-active-debate rule for this pair would be violated.
    #[error("an active {debate_type} debate already exists for match {match_id}")]
    DuplicateActive {
        match_id: i64,
        debate_type: DebateType,
    },

    /// A stored value could not be mapped back into a domain type.
    #[error("stored row could not be decoded: {0}")]
    Decode(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// DTO for creating a debate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDebate {
    pub match_id: i64,
    pub debate_type: DebateType,
    pub headline: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ai_generated: bool,
    #[serde(default)]
    pub generation_id: Option<Uuid>,
}

/// DTO for creating a card, either inside a generation or on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCard {
    pub stance: Stance,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ai_generated: bool,
}

#[derive(Debug, Clone)]
pub struct NewVote {
    pub card_id: DbId,
    pub user_id: i64,
    pub vote_type: VoteType,
    pub emoji: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub debate_id: DbId,
    pub parent_comment_id: Option<DbId>,
    pub user_id: i64,
    pub content: String,
}

/// Result of persisting a debate as one unit.
#[derive(Debug, Clone)]
pub struct InsertedDebate {
    pub debate: Debate,
    pub cards: Vec<DebateCard>,
    /// Ids of the previously active debates that were soft-deleted in the same unit.
    pub superseded: Vec<DbId>,
}

#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Non-deleted debates for the pair. At most one unless the store is corrupt.
    async fn active_debates(
        &self,
        match_id: i64,
        debate_type: DebateType,
    ) -> Result<Vec<Debate>, StoreError>;

    /// Persist a debate, its cards and a zeroed engagement snapshot as one
    /// unit. When `supersede` is set, currently active debates for the same
    /// pair are soft-deleted in that same unit. Fails with
    /// [`StoreError::DuplicateActive`] if another active debate exists.
    async fn insert_debate(
        &self,
        debate: &NewDebate,
        cards: &[NewCard],
        supersede: bool,
    ) -> Result<InsertedDebate, StoreError>;

    /// Active debate by id.
    async fn debate(&self, id: DbId) -> Result<Option<Debate>, StoreError>;

    /// Debate by id, soft-deleted or not.
    async fn debate_including_deleted(&self, id: DbId) -> Result<Option<Debate>, StoreError>;

    async fn soft_delete_debate(&self, id: DbId) -> Result<bool, StoreError>;

    /// Clear `deleted_at`. Fails with [`StoreError::DuplicateActive`] when
    /// another debate now holds the pair.
    async fn restore_debate(&self, id: DbId) -> Result<bool, StoreError>;

    async fn debates_for_match(&self, match_id: i64) -> Result<Vec<Debate>, StoreError>;

    /// Active debates ordered by engagement score, highest first.
    async fn top_debates(&self, limit: i64) -> Result<Vec<RankedDebate>, StoreError>;

    async fn cards(&self, debate_id: DbId) -> Result<Vec<DebateCard>, StoreError>;

    async fn card(&self, id: DbId) -> Result<Option<DebateCard>, StoreError>;

    async fn insert_card(&self, debate_id: DbId, card: &NewCard)
        -> Result<DebateCard, StoreError>;

    /// Insert, or refresh an identical (card, user, type, emoji) vote.
    async fn upsert_vote(&self, vote: &NewVote) -> Result<Vote, StoreError>;

    async fn delete_vote(&self, vote: &NewVote) -> Result<bool, StoreError>;

    async fn vote_tallies(&self, card_ids: &[DbId]) -> Result<Vec<VoteTally>, StoreError>;

    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment, StoreError>;

    async fn comment(&self, id: DbId) -> Result<Option<Comment>, StoreError>;

    async fn comments(&self, debate_id: DbId) -> Result<Vec<Comment>, StoreError>;

    /// Votes across every card of the debate.
    async fn count_votes(&self, debate_id: DbId) -> Result<i64, StoreError>;

    async fn count_comments(&self, debate_id: DbId) -> Result<i64, StoreError>;

    async fn upsert_engagement(
        &self,
        debate_id: DbId,
        total_votes: i64,
        total_comments: i64,
        score: f64,
    ) -> Result<EngagementSnapshot, StoreError>;

    async fn engagement(&self, debate_id: DbId) -> Result<Option<EngagementSnapshot>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
