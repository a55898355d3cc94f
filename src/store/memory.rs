//! In-process [`PersistenceStore`] for tests.
//!
//! Enforces the same constraints as the Postgres schema (one active debate
//! per pair, vote uniqueness) and counts successful writes so tests can
//! assert that an operation wrote nothing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{InsertedDebate, NewCard, NewComment, NewDebate, NewVote, PersistenceStore, StoreError};
use crate::debate::model::{
    Comment, Debate, DebateCard, DbId, DebateType, EngagementSnapshot, RankedDebate, Vote,
    VoteTally,
};

#[derive(Default)]
struct State {
    last_id: DbId,
    debates: Vec<Debate>,
    cards: Vec<DebateCard>,
    votes: Vec<Vote>,
    comments: Vec<Comment>,
    engagement: HashMap<DbId, EngagementSnapshot>,
}

impl State {
    fn next_id(&mut self) -> DbId {
        self.last_id += 1;
        self.last_id
    }

    fn has_active(&self, match_id: i64, debate_type: DebateType, except: Option<DbId>) -> bool {
        self.debates.iter().any(|d| {
            d.match_id == match_id
                && d.debate_type == debate_type
                && d.is_active()
                && Some(d.id) != except
        })
    }

    fn zero_engagement(&mut self, debate_id: DbId) {
        self.engagement.insert(
            debate_id,
            EngagementSnapshot {
                debate_id,
                total_votes: 0,
                total_comments: 0,
                score: 0.0,
                updated_at: Utc::now(),
            },
        );
    }

    fn push_card(&mut self, debate_id: DbId, card: &NewCard) -> DebateCard {
        let now = Utc::now();
        let stored = DebateCard {
            id: self.next_id(),
            debate_id,
            stance: card.stance,
            title: card.title.clone(),
            description: card.description.clone(),
            ai_generated: card.ai_generated,
            created_at: now,
            updated_at: now,
        };
        self.cards.push(stored.clone());
        stored
    }
}

fn same_vote(stored: &Vote, vote: &NewVote) -> bool {
    stored.card_id == vote.card_id
        && stored.user_id == vote.user_id
        && stored.vote_type == vote.vote_type
        && stored.emoji.as_deref().unwrap_or("") == vote.emoji.as_deref().unwrap_or("")
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful mutating calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Every debate, including soft-deleted ones, in insertion order.
    pub fn all_debates(&self) -> Vec<Debate> {
        self.state
            .lock()
            .map(|s| s.debates.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn wrote(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn active_debates(
        &self,
        match_id: i64,
        debate_type: DebateType,
    ) -> Result<Vec<Debate>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .debates
            .iter()
            .rev()
            .filter(|d| d.match_id == match_id && d.debate_type == debate_type && d.is_active())
            .cloned()
            .collect())
    }

    async fn insert_debate(
        &self,
        debate: &NewDebate,
        cards: &[NewCard],
        supersede: bool,
    ) -> Result<InsertedDebate, StoreError> {
        let mut state = self.lock()?;
        let now = Utc::now();

        if !supersede && state.has_active(debate.match_id, debate.debate_type, None) {
            return Err(StoreError::DuplicateActive {
                match_id: debate.match_id,
                debate_type: debate.debate_type,
            });
        }

        let mut superseded = Vec::new();
        if supersede {
            for existing in state.debates.iter_mut().filter(|d| {
                d.match_id == debate.match_id
                    && d.debate_type == debate.debate_type
                    && d.is_active()
            }) {
                existing.deleted_at = Some(now);
                existing.updated_at = now;
                superseded.push(existing.id);
            }
        }

        let stored = Debate {
            id: state.next_id(),
            match_id: debate.match_id,
            debate_type: debate.debate_type,
            headline: debate.headline.clone(),
            description: debate.description.clone(),
            ai_generated: debate.ai_generated,
            generation_id: debate.generation_id,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        state.debates.push(stored.clone());

        let stored_cards = cards
            .iter()
            .map(|card| state.push_card(stored.id, card))
            .collect();
        state.zero_engagement(stored.id);
        self.wrote();

        Ok(InsertedDebate {
            debate: stored,
            cards: stored_cards,
            superseded,
        })
    }

    async fn debate(&self, id: DbId) -> Result<Option<Debate>, StoreError> {
        let state = self.lock()?;
        Ok(state.debates.iter().find(|d| d.id == id && d.is_active()).cloned())
    }

    async fn debate_including_deleted(&self, id: DbId) -> Result<Option<Debate>, StoreError> {
        let state = self.lock()?;
        Ok(state.debates.iter().find(|d| d.id == id).cloned())
    }

    async fn soft_delete_debate(&self, id: DbId) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let now = Utc::now();
        match state.debates.iter_mut().find(|d| d.id == id && d.is_active()) {
            Some(debate) => {
                debate.deleted_at = Some(now);
                debate.updated_at = now;
                self.wrote();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn restore_debate(&self, id: DbId) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let Some((match_id, debate_type)) = state
            .debates
            .iter()
            .find(|d| d.id == id && !d.is_active())
            .map(|d| (d.match_id, d.debate_type))
        else {
            return Ok(false);
        };

        if state.has_active(match_id, debate_type, Some(id)) {
            return Err(StoreError::DuplicateActive {
                match_id,
                debate_type,
            });
        }

        if let Some(debate) = state.debates.iter_mut().find(|d| d.id == id) {
            debate.deleted_at = None;
            debate.updated_at = Utc::now();
        }
        self.wrote();
        Ok(true)
    }

    async fn debates_for_match(&self, match_id: i64) -> Result<Vec<Debate>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .debates
            .iter()
            .rev()
            .filter(|d| d.match_id == match_id && d.is_active())
            .cloned()
            .collect())
    }

    async fn top_debates(&self, limit: i64) -> Result<Vec<RankedDebate>, StoreError> {
        let state = self.lock()?;
        let mut ranked: Vec<RankedDebate> = state
            .debates
            .iter()
            .filter(|d| d.is_active())
            .map(|d| RankedDebate {
                engagement: state.engagement.get(&d.id).cloned().unwrap_or(EngagementSnapshot {
                    debate_id: d.id,
                    total_votes: 0,
                    total_comments: 0,
                    score: 0.0,
                    updated_at: d.updated_at,
                }),
                debate: d.clone(),
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.engagement
                .score
                .total_cmp(&a.engagement.score)
                .then(b.debate.created_at.cmp(&a.debate.created_at))
                .then(b.debate.id.cmp(&a.debate.id))
        });
        ranked.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(ranked)
    }

    async fn cards(&self, debate_id: DbId) -> Result<Vec<DebateCard>, StoreError> {
        let state = self.lock()?;
        let mut cards: Vec<DebateCard> = state
            .cards
            .iter()
            .filter(|c| c.debate_id == debate_id)
            .cloned()
            .collect();
        cards.sort_by(|a, b| a.stance.as_str().cmp(b.stance.as_str()).then(a.id.cmp(&b.id)));
        Ok(cards)
    }

    async fn card(&self, id: DbId) -> Result<Option<DebateCard>, StoreError> {
        let state = self.lock()?;
        Ok(state.cards.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_card(
        &self,
        debate_id: DbId,
        card: &NewCard,
    ) -> Result<DebateCard, StoreError> {
        let mut state = self.lock()?;
        let stored = state.push_card(debate_id, card);
        self.wrote();
        Ok(stored)
    }

    async fn upsert_vote(&self, vote: &NewVote) -> Result<Vote, StoreError> {
        let mut state = self.lock()?;
        let now = Utc::now();
        if let Some(existing) = state.votes.iter_mut().find(|v| same_vote(v, vote)) {
            existing.created_at = now;
            let refreshed = existing.clone();
            self.wrote();
            return Ok(refreshed);
        }

        let stored = Vote {
            id: state.next_id(),
            card_id: vote.card_id,
            user_id: vote.user_id,
            vote_type: vote.vote_type,
            emoji: vote.emoji.clone().filter(|e| !e.is_empty()),
            created_at: now,
        };
        state.votes.push(stored.clone());
        self.wrote();
        Ok(stored)
    }

    async fn delete_vote(&self, vote: &NewVote) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let before = state.votes.len();
        state.votes.retain(|v| !same_vote(v, vote));
        let removed = state.votes.len() != before;
        if removed {
            self.wrote();
        }
        Ok(removed)
    }

    async fn vote_tallies(&self, card_ids: &[DbId]) -> Result<Vec<VoteTally>, StoreError> {
        let state = self.lock()?;
        let mut tallies: Vec<VoteTally> = Vec::new();
        for vote in state.votes.iter().filter(|v| card_ids.contains(&v.card_id)) {
            match tallies.iter_mut().find(|t| {
                t.card_id == vote.card_id && t.vote_type == vote.vote_type && t.emoji == vote.emoji
            }) {
                Some(tally) => tally.count += 1,
                None => tallies.push(VoteTally {
                    card_id: vote.card_id,
                    vote_type: vote.vote_type,
                    emoji: vote.emoji.clone(),
                    count: 1,
                }),
            }
        }
        Ok(tallies)
    }

    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment, StoreError> {
        let mut state = self.lock()?;
        let now = Utc::now();
        let stored = Comment {
            id: state.next_id(),
            debate_id: comment.debate_id,
            parent_comment_id: comment.parent_comment_id,
            user_id: comment.user_id,
            content: comment.content.clone(),
            created_at: now,
            updated_at: now,
        };
        state.comments.push(stored.clone());
        self.wrote();
        Ok(stored)
    }

    async fn comment(&self, id: DbId) -> Result<Option<Comment>, StoreError> {
        let state = self.lock()?;
        Ok(state.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn comments(&self, debate_id: DbId) -> Result<Vec<Comment>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .comments
            .iter()
            .filter(|c| c.debate_id == debate_id)
            .cloned()
            .collect())
    }

    async fn count_votes(&self, debate_id: DbId) -> Result<i64, StoreError> {
        let state = self.lock()?;
        let card_ids: Vec<DbId> = state
            .cards
            .iter()
            .filter(|c| c.debate_id == debate_id)
            .map(|c| c.id)
            .collect();
        Ok(state
            .votes
            .iter()
            .filter(|v| card_ids.contains(&v.card_id))
            .count() as i64)
    }

    async fn count_comments(&self, debate_id: DbId) -> Result<i64, StoreError> {
        let state = self.lock()?;
        Ok(state.comments.iter().filter(|c| c.debate_id == debate_id).count() as i64)
    }

    async fn upsert_engagement(
        &self,
        debate_id: DbId,
        total_votes: i64,
        total_comments: i64,
        score: f64,
    ) -> Result<EngagementSnapshot, StoreError> {
        let mut state = self.lock()?;
        let snapshot = EngagementSnapshot {
            debate_id,
            total_votes,
            total_comments,
            score,
            updated_at: Utc::now(),
        };
        state.engagement.insert(debate_id, snapshot.clone());
        self.wrote();
        Ok(snapshot)
    }

    async fn engagement(&self, debate_id: DbId) -> Result<Option<EngagementSnapshot>, StoreError> {
        let state = self.lock()?;
        Ok(state.engagement.get(&debate_id).cloned())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}
