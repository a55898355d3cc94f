//! Debate generation and the debate/card/vote/comment operations around it.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::engagement;
use super::lifecycle::{self, LifecycleRejection};
use super::locks::GenerationLocks;
use super::model::{
    CardView, Comment, DbId, Debate, DebateCard, DebateType, DebateView, RankedDebate, Stance,
    Vote, VoteCounts, VoteType,
};
use super::prompt;
use crate::aggregate;
use crate::error::{ServiceError, ServiceResult};
use crate::feed::FeedService;
use crate::health::HealthState;
use crate::identity::Principal;
use crate::providers::{ContentGenerator, Fixture, GeneratedDebate, GeneratorError};
use crate::store::{NewCard, NewComment, NewDebate, NewVote, PersistenceStore, StoreError};

pub const DEFAULT_TOP_LIMIT: i64 = 10;
pub const MAX_TOP_LIMIT: i64 = 100;
pub const MAX_COMMENT_CHARS: usize = 2000;

/// A debate ready to persist, built from generator output.
#[derive(Debug, Clone, Serialize)]
pub struct DebateDraft {
    pub debate: NewDebate,
    pub cards: Vec<NewCard>,
    /// Generated cards discarded for an unknown stance or empty title.
    pub dropped_cards: usize,
}

#[derive(Debug, Clone)]
pub enum GenerationOutcome {
    /// An active debate already existed and was returned untouched.
    Existing(DebateView),
    Created {
        debate: DebateView,
        superseded: Vec<DbId>,
    },
    /// The match is in the wrong phase for this debate type. Nothing was written.
    Rejected(LifecycleRejection),
}

#[derive(Debug, Clone)]
pub enum PreviewOutcome {
    Ready(DebateDraft),
    Rejected(LifecycleRejection),
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Turn raw generator output into a draft. Invalid cards are dropped one by
/// one; no headline or no surviving card fails the whole generation.
pub fn validate_generated(
    generated: GeneratedDebate,
    match_id: i64,
    debate_type: DebateType,
    generation_id: Uuid,
) -> ServiceResult<DebateDraft> {
    let headline = non_empty(&generated.headline)
        .ok_or_else(|| ServiceError::Contract("generated debate has no headline".to_string()))?;

    let total = generated.cards.len();
    let cards: Vec<NewCard> = generated
        .cards
        .into_iter()
        .filter_map(|card| {
            let stance = match card.stance.parse::<Stance>() {
                Ok(stance) => stance,
                Err(e) => {
                    debug!("Dropping generated card: {}", e);
                    return None;
                }
            };
            let Some(title) = non_empty(&card.title) else {
                debug!("Dropping generated {} card with empty title", stance.as_str());
                return None;
            };
            Some(NewCard {
                stance,
                title,
                description: non_empty(&card.description),
                ai_generated: true,
            })
        })
        .collect();

    if cards.is_empty() {
        return Err(ServiceError::Contract(format!(
            "none of the {total} generated cards were valid"
        )));
    }

    Ok(DebateDraft {
        debate: NewDebate {
            match_id,
            debate_type,
            headline,
            description: non_empty(&generated.description),
            ai_generated: true,
            generation_id: Some(generation_id),
        },
        dropped_cards: total - cards.len(),
        cards,
    })
}

/// `Some(emoji)` exactly when the vote type is emoji.
fn vote_emoji(vote_type: VoteType, emoji: Option<String>) -> ServiceResult<Option<String>> {
    let emoji = emoji.as_deref().and_then(non_empty);
    match (vote_type, emoji) {
        (VoteType::Emoji, Some(emoji)) => Ok(Some(emoji)),
        (VoteType::Emoji, None) => Err(ServiceError::validation(
            "emoji is required when vote_type is 'emoji'",
        )),
        (_, Some(_)) => Err(ServiceError::validation(
            "emoji is only allowed when vote_type is 'emoji'",
        )),
        (_, None) => Ok(None),
    }
}

fn duplicate_to_conflict(err: StoreError) -> ServiceError {
    match err {
        StoreError::DuplicateActive { .. } => ServiceError::Conflict(err.to_string()),
        other => ServiceError::Store(other),
    }
}

#[derive(Clone)]
pub struct DebateService {
    store: Arc<dyn PersistenceStore>,
    feed: FeedService,
    generator: Arc<dyn ContentGenerator>,
    locks: GenerationLocks,
    health: HealthState,
}

impl DebateService {
    pub fn new(
        store: Arc<dyn PersistenceStore>,
        feed: FeedService,
        generator: Arc<dyn ContentGenerator>,
        health: HealthState,
    ) -> Self {
        Self {
            store,
            feed,
            generator,
            locks: GenerationLocks::new(),
            health,
        }
    }

    pub fn locks(&self) -> &GenerationLocks {
        &self.locks
    }

    /// Aggregate match data, call the generator and validate its output.
    async fn draft(
        &self,
        fixture: Fixture,
        debate_type: DebateType,
        generation_id: Uuid,
    ) -> ServiceResult<DebateDraft> {
        let match_id = fixture.id;
        let context = aggregate::gather(&self.feed, fixture).await;
        debug!(
            "Generation {} context for match {}: lineup={}, stats={}, {} headlines",
            generation_id,
            match_id,
            context.lineup.is_some(),
            context.stats.is_some(),
            context.headlines.len()
        );

        let generated = self
            .generator
            .generate(
                &prompt::system_prompt(debate_type),
                &prompt::user_prompt(debate_type, &context),
            )
            .await
            .map_err(|e| match e {
                GeneratorError::Malformed(msg) => ServiceError::Contract(msg),
                GeneratorError::Request(source) => ServiceError::Upstream(source),
            })?;

        let draft = validate_generated(generated, match_id, debate_type, generation_id)?;
        if draft.dropped_cards > 0 {
            warn!(
                "Generation {} dropped {} invalid cards, kept {}",
                generation_id,
                draft.dropped_cards,
                draft.cards.len()
            );
        }
        Ok(draft)
    }

    /// Generate and persist a debate for the match, or return the active one.
    ///
    /// With `regenerate`, the active debate is replaced: it is soft-deleted in
    /// the same unit that inserts its successor, and only after the lifecycle
    /// check passes and generation succeeds.
    pub async fn generate(
        &self,
        match_id: i64,
        debate_type: DebateType,
        regenerate: bool,
    ) -> ServiceResult<GenerationOutcome> {
        let _guard = self.locks.acquire(match_id, debate_type).await;

        let active = self.store.active_debates(match_id, debate_type).await?;
        if !regenerate {
            if let Some(existing) = active.into_iter().next() {
                info!(
                    "Returning existing {} debate {} for match {}",
                    debate_type, existing.id, match_id
                );
                return Ok(GenerationOutcome::Existing(self.view(existing).await?));
            }
        }

        let fixture = self.feed.fixture(match_id).await?;
        if let Err(rejection) = lifecycle::check(&fixture.status, debate_type) {
            info!(
                "Rejected {} debate for match {}: {}",
                debate_type, match_id, rejection.message
            );
            return Ok(GenerationOutcome::Rejected(rejection));
        }

        let generation_id = Uuid::new_v4();
        info!(
            "Generation {} started: {} debate for match {} ({} vs {}, regenerate={})",
            generation_id, debate_type, match_id, fixture.home.name, fixture.away.name, regenerate
        );
        let draft = self.draft(fixture, debate_type, generation_id).await?;

        match self
            .store
            .insert_debate(&draft.debate, &draft.cards, regenerate)
            .await
        {
            Ok(inserted) => {
                self.health.record_generation().await;
                info!(
                    "Generation {} stored debate {} with {} cards (superseded {:?})",
                    generation_id,
                    inserted.debate.id,
                    inserted.cards.len(),
                    inserted.superseded
                );
                let debate = self.view(inserted.debate).await?;
                Ok(GenerationOutcome::Created {
                    debate,
                    superseded: inserted.superseded,
                })
            }
            Err(StoreError::DuplicateActive { .. }) if !regenerate => {
                // Another instance stored one first; theirs wins.
                warn!(
                    "Generation {} lost the race for match {} {}, returning the stored debate",
                    generation_id, match_id, debate_type
                );
                let winner = self
                    .store
                    .active_debates(match_id, debate_type)
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        ServiceError::Conflict(format!(
                            "active {debate_type} debate for match {match_id} disappeared during generation"
                        ))
                    })?;
                Ok(GenerationOutcome::Existing(self.view(winner).await?))
            }
            Err(e) => Err(duplicate_to_conflict(e)),
        }
    }

    /// Everything `generate` does short of persisting.
    pub async fn preview(
        &self,
        match_id: i64,
        debate_type: DebateType,
    ) -> ServiceResult<PreviewOutcome> {
        let fixture = self.feed.fixture(match_id).await?;
        if let Err(rejection) = lifecycle::check(&fixture.status, debate_type) {
            return Ok(PreviewOutcome::Rejected(rejection));
        }
        let draft = self.draft(fixture, debate_type, Uuid::new_v4()).await?;
        Ok(PreviewOutcome::Ready(draft))
    }

    pub async fn create_debate(&self, new: NewDebate) -> ServiceResult<DebateView> {
        if new.match_id <= 0 {
            return Err(ServiceError::validation("match_id must be a positive integer"));
        }
        let headline = non_empty(&new.headline)
            .ok_or_else(|| ServiceError::validation("headline is required"))?;
        let new = NewDebate {
            headline,
            description: new.description.as_deref().and_then(non_empty),
            ..new
        };

        let inserted = self
            .store
            .insert_debate(&new, &[], false)
            .await
            .map_err(duplicate_to_conflict)?;
        info!(
            "Created {} debate {} for match {}",
            new.debate_type, inserted.debate.id, new.match_id
        );
        self.view(inserted.debate).await
    }

    pub async fn create_card(&self, debate_id: DbId, card: NewCard) -> ServiceResult<DebateCard> {
        let title =
            non_empty(&card.title).ok_or_else(|| ServiceError::validation("title is required"))?;
        self.active_debate(debate_id).await?;

        let card = NewCard {
            title,
            description: card.description.as_deref().and_then(non_empty),
            ..card
        };
        Ok(self.store.insert_card(debate_id, &card).await?)
    }

    async fn active_debate(&self, id: DbId) -> ServiceResult<Debate> {
        self.store
            .debate(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("debate", id))
    }

    /// Cards with vote counts, plus the engagement snapshot.
    async fn view(&self, debate: Debate) -> ServiceResult<DebateView> {
        let cards = self.store.cards(debate.id).await?;
        let card_ids: Vec<DbId> = cards.iter().map(|c| c.id).collect();
        let tallies = self.store.vote_tallies(&card_ids).await?;
        let engagement = self.store.engagement(debate.id).await?;

        let cards = cards
            .into_iter()
            .map(|card| CardView {
                vote_counts: VoteCounts::for_card(card.id, &tallies),
                card,
            })
            .collect();
        Ok(DebateView {
            debate,
            cards,
            engagement,
        })
    }

    pub async fn get_debate(&self, id: DbId) -> ServiceResult<DebateView> {
        let debate = self.active_debate(id).await?;
        self.view(debate).await
    }

    pub async fn debates_for_match(&self, match_id: i64) -> ServiceResult<Vec<Debate>> {
        Ok(self.store.debates_for_match(match_id).await?)
    }

    /// Highest engagement first. `None` means the default limit; larger
    /// limits are capped.
    pub async fn top_debates(&self, limit: Option<i64>) -> ServiceResult<Vec<RankedDebate>> {
        let limit = match limit {
            None => DEFAULT_TOP_LIMIT,
            Some(n) if n <= 0 => {
                return Err(ServiceError::validation(format!(
                    "limit must be positive, got {n}"
                )))
            }
            Some(n) => n.min(MAX_TOP_LIMIT),
        };
        Ok(self.store.top_debates(limit).await?)
    }

    pub async fn soft_delete_debate(&self, id: DbId) -> ServiceResult<()> {
        if !self.store.soft_delete_debate(id).await? {
            return Err(ServiceError::not_found("debate", id));
        }
        info!("Soft-deleted debate {}", id);
        Ok(())
    }

    /// Bring a soft-deleted debate back. Refused while another debate is
    /// active for the same match and type.
    pub async fn restore_debate(&self, id: DbId) -> ServiceResult<DebateView> {
        let debate = self
            .store
            .debate_including_deleted(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("debate", id))?;
        if debate.is_active() {
            return self.view(debate).await;
        }

        self.store
            .restore_debate(id)
            .await
            .map_err(duplicate_to_conflict)?;
        info!("Restored debate {}", id);
        self.get_debate(id).await
    }

    async fn card_of_active_debate(&self, card_id: DbId) -> ServiceResult<DebateCard> {
        let card = self
            .store
            .card(card_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("card", card_id))?;
        self.active_debate(card.debate_id).await?;
        Ok(card)
    }

    /// Record a vote. Repeating an identical vote is a no-op refresh.
    pub async fn cast_vote(
        &self,
        principal: &Principal,
        card_id: DbId,
        vote_type: VoteType,
        emoji: Option<String>,
    ) -> ServiceResult<Vote> {
        let emoji = vote_emoji(vote_type, emoji)?;
        let card = self.card_of_active_debate(card_id).await?;

        let vote = self
            .store
            .upsert_vote(&NewVote {
                card_id,
                user_id: principal.user_id,
                vote_type,
                emoji,
            })
            .await?;
        engagement::refresh(self.store.as_ref(), card.debate_id).await;
        Ok(vote)
    }

    pub async fn remove_vote(
        &self,
        principal: &Principal,
        card_id: DbId,
        vote_type: VoteType,
        emoji: Option<String>,
    ) -> ServiceResult<()> {
        let emoji = vote_emoji(vote_type, emoji)?;
        let card = self
            .store
            .card(card_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("card", card_id))?;

        let vote = NewVote {
            card_id,
            user_id: principal.user_id,
            vote_type,
            emoji,
        };
        if !self.store.delete_vote(&vote).await? {
            let described = match &vote.emoji {
                Some(emoji) => format!("(card {card_id}, {} {emoji})", vote_type.as_str()),
                None => format!("(card {card_id}, {})", vote_type.as_str()),
            };
            return Err(ServiceError::not_found("vote", described));
        }
        engagement::refresh(self.store.as_ref(), card.debate_id).await;
        Ok(())
    }

    pub async fn add_comment(
        &self,
        principal: &Principal,
        debate_id: DbId,
        parent_comment_id: Option<DbId>,
        content: &str,
    ) -> ServiceResult<Comment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ServiceError::validation("content is required"));
        }
        let chars = content.chars().count();
        if chars > MAX_COMMENT_CHARS {
            return Err(ServiceError::validation(format!(
                "content is limited to {MAX_COMMENT_CHARS} characters, got {chars}"
            )));
        }
        self.active_debate(debate_id).await?;

        if let Some(parent_id) = parent_comment_id {
            let parent = self
                .store
                .comment(parent_id)
                .await?
                .ok_or_else(|| ServiceError::not_found("comment", parent_id))?;
            if parent.debate_id != debate_id {
                return Err(ServiceError::validation(format!(
                    "parent comment {parent_id} belongs to another debate"
                )));
            }
        }

        let comment = self
            .store
            .insert_comment(&NewComment {
                debate_id,
                parent_comment_id,
                user_id: principal.user_id,
                content: content.to_string(),
            })
            .await?;
        engagement::refresh(self.store.as_ref(), debate_id).await;
        Ok(comment)
    }

    pub async fn comments(&self, debate_id: DbId) -> ServiceResult<Vec<Comment>> {
        self.active_debate(debate_id).await?;
        Ok(self.store.comments(debate_id).await?)
    }

    pub async fn store_healthy(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Store health check failed: {}", e);
                false
            }
        }
    }
}
