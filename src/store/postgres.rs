//! Postgres-backed [`PersistenceStore`].
//!
//! Enum columns are stored as text and decoded through the domain `FromStr`
//! impls. Vote emoji is stored as `''` when absent so that it can take part
//! in the `(card, user, type, emoji)` uniqueness constraint.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use super::{InsertedDebate, NewCard, NewComment, NewDebate, NewVote, PersistenceStore, StoreError};
use crate::debate::model::{
    Comment, Debate, DebateCard, DbId, DebateType, EngagementSnapshot, RankedDebate, Timestamp,
    Vote, VoteTally,
};

const DEBATE_COLUMNS: &str = "id, match_id, debate_type, headline, description, ai_generated, \
    generation_id, deleted_at, created_at, updated_at";

const CARD_COLUMNS: &str =
    "id, debate_id, stance, title, description, ai_generated, created_at, updated_at";

const VOTE_COLUMNS: &str = "id, debate_card_id, user_id, vote_type, emoji, created_at";

const COMMENT_COLUMNS: &str =
    "id, debate_id, parent_comment_id, user_id, content, created_at, updated_at";

const ENGAGEMENT_COLUMNS: &str =
    "debate_id, total_votes, total_comments, engagement_score, updated_at";

#[derive(FromRow)]
struct DebateRow {
    id: DbId,
    match_id: i64,
    debate_type: String,
    headline: String,
    description: Option<String>,
    ai_generated: bool,
    generation_id: Option<Uuid>,
    deleted_at: Option<Timestamp>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl TryFrom<DebateRow> for Debate {
    type Error = StoreError;

    fn try_from(row: DebateRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            match_id: row.match_id,
            debate_type: row.debate_type.parse().map_err(StoreError::Decode)?,
            headline: row.headline,
            description: row.description,
            ai_generated: row.ai_generated,
            generation_id: row.generation_id,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct CardRow {
    id: DbId,
    debate_id: DbId,
    stance: String,
    title: String,
    description: Option<String>,
    ai_generated: bool,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl TryFrom<CardRow> for DebateCard {
    type Error = StoreError;

    fn try_from(row: CardRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            debate_id: row.debate_id,
            stance: row.stance.parse().map_err(StoreError::Decode)?,
            title: row.title,
            description: row.description,
            ai_generated: row.ai_generated,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct VoteRow {
    id: DbId,
    debate_card_id: DbId,
    user_id: i64,
    vote_type: String,
    emoji: String,
    created_at: Timestamp,
}

impl TryFrom<VoteRow> for Vote {
    type Error = StoreError;

    fn try_from(row: VoteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            card_id: row.debate_card_id,
            user_id: row.user_id,
            vote_type: row.vote_type.parse().map_err(StoreError::Decode)?,
            emoji: Some(row.emoji).filter(|e| !e.is_empty()),
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct TallyRow {
    debate_card_id: DbId,
    vote_type: String,
    emoji: String,
    count: i64,
}

#[derive(FromRow)]
struct CommentRow {
    id: DbId,
    debate_id: DbId,
    parent_comment_id: Option<DbId>,
    user_id: i64,
    content: String,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            debate_id: row.debate_id,
            parent_comment_id: row.parent_comment_id,
            user_id: row.user_id,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct EngagementRow {
    debate_id: DbId,
    total_votes: i64,
    total_comments: i64,
    engagement_score: f64,
    updated_at: Timestamp,
}

impl From<EngagementRow> for EngagementSnapshot {
    fn from(row: EngagementRow) -> Self {
        Self {
            debate_id: row.debate_id,
            total_votes: row.total_votes,
            total_comments: row.total_comments,
            score: row.engagement_score,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct RankedRow {
    #[sqlx(flatten)]
    debate: DebateRow,
    total_votes: i64,
    total_comments: i64,
    engagement_score: f64,
    engagement_updated_at: Timestamp,
}

fn decode_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Map a unique violation on the active-debate index to the domain error.
fn duplicate_or(err: sqlx::Error, match_id: i64, debate_type: DebateType) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateActive {
            match_id,
            debate_type,
        },
        _ => StoreError::Database(err),
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Connect with exponential backoff between attempts.
    pub async fn connect_with_retry(url: &str, max_retries: u32) -> Result<Self> {
        let mut attempt = 0;
        loop {
            match PgPoolOptions::new()
                .max_connections(10)
                .acquire_timeout(Duration::from_secs(10))
                .connect(url)
                .await
            {
                Ok(pool) => {
                    info!("Connected to PostgreSQL");
                    return Ok(Self::new(pool));
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_retries {
                        return Err(anyhow!(
                            "Failed to connect to database after {} attempts: {}",
                            max_retries,
                            e
                        ));
                    }
                    warn!("Database connection attempt {} failed: {}. Retrying...", attempt, e);
                    tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
                }
            }
        }
    }

    /// Apply the bundled migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| anyhow!("Failed to run migrations: {}", e))?;
        info!("Database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl PersistenceStore for PgStore {
    async fn active_debates(
        &self,
        match_id: i64,
        debate_type: DebateType,
    ) -> Result<Vec<Debate>, StoreError> {
        let query = format!(
            "SELECT {DEBATE_COLUMNS} FROM debates
             WHERE match_id = $1 AND debate_type = $2 AND deleted_at IS NULL
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, DebateRow>(&query)
            .bind(match_id)
            .bind(debate_type.as_str())
            .fetch_all(&self.pool)
            .await?;
        decode_all(rows)
    }

    async fn insert_debate(
        &self,
        debate: &NewDebate,
        cards: &[NewCard],
        supersede: bool,
    ) -> Result<InsertedDebate, StoreError> {
        let mut tx = self.pool.begin().await?;

        let superseded: Vec<DbId> = if supersede {
            sqlx::query_scalar::<_, DbId>(
                "UPDATE debates SET deleted_at = NOW(), updated_at = NOW()
                 WHERE match_id = $1 AND debate_type = $2 AND deleted_at IS NULL
                 RETURNING id",
            )
            .bind(debate.match_id)
            .bind(debate.debate_type.as_str())
            .fetch_all(&mut *tx)
            .await?
        } else {
            Vec::new()
        };

        let query = format!(
            "INSERT INTO debates
                (match_id, debate_type, headline, description, ai_generated, generation_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {DEBATE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DebateRow>(&query)
            .bind(debate.match_id)
            .bind(debate.debate_type.as_str())
            .bind(&debate.headline)
            .bind(&debate.description)
            .bind(debate.ai_generated)
            .bind(debate.generation_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| duplicate_or(e, debate.match_id, debate.debate_type))?;
        let stored = Debate::try_from(row)?;

        let card_query = format!(
            "INSERT INTO debate_cards (debate_id, stance, title, description, ai_generated)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {CARD_COLUMNS}"
        );
        let mut stored_cards = Vec::with_capacity(cards.len());
        for card in cards {
            let row = sqlx::query_as::<_, CardRow>(&card_query)
                .bind(stored.id)
                .bind(card.stance.as_str())
                .bind(&card.title)
                .bind(&card.description)
                .bind(card.ai_generated)
                .fetch_one(&mut *tx)
                .await?;
            stored_cards.push(DebateCard::try_from(row)?);
        }

        sqlx::query(
            "INSERT INTO debate_analytics (debate_id, total_votes, total_comments, engagement_score)
             VALUES ($1, 0, 0, 0)",
        )
        .bind(stored.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(InsertedDebate {
            debate: stored,
            cards: stored_cards,
            superseded,
        })
    }

    async fn debate(&self, id: DbId) -> Result<Option<Debate>, StoreError> {
        let query =
            format!("SELECT {DEBATE_COLUMNS} FROM debates WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, DebateRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Debate::try_from)
            .transpose()
    }

    async fn debate_including_deleted(&self, id: DbId) -> Result<Option<Debate>, StoreError> {
        let query = format!("SELECT {DEBATE_COLUMNS} FROM debates WHERE id = $1");
        sqlx::query_as::<_, DebateRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Debate::try_from)
            .transpose()
    }

    async fn soft_delete_debate(&self, id: DbId) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE debates SET deleted_at = NOW(), updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn restore_debate(&self, id: DbId) -> Result<bool, StoreError> {
        let Some(existing) = self.debate_including_deleted(id).await? else {
            return Ok(false);
        };
        let result = sqlx::query(
            "UPDATE debates SET deleted_at = NULL, updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NOT NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_or(e, existing.match_id, existing.debate_type))?;
        Ok(result.rows_affected() > 0)
    }

    async fn debates_for_match(&self, match_id: i64) -> Result<Vec<Debate>, StoreError> {
        let query = format!(
            "SELECT {DEBATE_COLUMNS} FROM debates
             WHERE match_id = $1 AND deleted_at IS NULL
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, DebateRow>(&query)
            .bind(match_id)
            .fetch_all(&self.pool)
            .await?;
        decode_all(rows)
    }

    async fn top_debates(&self, limit: i64) -> Result<Vec<RankedDebate>, StoreError> {
        let rows = sqlx::query_as::<_, RankedRow>(
            "SELECT d.id, d.match_id, d.debate_type, d.headline, d.description, d.ai_generated,
                    d.generation_id, d.deleted_at, d.created_at, d.updated_at,
                    COALESCE(a.total_votes, 0) AS total_votes,
                    COALESCE(a.total_comments, 0) AS total_comments,
                    COALESCE(a.engagement_score, 0) AS engagement_score,
                    COALESCE(a.updated_at, d.updated_at) AS engagement_updated_at
             FROM debates d
             LEFT JOIN debate_analytics a ON a.debate_id = d.id
             WHERE d.deleted_at IS NULL
             ORDER BY engagement_score DESC, d.created_at DESC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let debate = Debate::try_from(row.debate)?;
                Ok(RankedDebate {
                    engagement: EngagementSnapshot {
                        debate_id: debate.id,
                        total_votes: row.total_votes,
                        total_comments: row.total_comments,
                        score: row.engagement_score,
                        updated_at: row.engagement_updated_at,
                    },
                    debate,
                })
            })
            .collect()
    }

    async fn cards(&self, debate_id: DbId) -> Result<Vec<DebateCard>, StoreError> {
        let query = format!(
            "SELECT {CARD_COLUMNS} FROM debate_cards WHERE debate_id = $1 ORDER BY stance, id"
        );
        let rows = sqlx::query_as::<_, CardRow>(&query)
            .bind(debate_id)
            .fetch_all(&self.pool)
            .await?;
        decode_all(rows)
    }

    async fn card(&self, id: DbId) -> Result<Option<DebateCard>, StoreError> {
        let query = format!("SELECT {CARD_COLUMNS} FROM debate_cards WHERE id = $1");
        sqlx::query_as::<_, CardRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(DebateCard::try_from)
            .transpose()
    }

    async fn insert_card(
        &self,
        debate_id: DbId,
        card: &NewCard,
    ) -> Result<DebateCard, StoreError> {
        let query = format!(
            "INSERT INTO debate_cards (debate_id, stance, title, description, ai_generated)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {CARD_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CardRow>(&query)
            .bind(debate_id)
            .bind(card.stance.as_str())
            .bind(&card.title)
            .bind(&card.description)
            .bind(card.ai_generated)
            .fetch_one(&self.pool)
            .await?;
        DebateCard::try_from(row)
    }

    async fn upsert_vote(&self, vote: &NewVote) -> Result<Vote, StoreError> {
        let query = format!(
            "INSERT INTO votes (debate_card_id, user_id, vote_type, emoji)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (debate_card_id, user_id, vote_type, emoji)
             DO UPDATE SET created_at = NOW()
             RETURNING {VOTE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, VoteRow>(&query)
            .bind(vote.card_id)
            .bind(vote.user_id)
            .bind(vote.vote_type.as_str())
            .bind(vote.emoji.as_deref().unwrap_or(""))
            .fetch_one(&self.pool)
            .await?;
        Vote::try_from(row)
    }

    async fn delete_vote(&self, vote: &NewVote) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "DELETE FROM votes
             WHERE debate_card_id = $1 AND user_id = $2 AND vote_type = $3 AND emoji = $4",
        )
        .bind(vote.card_id)
        .bind(vote.user_id)
        .bind(vote.vote_type.as_str())
        .bind(vote.emoji.as_deref().unwrap_or(""))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn vote_tallies(&self, card_ids: &[DbId]) -> Result<Vec<VoteTally>, StoreError> {
        if card_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, TallyRow>(
            "SELECT debate_card_id, vote_type, emoji, COUNT(*) AS count
             FROM votes
             WHERE debate_card_id = ANY($1)
             GROUP BY debate_card_id, vote_type, emoji",
        )
        .bind(card_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(VoteTally {
                    card_id: row.debate_card_id,
                    vote_type: row.vote_type.parse().map_err(StoreError::Decode)?,
                    emoji: Some(row.emoji).filter(|e| !e.is_empty()),
                    count: row.count,
                })
            })
            .collect()
    }

    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment, StoreError> {
        let query = format!(
            "INSERT INTO comments (debate_id, parent_comment_id, user_id, content)
             VALUES ($1, $2, $3, $4)
             RETURNING {COMMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CommentRow>(&query)
            .bind(comment.debate_id)
            .bind(comment.parent_comment_id)
            .bind(comment.user_id)
            .bind(&comment.content)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn comment(&self, id: DbId) -> Result<Option<Comment>, StoreError> {
        let query = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1");
        let row = sqlx::query_as::<_, CommentRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Comment::from))
    }

    async fn comments(&self, debate_id: DbId) -> Result<Vec<Comment>, StoreError> {
        let query = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE debate_id = $1 ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, CommentRow>(&query)
            .bind(debate_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn count_votes(&self, debate_id: DbId) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM votes v
             JOIN debate_cards c ON c.id = v.debate_card_id
             WHERE c.debate_id = $1",
        )
        .bind(debate_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn count_comments(&self, debate_id: DbId) -> Result<i64, StoreError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments WHERE debate_id = $1")
                .bind(debate_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn upsert_engagement(
        &self,
        debate_id: DbId,
        total_votes: i64,
        total_comments: i64,
        score: f64,
    ) -> Result<EngagementSnapshot, StoreError> {
        let query = format!(
            "INSERT INTO debate_analytics (debate_id, total_votes, total_comments, engagement_score)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (debate_id) DO UPDATE SET
                total_votes = EXCLUDED.total_votes,
                total_comments = EXCLUDED.total_comments,
                engagement_score = EXCLUDED.engagement_score,
                updated_at = NOW()
             RETURNING {ENGAGEMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, EngagementRow>(&query)
            .bind(debate_id)
            .bind(total_votes)
            .bind(total_comments)
            .bind(score)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn engagement(&self, debate_id: DbId) -> Result<Option<EngagementSnapshot>, StoreError> {
        let query =
            format!("SELECT {ENGAGEMENT_COLUMNS} FROM debate_analytics WHERE debate_id = $1");
        let row = sqlx::query_as::<_, EngagementRow>(&query)
            .bind(debate_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(EngagementSnapshot::from))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
