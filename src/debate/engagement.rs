//! Engagement scoring.

use tracing::warn;

use super::model::{DbId, EngagementSnapshot};
use crate::store::{PersistenceStore, StoreError};

/// Weight of one comment relative to one vote.
pub const COMMENT_WEIGHT: f64 = 2.0;

pub fn score(total_votes: i64, total_comments: i64) -> f64 {
    total_votes as f64 + total_comments as f64 * COMMENT_WEIGHT
}

/// Recount votes and comments for a debate and overwrite its snapshot.
pub async fn recompute(
    store: &dyn PersistenceStore,
    debate_id: DbId,
) -> Result<EngagementSnapshot, StoreError> {
    let votes = store.count_votes(debate_id).await?;
    let comments = store.count_comments(debate_id).await?;
    store
        .upsert_engagement(debate_id, votes, comments, score(votes, comments))
        .await
}

/// [`recompute`], with failure logged instead of returned. The snapshot is
/// derived data; the mutation that triggered it has already succeeded.
pub async fn refresh(store: &dyn PersistenceStore, debate_id: DbId) {
    if let Err(e) = recompute(store, debate_id).await {
        warn!("Engagement recompute failed for debate {}: {}", debate_id, e);
    }
}
