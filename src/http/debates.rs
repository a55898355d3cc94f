use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::{AppState, MatchQuery};
use crate::debate::model::{Comment, DbId, Debate, DebateCard, DebateView, RankedDebate, Vote};
use crate::debate::{DebateType, GenerationOutcome, LifecycleRejection, PreviewOutcome, VoteType};
use crate::error::{ServiceError, ServiceResult};
use crate::identity::Principal;
use crate::store::{NewCard, NewDebate};

#[derive(Debug, Deserialize)]
pub(super) struct GenerateRequest {
    match_id: i64,
    #[serde(rename = "type", alias = "debate_type")]
    debate_type: DebateType,
    #[serde(default)]
    regenerate: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct PreviewQuery {
    match_id: Option<String>,
    #[serde(rename = "type")]
    debate_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TopQuery {
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CardRequest {
    debate_id: DbId,
    #[serde(flatten)]
    card: NewCard,
}

#[derive(Debug, Deserialize)]
pub(super) struct VoteRequest {
    card_id: DbId,
    vote_type: VoteType,
    #[serde(default)]
    emoji: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CommentRequest {
    debate_id: DbId,
    #[serde(default)]
    parent_comment_id: Option<DbId>,
    content: String,
}

/// Informational, not an error: clients poll until the match is in the right phase.
fn rejected(rejection: LifecycleRejection) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "status": "rejected",
            "message": rejection.message,
            "phase": rejection.phase,
            "match_status": rejection.status,
        })),
    )
        .into_response()
}

/// POST /debates
pub(super) async fn create(
    State(state): State<AppState>,
    Json(input): Json<NewDebate>,
) -> ServiceResult<(StatusCode, Json<DebateView>)> {
    let debate = state.debates.create_debate(input).await?;
    Ok((StatusCode::CREATED, Json(debate)))
}

/// POST /debates/generate
pub(super) async fn generate(
    State(state): State<AppState>,
    Json(input): Json<GenerateRequest>,
) -> ServiceResult<Response> {
    let outcome = state
        .debates
        .generate(input.match_id, input.debate_type, input.regenerate)
        .await?;

    Ok(match outcome {
        GenerationOutcome::Existing(debate) => (
            StatusCode::OK,
            Json(json!({ "status": "existing", "debate": debate })),
        )
            .into_response(),
        GenerationOutcome::Created { debate, superseded } => (
            StatusCode::CREATED,
            Json(json!({ "status": "created", "debate": debate, "superseded": superseded })),
        )
            .into_response(),
        GenerationOutcome::Rejected(rejection) => rejected(rejection),
    })
}

/// GET /debates/generate?match_id=&type=
pub(super) async fn preview(
    State(state): State<AppState>,
    Query(query): Query<PreviewQuery>,
) -> ServiceResult<Response> {
    let match_id = MatchQuery {
        match_id: query.match_id,
    }
    .match_id()?;
    let debate_type = query
        .debate_type
        .as_deref()
        .unwrap_or("")
        .parse::<DebateType>()
        .map_err(ServiceError::Validation)?;

    Ok(match state.debates.preview(match_id, debate_type).await? {
        PreviewOutcome::Ready(draft) => (
            StatusCode::OK,
            Json(json!({ "status": "preview", "draft": draft })),
        )
            .into_response(),
        PreviewOutcome::Rejected(rejection) => rejected(rejection),
    })
}

/// GET /debates/match?match_id=
pub(super) async fn for_match(
    State(state): State<AppState>,
    Query(query): Query<MatchQuery>,
) -> ServiceResult<Json<Vec<Debate>>> {
    let debates = state.debates.debates_for_match(query.match_id()?).await?;
    Ok(Json(debates))
}

/// GET /debates/top?limit=
pub(super) async fn top(
    State(state): State<AppState>,
    Query(query): Query<TopQuery>,
) -> ServiceResult<Json<Vec<RankedDebate>>> {
    Ok(Json(state.debates.top_debates(query.limit).await?))
}

/// GET /debates/:id
pub(super) async fn get(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> ServiceResult<Json<DebateView>> {
    Ok(Json(state.debates.get_debate(id).await?))
}

/// DELETE /debates/:id
pub(super) async fn delete(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> ServiceResult<StatusCode> {
    state.debates.soft_delete_debate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /debates/:id/restore
pub(super) async fn restore(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> ServiceResult<Json<DebateView>> {
    Ok(Json(state.debates.restore_debate(id).await?))
}

/// POST /debates/cards
pub(super) async fn create_card(
    State(state): State<AppState>,
    Json(input): Json<CardRequest>,
) -> ServiceResult<(StatusCode, Json<DebateCard>)> {
    let card = state.debates.create_card(input.debate_id, input.card).await?;
    Ok((StatusCode::CREATED, Json(card)))
}

/// POST /debates/votes
pub(super) async fn cast_vote(
    State(state): State<AppState>,
    principal: Principal,
    Json(input): Json<VoteRequest>,
) -> ServiceResult<Json<Vote>> {
    let vote = state
        .debates
        .cast_vote(&principal, input.card_id, input.vote_type, input.emoji)
        .await?;
    Ok(Json(vote))
}

/// DELETE /debates/votes
pub(super) async fn remove_vote(
    State(state): State<AppState>,
    principal: Principal,
    Json(input): Json<VoteRequest>,
) -> ServiceResult<StatusCode> {
    state
        .debates
        .remove_vote(&principal, input.card_id, input.vote_type, input.emoji)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /debates/comments
pub(super) async fn add_comment(
    State(state): State<AppState>,
    principal: Principal,
    Json(input): Json<CommentRequest>,
) -> ServiceResult<(StatusCode, Json<Comment>)> {
    let comment = state
        .debates
        .add_comment(
            &principal,
            input.debate_id,
            input.parent_comment_id,
            &input.content,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// GET /debates/:id/comments
pub(super) async fn comments(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> ServiceResult<Json<Vec<Comment>>> {
    Ok(Json(state.debates.comments(id).await?))
}
