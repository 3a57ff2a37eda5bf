//! Vote API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{success, ApiResult};
use crate::auth::CurrentUser;
use crate::models::{CastVoteRequest, UpdateVoteRequest, Vote, VoteQuery};
use crate::AppState;

/// GET /api/votes?argumentIds=a,b - Votes on a set of arguments.
pub async fn list_votes(
    State(state): State<AppState>,
    Query(query): Query<VoteQuery>,
) -> ApiResult<Vec<Vote>> {
    let ids: Vec<String> = query
        .argument_ids
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    success(state.repo.list_votes(&ids).await?)
}

/// GET /api/debates/:id/votes - Votes on every argument of a debate.
pub async fn list_debate_votes(
    State(state): State<AppState>,
    Path(debate_id): Path<String>,
) -> ApiResult<Vec<Vote>> {
    success(state.repo.list_votes_for_debate(&debate_id).await?)
}

/// POST /api/votes - Cast a first vote on an argument.
pub async fn cast_vote(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<CastVoteRequest>,
) -> ApiResult<Vote> {
    success(state.repo.insert_vote(&session.user_id, &request).await?)
}

/// PUT /api/votes/:id - Change the direction of your vote.
pub async fn update_vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<UpdateVoteRequest>,
) -> ApiResult<Vote> {
    success(
        state
            .repo
            .update_vote(&id, &session.user_id, request.vote_type)
            .await?,
    )
}

/// DELETE /api/votes/:id - Withdraw your vote.
pub async fn delete_vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CurrentUser(session): CurrentUser,
) -> ApiResult<()> {
    state.repo.delete_vote(&id, &session.user_id).await?;
    success(())
}
