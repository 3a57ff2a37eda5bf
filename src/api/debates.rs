//! Debate API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{success, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{CreateDebateRequest, Debate, DebateFilter};
use crate::AppState;

/// GET /api/debates - List debates, newest first.
pub async fn list_debates(
    State(state): State<AppState>,
    Query(filter): Query<DebateFilter>,
) -> ApiResult<Vec<Debate>> {
    success(state.repo.list_debates(&filter).await?)
}

/// GET /api/debates/:id - Get a single debate.
pub async fn get_debate(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Debate> {
    match state.repo.get_debate(&id).await? {
        Some(debate) => success(debate),
        None => Err(AppError::NotFound(format!("Debate {} not found", id))),
    }
}

/// POST /api/debates - Create a new debate.
pub async fn create_debate(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<CreateDebateRequest>,
) -> ApiResult<Debate> {
    let debate = state.repo.create_debate(&session.user_id, &request).await?;
    tracing::info!(debate_id = %debate.id, user_id = %session.user_id, "Debate created");
    success(debate)
}
