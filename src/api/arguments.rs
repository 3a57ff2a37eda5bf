//! Argument API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{success, ApiResult};
use crate::auth::CurrentUser;
use crate::models::{Argument, ArgumentWithAuthor, CreateArgumentRequest};
use crate::AppState;

/// GET /api/debates/:id/arguments - Arguments of a debate with their authors.
pub async fn list_arguments(
    State(state): State<AppState>,
    Path(debate_id): Path<String>,
) -> ApiResult<Vec<ArgumentWithAuthor>> {
    success(state.repo.list_arguments(&debate_id).await?)
}

/// POST /api/debates/:id/arguments - Post an argument.
pub async fn create_argument(
    State(state): State<AppState>,
    Path(debate_id): Path<String>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<CreateArgumentRequest>,
) -> ApiResult<Argument> {
    let argument = state
        .repo
        .create_argument(&debate_id, &session.user_id, &request)
        .await?;
    tracing::info!(
        argument_id = %argument.id,
        debate_id = %debate_id,
        position = argument.position.as_str(),
        "Argument posted"
    );
    success(argument)
}
