//! Auth API endpoints.

use axum::{extract::State, Json};
use chrono::Duration;

use super::{success, ApiResult};
use crate::auth::{self, CurrentUser};
use crate::models::{Session, SignInRequest, SignUpRequest};
use crate::AppState;

fn session_ttl(state: &AppState) -> Duration {
    Duration::days(state.config.session_ttl_days)
}

/// POST /api/auth/signup - Register and sign in.
pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> ApiResult<Session> {
    let session = auth::sign_up(&state.repo, &request, session_ttl(&state)).await?;
    success(session)
}

/// POST /api/auth/signin - Exchange credentials for a session.
pub async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> ApiResult<Session> {
    let session = auth::sign_in(&state.repo, &request, session_ttl(&state)).await?;
    tracing::info!(user_id = %session.user_id, "Signed in");
    success(session)
}

/// POST /api/auth/signout - Revoke the current session.
pub async fn sign_out(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> ApiResult<()> {
    auth::sign_out(&state.repo, &session.token).await?;
    tracing::info!(user_id = %session.user_id, "Signed out");
    success(())
}

/// GET /api/auth/session - The session behind the bearer token.
pub async fn get_session(CurrentUser(session): CurrentUser) -> ApiResult<Session> {
    success(session)
}
