//! Profile API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{success, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{
    DebateFilter, Profile, ProfilePage, UpdateProfileRequest, UsernameAvailability,
    UsernameQuery,
};
use crate::AppState;

/// GET /api/profiles/:username - Public profile page.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<ProfilePage> {
    let profile = state
        .repo
        .get_profile_by_username(&username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", username)))?;

    let stats = state.repo.user_stats(&profile.id).await?;
    let debates = state
        .repo
        .list_debates(&DebateFilter {
            created_by: Some(profile.id.clone()),
            ..Default::default()
        })
        .await?;
    let arguments = state.repo.list_arguments_by_user(&profile.id).await?;

    success(ProfilePage {
        profile,
        stats,
        debates,
        arguments,
    })
}

/// GET /api/profiles/availability?username=..&excludeId=.. - Username uniqueness check.
pub async fn check_username(
    State(state): State<AppState>,
    Query(query): Query<UsernameQuery>,
) -> ApiResult<UsernameAvailability> {
    let taken = state
        .repo
        .username_taken(query.username.trim(), query.exclude_id.as_deref())
        .await?;
    success(UsernameAvailability {
        username: query.username,
        taken,
    })
}

/// GET /api/profiles/me - The caller's own profile.
pub async fn get_my_profile(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> ApiResult<Profile> {
    match state.repo.get_profile(&session.user_id).await? {
        Some(profile) => success(profile),
        None => Err(AppError::NotFound("Profile not found".to_string())),
    }
}

/// PUT /api/profiles/me - Update the caller's own profile.
pub async fn update_my_profile(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<Profile> {
    let profile = state
        .repo
        .update_profile(&session.user_id, &request)
        .await?;
    tracing::info!(user_id = %profile.id, "Profile updated");
    success(profile)
}
