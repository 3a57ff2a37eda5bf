//! Object storage API endpoints.

use axum::{
    body::Bytes,
    extract::{Path, State},
};
use serde::Serialize;

use super::{success, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::storage::owner_segment;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedObject {
    pub public_url: String,
}

/// PUT /api/storage/:bucket/*path - Upload (or replace) an object.
///
/// The first path segment must be the caller's user id.
pub async fn upload_object(
    State(state): State<AppState>,
    Path((bucket, path)): Path<(String, String)>,
    CurrentUser(session): CurrentUser,
    body: Bytes,
) -> ApiResult<UploadedObject> {
    if owner_segment(&path) != Some(session.user_id.as_str()) {
        return Err(AppError::Forbidden(
            "Objects must be stored under your own user id".to_string(),
        ));
    }

    let public_url = state.storage.upload(&bucket, &path, &body).await?;
    success(UploadedObject { public_url })
}
