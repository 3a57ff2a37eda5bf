//! Authentication session models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated session, identified by an opaque bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

/// Request body for registering a new account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Request body for signing in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Auth state change observed by clients.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn(Session),
    SignedOut,
}
