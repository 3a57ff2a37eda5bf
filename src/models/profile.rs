//! Profile model: the public identity record of a user.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Argument, Debate};

/// Public profile; `id` is shared with the auth identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default)]
    pub expertise_areas: Vec<String>,
    /// Network name to URL, e.g. `twitter -> https://...`
    #[serde(default)]
    pub social_links: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for updating a profile. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub expertise_areas: Option<Vec<String>>,
    #[serde(default)]
    pub social_links: Option<BTreeMap<String, String>>,
}

/// Aggregate activity numbers shown on a profile page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub debates_created: i64,
    pub arguments_posted: i64,
    pub upvotes_received: i64,
}

/// A profile page: the profile plus its activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePage {
    pub profile: Profile,
    pub stats: UserStats,
    pub debates: Vec<Debate>,
    pub arguments: Vec<Argument>,
}

/// Query parameters for a username availability check.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsernameQuery {
    pub username: String,
    #[serde(default)]
    pub exclude_id: Option<String>,
}

/// Result of a username availability check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsernameAvailability {
    pub username: String,
    pub taken: bool,
}
