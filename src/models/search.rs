//! Search result rows.

use serde::{Deserialize, Serialize};

/// A debate matched by a pattern search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DebateHit {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
}

/// A profile matched by a pattern search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileHit {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// Search query parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Both result groups, each in backend order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHits {
    pub debates: Vec<DebateHit>,
    pub profiles: Vec<ProfileHit>,
}
