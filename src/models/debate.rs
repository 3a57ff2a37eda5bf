//! Debate model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a debate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DebateStatus {
    Active,
    Completed,
}

impl DebateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DebateStatus::Active => "active",
            DebateStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(DebateStatus::Active),
            "completed" => Some(DebateStatus::Completed),
            _ => None,
        }
    }
}

/// A debate topic around which arguments are organized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Debate {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: DebateStatus,
    pub participant_count: i64,
    pub argument_count: i64,
    pub featured: bool,
}

/// Request body for creating a new debate.
///
/// `created_at` may be supplied by the caller so that `ends_at` can be derived from the
/// same instant. The server fills it in when omitted and replaces values more than a
/// minute away from its own clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDebateRequest {
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub ends_at: DateTime<Utc>,
}

/// Query parameters for listing debates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebateFilter {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub featured: Option<bool>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}
