//! Argument model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which side of a debate an argument takes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    For,
    Against,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::For => "for",
            Position::Against => "against",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "for" => Some(Position::For),
            "against" => Some(Position::Against),
            _ => None,
        }
    }
}

/// A user-submitted statement attached to a debate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Argument {
    pub id: String,
    pub debate_id: String,
    pub user_id: String,
    pub position: Position,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The slice of a profile shown next to an argument.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// An argument joined with its author's profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentWithAuthor {
    #[serde(flatten)]
    pub argument: Argument,
    /// Absent when the author's profile row is missing.
    pub author: Option<AuthorSummary>,
}

/// Request body for posting an argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateArgumentRequest {
    pub position: Position,
    pub content: String,
}
