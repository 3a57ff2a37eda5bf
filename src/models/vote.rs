//! Vote model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single user's up/down judgment on one argument.
///
/// At most one row exists per `(argument_id, user_id)` pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: String,
    pub argument_id: String,
    pub user_id: String,
    /// `true` is an upvote, `false` a downvote.
    pub vote_type: bool,
    pub created_at: DateTime<Utc>,
}

/// Direction of a vote.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn as_vote_type(self) -> bool {
        matches!(self, VoteDirection::Up)
    }

    pub fn from_vote_type(vote_type: bool) -> Self {
        if vote_type {
            VoteDirection::Up
        } else {
            VoteDirection::Down
        }
    }
}

/// Request body for casting a new vote.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    pub argument_id: String,
    pub vote_type: bool,
}

/// Request body for changing the direction of an existing vote.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVoteRequest {
    pub vote_type: bool,
}

/// Query parameters for reading votes of a set of arguments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteQuery {
    /// Comma-separated argument ids.
    #[serde(default)]
    pub argument_ids: String,
}
