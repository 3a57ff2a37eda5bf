//! Argument list and vote control for one debate.

use std::collections::HashMap;
use std::sync::Arc;

use super::{ClientContext, ClientError, QueryKey};
use crate::models::{
    Argument, ArgumentWithAuthor, CastVoteRequest, CreateArgumentRequest, Debate, Position,
    Vote, VoteDirection,
};

/// Arguments split by side, each in fetch order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebateArguments {
    pub for_arguments: Vec<ArgumentWithAuthor>,
    pub against_arguments: Vec<ArgumentWithAuthor>,
}

impl DebateArguments {
    pub fn partition(arguments: &[ArgumentWithAuthor]) -> Self {
        let (for_arguments, against_arguments) = arguments
            .iter()
            .cloned()
            .partition(|a| a.argument.position == Position::For);
        Self {
            for_arguments,
            against_arguments,
        }
    }

    pub fn len(&self) -> usize {
        self.for_arguments.len() + self.against_arguments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteTally {
    pub up: u32,
    pub down: u32,
}

impl VoteTally {
    pub fn score(&self) -> i64 {
        self.up as i64 - self.down as i64
    }
}

/// Tallies per argument plus the viewer's own vote on each, from one vote fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoteSnapshot {
    pub tallies: HashMap<String, VoteTally>,
    pub mine: HashMap<String, Vote>,
}

impl VoteSnapshot {
    pub fn tally(&self, argument_id: &str) -> VoteTally {
        self.tallies.get(argument_id).copied().unwrap_or_default()
    }

    pub fn my_direction(&self, argument_id: &str) -> Option<VoteDirection> {
        self.mine
            .get(argument_id)
            .map(|v| VoteDirection::from_vote_type(v.vote_type))
    }
}

pub fn summarize_votes(votes: &[Vote], viewer: Option<&str>) -> VoteSnapshot {
    let mut snapshot = VoteSnapshot::default();
    for vote in votes {
        let tally = snapshot.tallies.entry(vote.argument_id.clone()).or_default();
        if vote.vote_type {
            tally.up += 1;
        } else {
            tally.down += 1;
        }
        if viewer == Some(vote.user_id.as_str()) {
            snapshot.mine.insert(vote.argument_id.clone(), vote.clone());
        }
    }
    snapshot
}

/// What a vote click did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Inserted,
    Removed,
    Changed,
}

/// Reads and writes for the argument columns of a debate page.
pub struct ArgumentBoard {
    ctx: ClientContext,
    debate_id: String,
}

impl ArgumentBoard {
    pub fn new(ctx: ClientContext, debate_id: impl Into<String>) -> Self {
        Self {
            ctx,
            debate_id: debate_id.into(),
        }
    }

    pub fn debate_id(&self) -> &str {
        &self.debate_id
    }

    /// The debate header. `None` renders as the inline not-found state.
    pub async fn debate(&self) -> Result<Option<Debate>, ClientError> {
        let remote = self.ctx.remote.clone();
        let id = self.debate_id.clone();
        let result = self
            .ctx
            .cache
            .fetch(QueryKey::Debate(id.clone()), || async move {
                Ok(remote.get_debate(&id).await?)
            })
            .await;
        self.ctx
            .reported("load debate", result)
            .map(|debate: Arc<Option<Debate>>| (*debate).clone())
    }

    async fn argument_rows(&self) -> Result<Arc<Vec<ArgumentWithAuthor>>, ClientError> {
        let remote = self.ctx.remote.clone();
        let id = self.debate_id.clone();
        self.ctx
            .cache
            .fetch(QueryKey::Arguments(id.clone()), || async move {
                Ok(remote.list_arguments(&id).await?)
            })
            .await
    }

    async fn vote_rows(&self) -> Result<Arc<Vec<Vote>>, ClientError> {
        let arguments = self.argument_rows().await?;
        let ids: Vec<String> = arguments.iter().map(|a| a.argument.id.clone()).collect();
        let remote = self.ctx.remote.clone();
        self.ctx
            .cache
            .fetch(QueryKey::Votes(self.debate_id.clone()), || async move {
                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                Ok(remote.list_votes(&ids).await?)
            })
            .await
    }

    pub async fn arguments(&self) -> Result<DebateArguments, ClientError> {
        let result = self.argument_rows().await;
        self.ctx
            .reported("load arguments", result)
            .map(|rows| DebateArguments::partition(&rows))
    }

    pub async fn votes(&self) -> Result<VoteSnapshot, ClientError> {
        let result = self.vote_rows().await;
        let viewer = self.ctx.session.current().map(|s| s.user_id);
        self.ctx
            .reported("load votes", result)
            .map(|rows| summarize_votes(&rows, viewer.as_deref()))
    }

    /// Insert, toggle off or flip the viewer's vote on one argument.
    pub async fn cast_vote(
        &self,
        argument_id: &str,
        direction: VoteDirection,
    ) -> Result<VoteOutcome, ClientError> {
        let result = self.try_cast_vote(argument_id, direction).await;
        self.ctx.reported("vote", result)
    }

    async fn try_cast_vote(
        &self,
        argument_id: &str,
        direction: VoteDirection,
    ) -> Result<VoteOutcome, ClientError> {
        let viewer = self
            .ctx
            .session
            .current()
            .ok_or_else(|| ClientError::AuthRequired("You must be logged in to vote".into()))?;

        let votes = self.vote_rows().await?;
        let existing = votes
            .iter()
            .find(|v| v.argument_id == argument_id && v.user_id == viewer.user_id);

        let outcome = match existing {
            None => {
                self.ctx
                    .remote
                    .insert_vote(&CastVoteRequest {
                        argument_id: argument_id.to_string(),
                        vote_type: direction.as_vote_type(),
                    })
                    .await?;
                VoteOutcome::Inserted
            }
            Some(vote) if vote.vote_type == direction.as_vote_type() => {
                self.ctx.remote.delete_vote(&vote.id).await?;
                VoteOutcome::Removed
            }
            Some(vote) => {
                self.ctx
                    .remote
                    .update_vote(&vote.id, direction.as_vote_type())
                    .await?;
                VoteOutcome::Changed
            }
        };

        tracing::debug!(argument_id, ?direction, ?outcome, "Vote recorded");
        self.ctx
            .cache
            .invalidate(&QueryKey::Votes(self.debate_id.clone()));
        Ok(outcome)
    }

    /// Post an argument. The debate's counters are maintained by the backend.
    pub async fn submit_argument(
        &self,
        position: Position,
        content: &str,
    ) -> Result<Argument, ClientError> {
        let result = self.try_submit_argument(position, content).await;
        if result.is_ok() {
            self.ctx.notifier.success("Argument posted successfully!");
        }
        self.ctx.reported("post argument", result)
    }

    async fn try_submit_argument(
        &self,
        position: Position,
        content: &str,
    ) -> Result<Argument, ClientError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ClientError::Validation("Please enter your argument".into()));
        }
        if !self.ctx.session.is_logged_in() {
            return Err(ClientError::AuthRequired(
                "You must be logged in to post an argument".into(),
            ));
        }

        let argument = self
            .ctx
            .remote
            .insert_argument(
                &self.debate_id,
                &CreateArgumentRequest {
                    position,
                    content: content.to_string(),
                },
            )
            .await?;

        self.ctx
            .cache
            .invalidate(&QueryKey::Arguments(self.debate_id.clone()));
        self.ctx
            .cache
            .invalidate(&QueryKey::Debate(self.debate_id.clone()));
        Ok(argument)
    }
}
