//! In-memory [`RemoteClient`] for exercising view logic without a database.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{ClientContext, RemoteClient, SessionInfo};
use crate::errors::AppError;
use crate::models::{
    Argument, ArgumentWithAuthor, AuthEvent, AuthorSummary, CastVoteRequest, ChangeEvent,
    ChangeKind, ChannelFilter, CreateArgumentRequest, CreateDebateRequest, Debate,
    DebateFilter, DebateHit, DebateStatus, Profile, ProfileHit, Session, SignInRequest,
    SignUpRequest, Table, UpdateProfileRequest, UserStats, Vote,
};
use crate::realtime::{RealtimeHub, Subscription};

#[derive(Default)]
struct StubState {
    session: Option<Session>,
    profiles: Vec<Profile>,
    debates: Vec<Debate>,
    arguments: Vec<Argument>,
    votes: Vec<Vote>,
    uploads: Vec<(String, String, usize)>,
    search_delays: HashMap<String, Duration>,
    calls: Vec<String>,
}

pub(crate) struct StubClient {
    state: Mutex<StubState>,
    hub: RealtimeHub,
    auth_tx: broadcast::Sender<AuthEvent>,
}

impl StubClient {
    pub fn new() -> Self {
        let (auth_tx, _) = broadcast::channel(16);
        Self {
            state: Mutex::new(StubState::default()),
            hub: RealtimeHub::new(),
            auth_tx,
        }
    }

    fn state(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap()
    }

    fn record(&self, call: impl Into<String>) {
        self.state().calls.push(call.into());
    }

    fn caller(&self) -> Result<Session, AppError> {
        self.state()
            .session
            .clone()
            .ok_or_else(|| AppError::Unauthorized("You must be logged in".into()))
    }

    pub fn hub(&self) -> &RealtimeHub {
        &self.hub
    }

    /// Every recorded call, e.g. `insert_vote(a1)`.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<String> {
        let prefix = format!("{}(", method);
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(&prefix))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn add_user(&self, username: &str) -> Profile {
        let now = Utc::now();
        let profile = Profile {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            full_name: None,
            bio: None,
            avatar_url: None,
            location: None,
            website: None,
            expertise_areas: Vec::new(),
            social_links: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        };
        self.state().profiles.push(profile.clone());
        profile
    }

    /// Sign in as an existing user, emitting the auth event.
    pub async fn sign_in_as(&self, username: &str) -> Session {
        self.sign_in(&SignInRequest {
            email: format!("{}@example.com", username),
            password: "stub-password".into(),
        })
        .await
        .unwrap()
    }

    pub fn add_debate(&self, title: &str, created_by: &str) -> Debate {
        let now = Utc::now();
        let debate = Debate {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: format!("About {}", title),
            category: "Technology".to_string(),
            created_by: created_by.to_string(),
            created_at: now,
            ends_at: now + chrono::Duration::days(7),
            status: DebateStatus::Active,
            participant_count: 0,
            argument_count: 0,
            featured: false,
        };
        self.state().debates.push(debate.clone());
        debate
    }

    pub fn add_argument(&self, debate_id: &str, user_id: &str, position: crate::models::Position, content: &str) -> Argument {
        let now = Utc::now();
        let argument = Argument {
            id: Uuid::new_v4().to_string(),
            debate_id: debate_id.to_string(),
            user_id: user_id.to_string(),
            position,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.state().arguments.push(argument.clone());
        argument
    }

    pub fn debate(&self, id: &str) -> Option<Debate> {
        self.state().debates.iter().find(|d| d.id == id).cloned()
    }

    pub fn votes(&self) -> Vec<Vote> {
        self.state().votes.clone()
    }

    pub fn uploads(&self) -> Vec<(String, String, usize)> {
        self.state().uploads.clone()
    }

    pub fn delay_search(&self, term: &str, delay: Duration) {
        self.state().search_delays.insert(term.to_string(), delay);
    }

    fn publish(&self, event: ChangeEvent) {
        self.hub.publish(event);
    }
}

/// A context over a fresh stub, with the session store mirroring `user` when given.
pub(crate) async fn stub_context(user: Option<&str>) -> (Arc<StubClient>, ClientContext) {
    let stub = Arc::new(StubClient::new());
    let ctx = ClientContext::new(stub.clone());
    if let Some(username) = user {
        stub.add_user(username);
        let session = stub.sign_in_as(username).await;
        ctx.session.set(Some(SessionInfo::from(&session)));
    }
    stub.clear_calls();
    (stub, ctx)
}

#[async_trait]
impl RemoteClient for StubClient {
    async fn current_session(&self) -> Result<Option<Session>, AppError> {
        self.record("current_session()");
        Ok(self.state().session.clone())
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<Session, AppError> {
        self.record(format!("sign_up({})", request.username));
        let profile = self.add_user(&request.username);
        let session = Session {
            token: Uuid::new_v4().simple().to_string(),
            user_id: profile.id,
            username: profile.username,
            expires_at: Utc::now() + chrono::Duration::days(30),
        };
        self.state().session = Some(session.clone());
        let _ = self.auth_tx.send(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_in(&self, request: &SignInRequest) -> Result<Session, AppError> {
        self.record(format!("sign_in({})", request.email));
        let username = request.email.trim_end_matches("@example.com");
        let profile = self
            .state()
            .profiles
            .iter()
            .find(|p| p.username == username)
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Invalid email or password".into()))?;
        let session = Session {
            token: Uuid::new_v4().simple().to_string(),
            user_id: profile.id,
            username: profile.username,
            expires_at: Utc::now() + chrono::Duration::days(30),
        };
        self.state().session = Some(session.clone());
        let _ = self.auth_tx.send(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        self.record("sign_out()");
        self.state().session = None;
        let _ = self.auth_tx.send(AuthEvent::SignedOut);
        Ok(())
    }

    fn auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth_tx.subscribe()
    }

    async fn list_debates(&self, filter: &DebateFilter) -> Result<Vec<Debate>, AppError> {
        self.record("list_debates()");
        let mut debates: Vec<Debate> = self
            .state()
            .debates
            .iter()
            .filter(|d| filter.category.as_ref().map_or(true, |c| &d.category == c))
            .filter(|d| filter.featured.map_or(true, |f| d.featured == f))
            .filter(|d| filter.created_by.as_ref().map_or(true, |u| &d.created_by == u))
            .cloned()
            .collect();
        debates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(debates)
    }

    async fn get_debate(&self, id: &str) -> Result<Option<Debate>, AppError> {
        self.record(format!("get_debate({})", id));
        Ok(self.debate(id))
    }

    async fn list_arguments(&self, debate_id: &str) -> Result<Vec<ArgumentWithAuthor>, AppError> {
        self.record(format!("list_arguments({})", debate_id));
        let state = self.state();
        Ok(state
            .arguments
            .iter()
            .filter(|a| a.debate_id == debate_id)
            .map(|a| ArgumentWithAuthor {
                argument: a.clone(),
                author: state
                    .profiles
                    .iter()
                    .find(|p| p.id == a.user_id)
                    .map(|p| AuthorSummary {
                        id: p.id.clone(),
                        username: p.username.clone(),
                        full_name: p.full_name.clone(),
                        avatar_url: p.avatar_url.clone(),
                    }),
            })
            .collect())
    }

    async fn list_votes(&self, argument_ids: &[String]) -> Result<Vec<Vote>, AppError> {
        self.record(format!("list_votes({})", argument_ids.join(",")));
        Ok(self
            .state()
            .votes
            .iter()
            .filter(|v| argument_ids.contains(&v.argument_id))
            .cloned()
            .collect())
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        self.record(format!("get_profile({})", user_id));
        Ok(self.state().profiles.iter().find(|p| p.id == user_id).cloned())
    }

    async fn get_profile_by_username(&self, username: &str) -> Result<Option<Profile>, AppError> {
        self.record(format!("get_profile_by_username({})", username));
        Ok(self
            .state()
            .profiles
            .iter()
            .find(|p| p.username == username)
            .cloned())
    }

    async fn user_stats(&self, user_id: &str) -> Result<UserStats, AppError> {
        self.record(format!("user_stats({})", user_id));
        let state = self.state();
        let upvotes_received = state
            .votes
            .iter()
            .filter(|v| v.vote_type)
            .filter(|v| {
                state
                    .arguments
                    .iter()
                    .any(|a| a.id == v.argument_id && a.user_id == user_id)
            })
            .count();
        Ok(UserStats {
            debates_created: state.debates.iter().filter(|d| d.created_by == user_id).count() as i64,
            arguments_posted: state.arguments.iter().filter(|a| a.user_id == user_id).count() as i64,
            upvotes_received: upvotes_received as i64,
        })
    }

    async fn list_arguments_by_user(&self, user_id: &str) -> Result<Vec<Argument>, AppError> {
        self.record(format!("list_arguments_by_user({})", user_id));
        let mut arguments: Vec<Argument> = self
            .state()
            .arguments
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        arguments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(arguments)
    }

    async fn username_taken(
        &self,
        username: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, AppError> {
        self.record(format!("username_taken({})", username));
        Ok(self
            .state()
            .profiles
            .iter()
            .any(|p| p.username == username && Some(p.id.as_str()) != exclude_id))
    }

    async fn search_debates(&self, term: &str, limit: i64) -> Result<Vec<DebateHit>, AppError> {
        self.record(format!("search_debates({})", term));
        let delay = self.state().search_delays.get(term).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let needle = term.to_lowercase();
        Ok(self
            .state()
            .debates
            .iter()
            .filter(|d| {
                d.title.to_lowercase().contains(&needle)
                    || d.description.to_lowercase().contains(&needle)
            })
            .take(limit as usize)
            .map(|d| DebateHit {
                id: d.id.clone(),
                title: d.title.clone(),
                description: d.description.clone(),
                category: d.category.clone(),
            })
            .collect())
    }

    async fn search_profiles(&self, term: &str, limit: i64) -> Result<Vec<ProfileHit>, AppError> {
        self.record(format!("search_profiles({})", term));
        let needle = term.to_lowercase();
        Ok(self
            .state()
            .profiles
            .iter()
            .filter(|p| {
                p.username.to_lowercase().contains(&needle)
                    || p.full_name
                        .as_deref()
                        .is_some_and(|n| n.to_lowercase().contains(&needle))
            })
            .take(limit as usize)
            .map(|p| ProfileHit {
                id: p.id.clone(),
                username: p.username.clone(),
                full_name: p.full_name.clone(),
            })
            .collect())
    }

    async fn insert_debate(&self, request: &CreateDebateRequest) -> Result<Debate, AppError> {
        self.record(format!("insert_debate({})", request.title));
        let caller = self.caller()?;
        let debate = Debate {
            id: Uuid::new_v4().to_string(),
            title: request.title.clone(),
            description: request.description.clone(),
            category: request.category.clone(),
            created_by: caller.user_id,
            created_at: request.created_at.unwrap_or_else(Utc::now),
            ends_at: request.ends_at,
            status: DebateStatus::Active,
            participant_count: 0,
            argument_count: 0,
            featured: false,
        };
        self.state().debates.push(debate.clone());
        self.publish(ChangeEvent::new(Table::Debates, ChangeKind::Insert, &debate.id));
        Ok(debate)
    }

    async fn insert_argument(
        &self,
        debate_id: &str,
        request: &CreateArgumentRequest,
    ) -> Result<Argument, AppError> {
        self.record(format!("insert_argument({})", debate_id));
        let caller = self.caller()?;
        if self.debate(debate_id).is_none() {
            return Err(AppError::NotFound(format!("Debate {} not found", debate_id)));
        }
        let argument = self.add_argument(debate_id, &caller.user_id, request.position, &request.content);
        {
            let mut state = self.state();
            let participants = {
                let mut authors: Vec<&str> = state
                    .arguments
                    .iter()
                    .filter(|a| a.debate_id == debate_id)
                    .map(|a| a.user_id.as_str())
                    .collect();
                authors.sort_unstable();
                authors.dedup();
                authors.len() as i64
            };
            if let Some(debate) = state.debates.iter_mut().find(|d| d.id == debate_id) {
                debate.argument_count += 1;
                debate.participant_count = participants;
            }
        }
        self.publish(
            ChangeEvent::new(Table::Arguments, ChangeKind::Insert, &argument.id).in_debate(debate_id),
        );
        Ok(argument)
    }

    async fn insert_vote(&self, request: &CastVoteRequest) -> Result<Vote, AppError> {
        self.record(format!("insert_vote({})", request.argument_id));
        let caller = self.caller()?;
        let mut state = self.state();
        if state
            .votes
            .iter()
            .any(|v| v.argument_id == request.argument_id && v.user_id == caller.user_id)
        {
            return Err(AppError::Conflict(
                "You have already voted on this argument".into(),
            ));
        }
        let vote = Vote {
            id: Uuid::new_v4().to_string(),
            argument_id: request.argument_id.clone(),
            user_id: caller.user_id,
            vote_type: request.vote_type,
            created_at: Utc::now(),
        };
        state.votes.push(vote.clone());
        drop(state);
        self.publish(ChangeEvent::new(Table::Votes, ChangeKind::Insert, &vote.id));
        Ok(vote)
    }

    async fn update_vote(&self, vote_id: &str, vote_type: bool) -> Result<Vote, AppError> {
        self.record(format!("update_vote({})", vote_id));
        let caller = self.caller()?;
        let mut state = self.state();
        let vote = state
            .votes
            .iter_mut()
            .find(|v| v.id == vote_id)
            .ok_or_else(|| AppError::NotFound(format!("Vote {} not found", vote_id)))?;
        if vote.user_id != caller.user_id {
            return Err(AppError::Forbidden("You can only change your own vote".into()));
        }
        vote.vote_type = vote_type;
        let vote = vote.clone();
        drop(state);
        self.publish(ChangeEvent::new(Table::Votes, ChangeKind::Update, vote_id));
        Ok(vote)
    }

    async fn delete_vote(&self, vote_id: &str) -> Result<(), AppError> {
        self.record(format!("delete_vote({})", vote_id));
        let caller = self.caller()?;
        let mut state = self.state();
        let before = state.votes.len();
        state
            .votes
            .retain(|v| !(v.id == vote_id && v.user_id == caller.user_id));
        if state.votes.len() == before {
            return Err(AppError::NotFound(format!("Vote {} not found", vote_id)));
        }
        drop(state);
        self.publish(ChangeEvent::new(Table::Votes, ChangeKind::Delete, vote_id));
        Ok(())
    }

    async fn update_profile(&self, request: &UpdateProfileRequest) -> Result<Profile, AppError> {
        self.record("update_profile()");
        let caller = self.caller()?;
        let mut state = self.state();
        if let Some(username) = &request.username {
            if state
                .profiles
                .iter()
                .any(|p| &p.username == username && p.id != caller.user_id)
            {
                return Err(AppError::Conflict("Username is already taken".into()));
            }
        }
        let profile = state
            .profiles
            .iter_mut()
            .find(|p| p.id == caller.user_id)
            .ok_or_else(|| AppError::NotFound("Profile not found".into()))?;
        if let Some(v) = &request.username {
            profile.username = v.clone();
        }
        if let Some(v) = &request.full_name {
            profile.full_name = Some(v.clone());
        }
        if let Some(v) = &request.bio {
            profile.bio = Some(v.clone());
        }
        if let Some(v) = &request.avatar_url {
            profile.avatar_url = Some(v.clone());
        }
        if let Some(v) = &request.location {
            profile.location = Some(v.clone());
        }
        if let Some(v) = &request.website {
            profile.website = Some(v.clone());
        }
        if let Some(v) = &request.expertise_areas {
            profile.expertise_areas = v.clone();
        }
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<String, AppError> {
        self.record(format!("upload({}/{})", bucket, path));
        self.caller()?;
        self.state()
            .uploads
            .push((bucket.to_string(), path.to_string(), bytes.len()));
        Ok(format!("http://stub.local/storage/{}/{}", bucket, path))
    }

    fn subscribe(&self, filter: ChannelFilter) -> Subscription {
        self.hub.subscribe(filter)
    }
}
