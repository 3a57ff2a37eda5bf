//! Debate list and the create-debate form.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::{ClientContext, ClientError, QueryKey, Route};
use crate::models::{CreateDebateRequest, Debate, DebateFilter};

/// How long a new debate stays open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DebateDuration {
    ThreeDays,
    #[default]
    OneWeek,
    TwoWeeks,
    OneMonth,
}

impl DebateDuration {
    pub const ALL: [DebateDuration; 4] = [
        DebateDuration::ThreeDays,
        DebateDuration::OneWeek,
        DebateDuration::TwoWeeks,
        DebateDuration::OneMonth,
    ];

    pub fn days(self) -> u32 {
        match self {
            DebateDuration::ThreeDays => 3,
            DebateDuration::OneWeek => 7,
            DebateDuration::TwoWeeks => 14,
            DebateDuration::OneMonth => 30,
        }
    }

    pub fn ends_at(self, created_at: DateTime<Utc>) -> DateTime<Utc> {
        created_at + Duration::days(self.days() as i64)
    }
}

impl TryFrom<u32> for DebateDuration {
    type Error = ClientError;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|d| d.days() == days)
            .ok_or_else(|| ClientError::Validation(format!("Unsupported debate duration: {} days", days)))
    }
}

/// Create-debate form state. Stays populated after a failed submit.
#[derive(Debug, Clone, Default)]
pub struct DebateForm {
    pub title: String,
    pub description: String,
    pub category: String,
    pub duration: DebateDuration,
}

impl DebateForm {
    pub fn validate(&self) -> Result<(), ClientError> {
        if [&self.title, &self.description, &self.category]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(ClientError::Validation(
                "Please fill in all required fields".into(),
            ));
        }
        Ok(())
    }

    /// Build the insert, stamping `now` as the creation time.
    pub fn to_request(&self, now: DateTime<Utc>) -> Result<CreateDebateRequest, ClientError> {
        self.validate()?;
        Ok(CreateDebateRequest {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            category: self.category.trim().to_string(),
            created_at: Some(now),
            ends_at: self.duration.ends_at(now),
        })
    }
}

/// Submit the form and return the route of the new debate.
pub async fn create_debate(
    ctx: &ClientContext,
    form: &DebateForm,
    now: DateTime<Utc>,
) -> Result<Route, ClientError> {
    let result = try_create_debate(ctx, form, now).await;
    if result.is_ok() {
        ctx.notifier.success("Debate created successfully!");
    }
    ctx.reported("create debate", result)
}

async fn try_create_debate(
    ctx: &ClientContext,
    form: &DebateForm,
    now: DateTime<Utc>,
) -> Result<Route, ClientError> {
    if !ctx.session.is_logged_in() {
        return Err(ClientError::AuthRequired(
            "You must be logged in to create a debate".into(),
        ));
    }
    let request = form.to_request(now)?;
    let debate = ctx.remote.insert_debate(&request).await?;

    tracing::info!(debate_id = %debate.id, category = %debate.category, "Debate created");
    ctx.cache.invalidate(&QueryKey::Debates);
    ctx.cache.invalidate_where(QueryKey::is_search);
    Ok(Route::Debate(debate.id))
}

/// All debates, newest first, optionally narrowed to one category tab.
pub async fn load_debates(
    ctx: &ClientContext,
    category: Option<&str>,
) -> Result<Vec<Debate>, ClientError> {
    let remote = ctx.remote.clone();
    let result = ctx
        .cache
        .fetch(QueryKey::Debates, || async move {
            Ok(remote.list_debates(&DebateFilter::default()).await?)
        })
        .await;
    let debates: Arc<Vec<Debate>> = ctx.reported("load debates", result)?;
    Ok(debates
        .iter()
        .filter(|d| category.map_or(true, |c| d.category == c))
        .cloned()
        .collect())
}
