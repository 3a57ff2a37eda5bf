//! Database repository for CRUD operations.
//!
//! Every successful write publishes a change event on the realtime hub after commit.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    Argument, ArgumentWithAuthor, AuthorSummary, CastVoteRequest, ChangeEvent, ChangeKind,
    CreateArgumentRequest, CreateDebateRequest, Debate, DebateFilter, DebateHit, DebateStatus,
    Position, Profile, ProfileHit, Session, Table, UpdateProfileRequest, UserStats, Vote,
};
use crate::realtime::RealtimeHub;

const DEBATE_COLUMNS: &str = "id, title, description, category, created_by, created_at, ends_at, status, participant_count, argument_count, featured";
const PROFILE_COLUMNS: &str = "id, username, full_name, bio, avatar_url, location, website, expertise_areas, social_links, created_at, updated_at";
const VOTE_COLUMNS: &str = "id, argument_id, user_id, vote_type, created_at";

/// Upper bound for list queries that do not specify a limit.
const MAX_LIST_LIMIT: i64 = 200;

/// How far a caller-supplied debate creation time may drift from the server clock.
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
    realtime: RealtimeHub,
}

impl Repository {
    pub fn new(pool: SqlitePool, realtime: RealtimeHub) -> Self {
        Self { pool, realtime }
    }

    pub fn realtime(&self) -> &RealtimeHub {
        &self.realtime
    }

    // ==================== ACCOUNT OPERATIONS ====================

    /// Create an auth identity and its profile row in one transaction.
    pub async fn create_account(
        &self,
        email: &str,
        password_hash: &str,
        username: &str,
        full_name: Option<&str>,
    ) -> Result<Profile, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = timestamp(Utc::now());

        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO users (id, email, password_hash, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(email)
            .bind(password_hash)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO profiles (id, username, full_name, expertise_areas, social_links, search_text, created_at, updated_at) VALUES (?, ?, ?, '[]', '{}', ?, ?, ?)"
        )
        .bind(&id)
        .bind(username)
        .bind(full_name)
        .bind(search_text(&[Some(username), full_name]))
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.realtime
            .publish(ChangeEvent::new(Table::Profiles, ChangeKind::Insert, &id));

        self.get_profile(&id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Profile {} vanished after insert", id)))
    }

    /// Look up `(user_id, password_hash)` for an email address.
    pub async fn find_credentials(&self, email: &str) -> Result<Option<(String, String)>, AppError> {
        let row = sqlx::query("SELECT id, password_hash FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| (row.get("id"), row.get("password_hash"))))
    }

    pub async fn email_registered(&self, email: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    // ==================== SESSION OPERATIONS ====================

    /// Issue a new bearer token for a user.
    pub async fn create_session(&self, user_id: &str, ttl: Duration) -> Result<Session, AppError> {
        let profile = self
            .get_profile(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", user_id)))?;

        let token = format!(
            "{}{}",
            uuid::Uuid::new_v4().simple(),
            uuid::Uuid::new_v4().simple()
        );
        let now = Utc::now();
        let expires_at = now + ttl;

        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&token)
        .bind(user_id)
        .bind(timestamp(now))
        .bind(timestamp(expires_at))
        .execute(&self.pool)
        .await?;

        Ok(Session {
            token,
            user_id: user_id.to_string(),
            username: profile.username,
            expires_at,
        })
    }

    /// Resolve a bearer token. Expired tokens resolve to `None`.
    pub async fn get_session(&self, token: &str) -> Result<Option<Session>, AppError> {
        let row = sqlx::query(
            "SELECT s.token, s.user_id, s.expires_at, p.username FROM sessions s JOIN profiles p ON p.id = s.user_id WHERE s.token = ? AND s.expires_at > ?"
        )
        .bind(token)
        .bind(timestamp(Utc::now()))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Session {
            token: row.get("token"),
            user_id: row.get("user_id"),
            username: row.get("username"),
            expires_at: parse_timestamp(row.get("expires_at")),
        }))
    }

    /// Revoke a token. Returns whether a session was removed.
    pub async fn delete_session(&self, token: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ==================== DEBATE OPERATIONS ====================

    /// List debates, newest first.
    pub async fn list_debates(&self, filter: &DebateFilter) -> Result<Vec<Debate>, AppError> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM debates WHERE 1 = 1", DEBATE_COLUMNS));

        if let Some(category) = &filter.category {
            qb.push(" AND category = ").push_bind(category.clone());
        }
        if let Some(featured) = filter.featured {
            qb.push(" AND featured = ").push_bind(featured as i64);
        }
        if let Some(created_by) = &filter.created_by {
            qb.push(" AND created_by = ").push_bind(created_by.clone());
        }

        let limit = filter
            .limit
            .unwrap_or(MAX_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);
        qb.push(" ORDER BY created_at DESC, id LIMIT ").push_bind(limit);

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(debate_from_row).collect())
    }

    /// Get a debate by ID.
    pub async fn get_debate(&self, id: &str) -> Result<Option<Debate>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM debates WHERE id = ?", DEBATE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(debate_from_row))
    }

    /// Create a new debate with zeroed counters.
    pub async fn create_debate(
        &self,
        user_id: &str,
        request: &CreateDebateRequest,
    ) -> Result<Debate, AppError> {
        let now = Utc::now();
        let created_at = match request.created_at {
            Some(at) if (at - now).abs() <= Duration::seconds(MAX_CLOCK_SKEW_SECS) => at,
            Some(at) => {
                tracing::warn!(requested = %at, "Debate creation time out of range, using server time");
                now
            }
            None => now,
        };
        self.insert_debate_at(user_id, request, created_at).await
    }

    /// Insert a debate with an explicit creation time, for trusted imports.
    pub(crate) async fn insert_debate_at(
        &self,
        user_id: &str,
        request: &CreateDebateRequest,
        created_at: DateTime<Utc>,
    ) -> Result<Debate, AppError> {
        let title = request.title.trim();
        let description = request.description.trim();
        let category = request.category.trim();

        if title.is_empty() || description.is_empty() || category.is_empty() {
            return Err(AppError::Validation(
                "Title, description and category are required".to_string(),
            ));
        }

        if request.ends_at <= created_at {
            return Err(AppError::Validation(
                "Debate must end after it is created".to_string(),
            ));
        }

        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO debates (id, title, description, category, created_by, created_at, ends_at, status, participant_count, argument_count, featured, search_text) VALUES (?, ?, ?, ?, ?, ?, ?, 'active', 0, 0, 0, ?)"
        )
        .bind(&id)
        .bind(title)
        .bind(description)
        .bind(category)
        .bind(user_id)
        .bind(timestamp(created_at))
        .bind(timestamp(request.ends_at))
        .bind(search_text(&[Some(title), Some(description)]))
        .execute(&self.pool)
        .await?;

        self.realtime
            .publish(ChangeEvent::new(Table::Debates, ChangeKind::Insert, &id).in_debate(&id));

        Ok(Debate {
            id,
            title: title.to_string(),
            description: description.to_string(),
            category: category.to_string(),
            created_by: user_id.to_string(),
            created_at,
            ends_at: request.ends_at,
            status: DebateStatus::Active,
            participant_count: 0,
            argument_count: 0,
            featured: false,
        })
    }

    /// Mark or unmark a debate as featured.
    pub async fn set_featured(&self, id: &str, featured: bool) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE debates SET featured = ? WHERE id = ?")
            .bind(featured as i64)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Debate {} not found", id)));
        }

        self.realtime
            .publish(ChangeEvent::new(Table::Debates, ChangeKind::Update, id).in_debate(id));
        Ok(())
    }

    pub async fn count_debates(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM debates")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    // ==================== ARGUMENT OPERATIONS ====================

    /// List the arguments of a debate joined with their authors, oldest first.
    pub async fn list_arguments(&self, debate_id: &str) -> Result<Vec<ArgumentWithAuthor>, AppError> {
        let rows = sqlx::query(
            "SELECT a.id, a.debate_id, a.user_id, a.position, a.content, a.created_at, a.updated_at, p.username, p.full_name, p.avatar_url FROM arguments a LEFT JOIN profiles p ON p.id = a.user_id WHERE a.debate_id = ? ORDER BY a.created_at ASC, a.id"
        )
        .bind(debate_id)
        .fetch_all(&self.pool)
        .await?;

        let mut arguments = Vec::with_capacity(rows.len());
        for row in &rows {
            let argument = argument_from_row(row)?;
            let username: Option<String> = row.get("username");
            let author = username.map(|username| AuthorSummary {
                id: argument.user_id.clone(),
                username,
                full_name: row.get("full_name"),
                avatar_url: row.get("avatar_url"),
            });
            arguments.push(ArgumentWithAuthor { argument, author });
        }
        Ok(arguments)
    }

    /// List arguments posted by a user, newest first.
    pub async fn list_arguments_by_user(&self, user_id: &str) -> Result<Vec<Argument>, AppError> {
        let rows = sqlx::query(
            "SELECT id, debate_id, user_id, position, content, created_at, updated_at FROM arguments WHERE user_id = ? ORDER BY created_at DESC, id"
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(argument_from_row).collect()
    }

    /// Post an argument and update the debate's counters in the same transaction.
    ///
    /// `argument_count` is incremented in SQL and `participant_count` is recomputed from
    /// the distinct authors, so concurrent posters cannot lose updates.
    pub async fn create_argument(
        &self,
        debate_id: &str,
        user_id: &str,
        request: &CreateArgumentRequest,
    ) -> Result<Argument, AppError> {
        let content = request.content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Argument content is required".to_string()));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let now_str = timestamp(now);

        // Insert before the counter update; the foreign key rejects unknown debates.
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO arguments (id, debate_id, user_id, position, content, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&id)
        .bind(debate_id)
        .bind(user_id)
        .bind(request.position.as_str())
        .bind(content)
        .bind(&now_str)
        .bind(&now_str)
        .execute(&mut *tx)
        .await;

        if let Err(err) = inserted {
            if let sqlx::Error::Database(db_err) = &err {
                if db_err.is_foreign_key_violation() {
                    return Err(AppError::NotFound(format!("Debate {} not found", debate_id)));
                }
            }
            return Err(err.into());
        }

        sqlx::query(
            "UPDATE debates SET argument_count = argument_count + 1, participant_count = (SELECT COUNT(DISTINCT user_id) FROM arguments WHERE debate_id = ?) WHERE id = ?"
        )
        .bind(debate_id)
        .bind(debate_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.realtime.publish(
            ChangeEvent::new(Table::Arguments, ChangeKind::Insert, &id).in_debate(debate_id),
        );
        self.realtime.publish(
            ChangeEvent::new(Table::Debates, ChangeKind::Update, debate_id).in_debate(debate_id),
        );

        Ok(Argument {
            id,
            debate_id: debate_id.to_string(),
            user_id: user_id.to_string(),
            position: request.position,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    // ==================== VOTE OPERATIONS ====================

    /// All votes cast on any of the given arguments.
    pub async fn list_votes(&self, argument_ids: &[String]) -> Result<Vec<Vote>, AppError> {
        if argument_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM votes WHERE argument_id IN (",
            VOTE_COLUMNS
        ));
        {
            let mut separated = qb.separated(", ");
            for id in argument_ids {
                separated.push_bind(id.clone());
            }
        }
        qb.push(") ORDER BY created_at, id");

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(vote_from_row).collect())
    }

    /// All votes cast on the arguments of one debate.
    pub async fn list_votes_for_debate(&self, debate_id: &str) -> Result<Vec<Vote>, AppError> {
        let rows = sqlx::query(
            "SELECT v.id, v.argument_id, v.user_id, v.vote_type, v.created_at FROM votes v JOIN arguments a ON a.id = v.argument_id WHERE a.debate_id = ? ORDER BY v.created_at, v.id"
        )
        .bind(debate_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(vote_from_row).collect())
    }

    pub async fn get_vote(&self, id: &str) -> Result<Option<Vote>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM votes WHERE id = ?", VOTE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(vote_from_row))
    }

    /// Insert a first vote by `user_id` on an argument.
    pub async fn insert_vote(&self, user_id: &str, request: &CastVoteRequest) -> Result<Vote, AppError> {
        let debate_id = self.debate_of_argument(&request.argument_id).await?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO votes (id, argument_id, user_id, vote_type, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&request.argument_id)
        .bind(user_id)
        .bind(request.vote_type as i64)
        .bind(timestamp(now))
        .execute(&self.pool)
        .await;

        if let Err(err) = result {
            return Err(match AppError::from(err) {
                AppError::Conflict(_) => {
                    AppError::Conflict("You have already voted on this argument".to_string())
                }
                other => other,
            });
        }

        self.realtime
            .publish(ChangeEvent::new(Table::Votes, ChangeKind::Insert, &id).in_debate(debate_id));

        Ok(Vote {
            id,
            argument_id: request.argument_id.clone(),
            user_id: user_id.to_string(),
            vote_type: request.vote_type,
            created_at: now,
        })
    }

    /// Change the direction of a vote owned by `user_id`.
    pub async fn update_vote(&self, id: &str, user_id: &str, vote_type: bool) -> Result<Vote, AppError> {
        let existing = self.owned_vote(id, user_id).await?;

        sqlx::query("UPDATE votes SET vote_type = ? WHERE id = ?")
            .bind(vote_type as i64)
            .bind(id)
            .execute(&self.pool)
            .await?;

        let debate_id = self.debate_of_argument(&existing.argument_id).await?;
        self.realtime
            .publish(ChangeEvent::new(Table::Votes, ChangeKind::Update, id).in_debate(debate_id));

        Ok(Vote {
            vote_type,
            ..existing
        })
    }

    /// Remove a vote owned by `user_id`.
    pub async fn delete_vote(&self, id: &str, user_id: &str) -> Result<(), AppError> {
        let existing = self.owned_vote(id, user_id).await?;
        let debate_id = self.debate_of_argument(&existing.argument_id).await?;

        sqlx::query("DELETE FROM votes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.realtime
            .publish(ChangeEvent::new(Table::Votes, ChangeKind::Delete, id).in_debate(debate_id));
        Ok(())
    }

    async fn owned_vote(&self, id: &str, user_id: &str) -> Result<Vote, AppError> {
        let vote = self
            .get_vote(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Vote {} not found", id)))?;
        if vote.user_id != user_id {
            return Err(AppError::Forbidden("You can only change your own votes".to_string()));
        }
        Ok(vote)
    }

    async fn debate_of_argument(&self, argument_id: &str) -> Result<String, AppError> {
        let row = sqlx::query("SELECT debate_id FROM arguments WHERE id = ?")
            .bind(argument_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| row.get("debate_id"))
            .ok_or_else(|| AppError::NotFound(format!("Argument {} not found", argument_id)))
    }

    // ==================== PROFILE OPERATIONS ====================

    pub async fn get_profile(&self, id: &str) -> Result<Option<Profile>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM profiles WHERE id = ?", PROFILE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(profile_from_row))
    }

    pub async fn get_profile_by_username(&self, username: &str) -> Result<Option<Profile>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM profiles WHERE username = ?",
            PROFILE_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(profile_from_row))
    }

    /// Whether a profile other than `exclude_id` already uses `username`.
    pub async fn username_taken(
        &self,
        username: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM profiles WHERE username = ? AND id != ?")
            .bind(username)
            .bind(exclude_id.unwrap_or(""))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Update a profile. Absent fields keep their stored values.
    pub async fn update_profile(
        &self,
        id: &str,
        request: &UpdateProfileRequest,
    ) -> Result<Profile, AppError> {
        let existing = self
            .get_profile(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", id)))?;

        let username = match &request.username {
            Some(username) => {
                let username = username.trim();
                if username.is_empty() {
                    return Err(AppError::Validation("Username is required".to_string()));
                }
                if username != existing.username && self.username_taken(username, Some(id)).await? {
                    return Err(AppError::Conflict("Username is already taken".to_string()));
                }
                username.to_string()
            }
            None => existing.username.clone(),
        };

        let full_name = request.full_name.clone().or(existing.full_name);
        let bio = request.bio.clone().or(existing.bio);
        let avatar_url = request.avatar_url.clone().or(existing.avatar_url);
        let location = request.location.clone().or(existing.location);
        let website = request.website.clone().or(existing.website);
        let expertise_areas = request
            .expertise_areas
            .clone()
            .unwrap_or(existing.expertise_areas);
        let social_links = request
            .social_links
            .clone()
            .unwrap_or(existing.social_links);
        let now = Utc::now();

        sqlx::query(
            "UPDATE profiles SET username = ?, full_name = ?, bio = ?, avatar_url = ?, location = ?, website = ?, expertise_areas = ?, social_links = ?, search_text = ?, updated_at = ? WHERE id = ?"
        )
        .bind(&username)
        .bind(&full_name)
        .bind(&bio)
        .bind(&avatar_url)
        .bind(&location)
        .bind(&website)
        .bind(serde_json::to_string(&expertise_areas)?)
        .bind(serde_json::to_string(&social_links)?)
        .bind(search_text(&[Some(username.as_str()), full_name.as_deref()]))
        .bind(timestamp(now))
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.realtime
            .publish(ChangeEvent::new(Table::Profiles, ChangeKind::Update, id));

        Ok(Profile {
            id: id.to_string(),
            username,
            full_name,
            bio,
            avatar_url,
            location,
            website,
            expertise_areas,
            social_links,
            created_at: existing.created_at,
            updated_at: now,
        })
    }

    pub async fn user_stats(&self, user_id: &str) -> Result<UserStats, AppError> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM debates WHERE created_by = ?1) AS debates_created,
                (SELECT COUNT(*) FROM arguments WHERE user_id = ?1) AS arguments_posted,
                (SELECT COUNT(*) FROM votes v JOIN arguments a ON a.id = v.argument_id
                    WHERE a.user_id = ?1 AND v.vote_type = 1) AS upvotes_received
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(UserStats {
            debates_created: row.get("debates_created"),
            arguments_posted: row.get("arguments_posted"),
            upvotes_received: row.get("upvotes_received"),
        })
    }

    // ==================== SEARCH OPERATIONS ====================

    /// Case-insensitive substring match on debate title or description.
    pub async fn search_debates(&self, term: &str, limit: i64) -> Result<Vec<DebateHit>, AppError> {
        let pattern = like_pattern(&term.to_lowercase());
        let rows = sqlx::query(
            "SELECT id, title, description, category FROM debates WHERE search_text LIKE ?1 ESCAPE '\\' LIMIT ?2"
        )
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| DebateHit {
                id: row.get("id"),
                title: row.get("title"),
                description: row.get("description"),
                category: row.get("category"),
            })
            .collect())
    }

    /// Case-insensitive substring match on username or full name.
    pub async fn search_profiles(&self, term: &str, limit: i64) -> Result<Vec<ProfileHit>, AppError> {
        let pattern = like_pattern(&term.to_lowercase());
        let rows = sqlx::query(
            "SELECT id, username, full_name FROM profiles WHERE search_text LIKE ?1 ESCAPE '\\' LIMIT ?2"
        )
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ProfileHit {
                id: row.get("id"),
                username: row.get("username"),
                full_name: row.get("full_name"),
            })
            .collect())
    }
}

// Helper functions for row conversion

/// Fixed-width RFC 3339 so that text ordering matches time ordering.
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(raw: String) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(at) => at.with_timezone(&Utc),
        Err(e) => {
            tracing::warn!("Unparseable timestamp {:?}: {}", raw, e);
            DateTime::<Utc>::UNIX_EPOCH
        }
    }
}

/// Lowercased searchable fields, one per line.
///
/// SQLite only folds ASCII case in `LIKE`, so the folding happens here for both
/// the stored text and the pattern.
fn search_text(fields: &[Option<&str>]) -> String {
    fields
        .iter()
        .flatten()
        .map(|field| field.to_lowercase())
        .collect::<Vec<_>>()
        .join("\n")
}

fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn debate_from_row(row: &sqlx::sqlite::SqliteRow) -> Debate {
    let featured: i64 = row.get("featured");
    let status: String = row.get("status");
    let ends_at = parse_timestamp(row.get("ends_at"));

    // An active debate past its end time reads as completed.
    let status = match DebateStatus::parse(&status).unwrap_or(DebateStatus::Active) {
        DebateStatus::Active if ends_at <= Utc::now() => DebateStatus::Completed,
        other => other,
    };

    Debate {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        category: row.get("category"),
        created_by: row.get("created_by"),
        created_at: parse_timestamp(row.get("created_at")),
        ends_at,
        status,
        participant_count: row.get("participant_count"),
        argument_count: row.get("argument_count"),
        featured: featured != 0,
    }
}

fn argument_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Argument, AppError> {
    let position: String = row.get("position");
    let position = Position::parse(&position).ok_or_else(|| {
        AppError::Internal(format!("Unknown argument position {:?}", position))
    })?;

    Ok(Argument {
        id: row.get("id"),
        debate_id: row.get("debate_id"),
        user_id: row.get("user_id"),
        position,
        content: row.get("content"),
        created_at: parse_timestamp(row.get("created_at")),
        updated_at: parse_timestamp(row.get("updated_at")),
    })
}

fn vote_from_row(row: &sqlx::sqlite::SqliteRow) -> Vote {
    let vote_type: i64 = row.get("vote_type");
    Vote {
        id: row.get("id"),
        argument_id: row.get("argument_id"),
        user_id: row.get("user_id"),
        vote_type: vote_type != 0,
        created_at: parse_timestamp(row.get("created_at")),
    }
}

fn profile_from_row(row: &sqlx::sqlite::SqliteRow) -> Profile {
    let expertise: String = row.get("expertise_areas");
    let social: String = row.get("social_links");
    Profile {
        id: row.get("id"),
        username: row.get("username"),
        full_name: row.get("full_name"),
        bio: row.get("bio"),
        avatar_url: row.get("avatar_url"),
        location: row.get("location"),
        website: row.get("website"),
        expertise_areas: serde_json::from_str(&expertise).unwrap_or_default(),
        social_links: serde_json::from_str(&social).unwrap_or_default(),
        created_at: parse_timestamp(row.get("created_at")),
        updated_at: parse_timestamp(row.get("updated_at")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use crate::models::{ChannelFilter, VoteDirection};
    use crate::realtime::Delivery;
    use tempfile::TempDir;

    async fn setup() -> (Repository, TempDir) {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("test.sqlite")).await.unwrap();
        (Repository::new(pool, RealtimeHub::new()), dir)
    }

    async fn account(repo: &Repository, username: &str) -> Profile {
        repo.create_account(&format!("{}@example.com", username), "hash", username, None)
            .await
            .unwrap()
    }

    async fn debate(repo: &Repository, user_id: &str, title: &str) -> Debate {
        let now = Utc::now();
        repo.create_debate(
            user_id,
            &CreateDebateRequest {
                title: title.to_string(),
                description: "Context".to_string(),
                category: "Technology".to_string(),
                created_at: Some(now),
                ends_at: now + Duration::days(7),
            },
        )
        .await
        .unwrap()
    }

    fn argument(position: Position, content: &str) -> CreateArgumentRequest {
        CreateArgumentRequest {
            position,
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_debate_zeroes_counters() {
        let (repo, _dir) = setup().await;
        let user = account(&repo, "alice").await;
        let created = debate(&repo, &user.id, "AI regulation").await;

        let stored = repo.get_debate(&created.id).await.unwrap().unwrap();
        assert_eq!(stored, created);
        assert_eq!(stored.argument_count, 0);
        assert_eq!(stored.participant_count, 0);
        assert_eq!(stored.status, DebateStatus::Active);
    }

    #[tokio::test]
    async fn test_create_debate_ignores_backdated_time() {
        let (repo, _dir) = setup().await;
        let now = Utc::now();
        let created = repo
            .create_debate(
                "u1",
                &CreateDebateRequest {
                    title: "Backdated".to_string(),
                    description: "Context".to_string(),
                    category: "Politics".to_string(),
                    created_at: Some(now - Duration::days(30)),
                    ends_at: now + Duration::days(7),
                },
            )
            .await
            .unwrap();

        assert!((created.created_at - now).abs() < Duration::seconds(MAX_CLOCK_SKEW_SECS));
        let stored = repo.get_debate(&created.id).await.unwrap().unwrap();
        assert_eq!(stored.created_at, created.created_at);

        // Within the skew window the caller's time is kept exactly
        let exact = now - Duration::seconds(2);
        let kept = repo
            .create_debate(
                "u1",
                &CreateDebateRequest {
                    title: "On time".to_string(),
                    description: "Context".to_string(),
                    category: "Politics".to_string(),
                    created_at: Some(exact),
                    ends_at: exact + Duration::days(7),
                },
            )
            .await
            .unwrap();
        assert_eq!(kept.created_at, exact);
        assert_eq!(kept.ends_at - kept.created_at, Duration::days(7));
    }

    #[tokio::test]
    async fn test_create_debate_requires_fields() {
        let (repo, _dir) = setup().await;
        let now = Utc::now();
        let err = repo
            .create_debate(
                "u1",
                &CreateDebateRequest {
                    title: "  ".to_string(),
                    description: "d".to_string(),
                    category: "Science".to_string(),
                    created_at: Some(now),
                    ends_at: now + Duration::days(3),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_expired_debate_reads_completed() {
        let (repo, _dir) = setup().await;
        let start = Utc::now() - Duration::days(10);
        let created = repo
            .insert_debate_at(
                "u1",
                &CreateDebateRequest {
                    title: "Old".to_string(),
                    description: "d".to_string(),
                    category: "Science".to_string(),
                    created_at: None,
                    ends_at: start + Duration::days(3),
                },
                start,
            )
            .await
            .unwrap();

        let stored = repo.get_debate(&created.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DebateStatus::Completed);
    }

    #[tokio::test]
    async fn test_list_debates_newest_first_with_category() {
        let (repo, _dir) = setup().await;
        let first = debate(&repo, "u1", "First").await;
        let second = debate(&repo, "u1", "Second").await;

        let all = repo.list_debates(&DebateFilter::default()).await.unwrap();
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);

        let filtered = repo
            .list_debates(&DebateFilter {
                category: Some("Politics".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(filtered.is_empty());
    }

    #[tokio::test]
    async fn test_argument_updates_counters() {
        let (repo, _dir) = setup().await;
        let alice = account(&repo, "alice").await;
        let bob = account(&repo, "bob").await;
        let d = debate(&repo, &alice.id, "Topic").await;

        repo.create_argument(&d.id, &alice.id, &argument(Position::For, "yes"))
            .await
            .unwrap();
        repo.create_argument(&d.id, &alice.id, &argument(Position::For, "again"))
            .await
            .unwrap();
        repo.create_argument(&d.id, &bob.id, &argument(Position::Against, "no"))
            .await
            .unwrap();

        let stored = repo.get_debate(&d.id).await.unwrap().unwrap();
        assert_eq!(stored.argument_count, 3);
        assert_eq!(stored.participant_count, 2);
    }

    #[tokio::test]
    async fn test_concurrent_arguments_are_all_counted() {
        let (repo, _dir) = setup().await;
        let alice = account(&repo, "alice").await;
        let d = debate(&repo, &alice.id, "Topic").await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let repo = repo.clone();
            let debate_id = d.id.clone();
            let user_id = alice.id.clone();
            handles.push(tokio::spawn(async move {
                repo.create_argument(&debate_id, &user_id, &argument(Position::For, &format!("point {}", i)))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = repo.get_debate(&d.id).await.unwrap().unwrap();
        assert_eq!(stored.argument_count, 8);
    }

    #[tokio::test]
    async fn test_argument_rejects_blank_and_unknown_debate() {
        let (repo, _dir) = setup().await;
        let err = repo
            .create_argument("missing", "u1", &argument(Position::For, "text"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let d = debate(&repo, "u1", "Topic").await;
        let err = repo
            .create_argument(&d.id, "u1", &argument(Position::For, "   "))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_arguments_joins_author() {
        let (repo, _dir) = setup().await;
        let alice = account(&repo, "alice").await;
        let d = debate(&repo, &alice.id, "Topic").await;
        repo.create_argument(&d.id, &alice.id, &argument(Position::For, "  padded  "))
            .await
            .unwrap();
        repo.create_argument(&d.id, "ghost", &argument(Position::Against, "orphan"))
            .await
            .unwrap();

        let listed = repo.list_arguments(&d.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].argument.content, "padded");
        assert_eq!(listed[0].author.as_ref().unwrap().username, "alice");
        assert!(listed[1].author.is_none());
    }

    #[tokio::test]
    async fn test_vote_pair_is_unique() {
        let (repo, _dir) = setup().await;
        let alice = account(&repo, "alice").await;
        let d = debate(&repo, &alice.id, "Topic").await;
        let arg = repo
            .create_argument(&d.id, &alice.id, &argument(Position::For, "yes"))
            .await
            .unwrap();

        let request = CastVoteRequest {
            argument_id: arg.id.clone(),
            vote_type: VoteDirection::Up.as_vote_type(),
        };
        repo.insert_vote(&alice.id, &request).await.unwrap();
        let err = repo.insert_vote(&alice.id, &request).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let votes = repo.list_votes(&[arg.id.clone()]).await.unwrap();
        assert_eq!(votes.len(), 1);
    }

    #[tokio::test]
    async fn test_only_owner_changes_vote() {
        let (repo, _dir) = setup().await;
        let alice = account(&repo, "alice").await;
        let bob = account(&repo, "bob").await;
        let d = debate(&repo, &alice.id, "Topic").await;
        let arg = repo
            .create_argument(&d.id, &alice.id, &argument(Position::For, "yes"))
            .await
            .unwrap();
        let vote = repo
            .insert_vote(
                &alice.id,
                &CastVoteRequest {
                    argument_id: arg.id.clone(),
                    vote_type: true,
                },
            )
            .await
            .unwrap();

        let err = repo.update_vote(&vote.id, &bob.id, false).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let err = repo.delete_vote(&vote.id, &bob.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let updated = repo.update_vote(&vote.id, &alice.id, false).await.unwrap();
        assert!(!updated.vote_type);
        repo.delete_vote(&vote.id, &alice.id).await.unwrap();
        assert!(repo.get_vote(&vote.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_vote_write_publishes_debate_scoped_event() {
        let (repo, _dir) = setup().await;
        let alice = account(&repo, "alice").await;
        let d = debate(&repo, &alice.id, "Topic").await;
        let arg = repo
            .create_argument(&d.id, &alice.id, &argument(Position::For, "yes"))
            .await
            .unwrap();

        let mut sub = repo
            .realtime()
            .subscribe(ChannelFilter::debate(Table::Votes, d.id.clone()));
        let vote = repo
            .insert_vote(
                &alice.id,
                &CastVoteRequest {
                    argument_id: arg.id,
                    vote_type: true,
                },
            )
            .await
            .unwrap();

        match sub.recv().await {
            Some(Delivery::Event(event)) => {
                assert_eq!(event.record_id, vote.id);
                assert_eq!(event.kind, ChangeKind::Insert);
            }
            other => panic!("unexpected delivery: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_username_taken_excludes_self() {
        let (repo, _dir) = setup().await;
        let alice = account(&repo, "alice").await;
        let bob = account(&repo, "bob").await;

        assert!(!repo.username_taken("alice", Some(&alice.id)).await.unwrap());
        assert!(repo.username_taken("alice", Some(&bob.id)).await.unwrap());
        assert!(repo.username_taken("alice", None).await.unwrap());
        assert!(!repo.username_taken("carol", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_profile_merges_and_checks_username() {
        let (repo, _dir) = setup().await;
        let alice = account(&repo, "alice").await;
        account(&repo, "bob").await;

        let updated = repo
            .update_profile(
                &alice.id,
                &UpdateProfileRequest {
                    bio: Some("Tech ethicist".to_string()),
                    expertise_areas: Some(vec!["AI Ethics".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.username, "alice");
        assert_eq!(updated.bio.as_deref(), Some("Tech ethicist"));
        assert_eq!(updated.expertise_areas, vec!["AI Ethics".to_string()]);

        let err = repo
            .update_profile(
                &alice.id,
                &UpdateProfileRequest {
                    username: Some("bob".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let stored = repo.get_profile(&alice.id).await.unwrap().unwrap();
        assert_eq!(stored.bio.as_deref(), Some("Tech ethicist"));
    }

    #[tokio::test]
    async fn test_sessions_resolve_and_expire() {
        let (repo, _dir) = setup().await;
        let alice = account(&repo, "alice").await;

        let live = repo.create_session(&alice.id, Duration::days(1)).await.unwrap();
        let resolved = repo.get_session(&live.token).await.unwrap().unwrap();
        assert_eq!(resolved.user_id, alice.id);
        assert_eq!(resolved.username, "alice");

        let expired = repo.create_session(&alice.id, Duration::seconds(-1)).await.unwrap();
        assert!(repo.get_session(&expired.token).await.unwrap().is_none());

        assert!(repo.delete_session(&live.token).await.unwrap());
        assert!(repo.get_session(&live.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_substring() {
        let (repo, _dir) = setup().await;
        let alice = account(&repo, "sophialogic").await;
        debate(&repo, &alice.id, "Should AI development be regulated?").await;
        debate(&repo, &alice.id, "Is nuclear energy the answer?").await;
        debate(&repo, &alice.id, "100% renewable grids").await;

        let hits = repo.search_debates("ai DEV", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].title.starts_with("Should AI"));

        // Wildcards in the term are literal
        let hits = repo.search_debates("0%", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        let hits = repo.search_debates("_", 5).await.unwrap();
        assert!(hits.is_empty());

        let profiles = repo.search_profiles("SOPHIA", 5).await.unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].username, "sophialogic");
    }

    #[tokio::test]
    async fn test_search_folds_non_ascii_case() {
        let (repo, _dir) = setup().await;
        let alice = account(&repo, "alice").await;
        debate(&repo, &alice.id, "Ética de la IA en Ávila").await;

        let hits = repo.search_debates("ÉTICA", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        let hits = repo.search_debates("ávila", 5).await.unwrap();
        assert_eq!(hits.len(), 1);

        repo.update_profile(
            &alice.id,
            &UpdateProfileRequest {
                full_name: Some("Zoë Ångström".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let profiles = repo.search_profiles("ÅNGSTR", 5).await.unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].full_name.as_deref(), Some("Zoë Ångström"));
    }

    #[tokio::test]
    async fn test_search_respects_limit() {
        let (repo, _dir) = setup().await;
        for i in 0..7 {
            debate(&repo, "u1", &format!("Climate question {}", i)).await;
        }
        let hits = repo.search_debates("climate", 5).await.unwrap();
        assert_eq!(hits.len(), 5);
    }

    #[tokio::test]
    async fn test_user_stats() {
        let (repo, _dir) = setup().await;
        let alice = account(&repo, "alice").await;
        let bob = account(&repo, "bob").await;
        let d = debate(&repo, &alice.id, "Topic").await;
        let arg = repo
            .create_argument(&d.id, &alice.id, &argument(Position::For, "yes"))
            .await
            .unwrap();
        repo.insert_vote(
            &bob.id,
            &CastVoteRequest {
                argument_id: arg.id,
                vote_type: true,
            },
        )
        .await
        .unwrap();

        let stats = repo.user_stats(&alice.id).await.unwrap();
        assert_eq!(
            stats,
            UserStats {
                debates_created: 1,
                arguments_posted: 1,
                upvotes_received: 1,
            }
        );
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ai"), "%ai%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
