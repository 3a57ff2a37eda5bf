//! Profile page and the profile settings form.

use chrono::{DateTime, Utc};

use super::{ClientContext, ClientError, QueryKey, Route, SessionInfo};
use crate::models::{DebateFilter, Profile, ProfilePage, UpdateProfileRequest};
use crate::storage::AVATAR_BUCKET;

/// A public profile page with its stats, debates and arguments.
///
/// `Ok(None)` means no such user; the page shows its inline not-found state.
pub async fn load_profile(
    ctx: &ClientContext,
    username: &str,
) -> Result<Option<ProfilePage>, ClientError> {
    let remote = ctx.remote.clone();
    let owned = username.to_string();
    let result = ctx
        .cache
        .fetch(QueryKey::Profile(owned.clone()), || async move {
            let Some(profile) = remote.get_profile_by_username(&owned).await? else {
                return Ok::<_, ClientError>(None);
            };
            let filter = DebateFilter {
                created_by: Some(profile.id.clone()),
                ..Default::default()
            };
            let (stats, debates, arguments) = tokio::try_join!(
                remote.user_stats(&profile.id),
                remote.list_debates(&filter),
                remote.list_arguments_by_user(&profile.id),
            )?;
            Ok(Some(ProfilePage {
                profile,
                stats,
                debates,
                arguments,
            }))
        })
        .await;
    let page = ctx.reported("load profile page", result)?;
    Ok((*page).clone())
}

/// A picked avatar file waiting to be uploaded on save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl AvatarFile {
    fn extension(&self) -> String {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| "png".to_string())
    }
}

/// Editable copy of the signed-in user's profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileDraft {
    pub username: String,
    pub full_name: String,
    pub bio: String,
    pub location: String,
    pub website: String,
    pub expertise_areas: Vec<String>,
    pub avatar: Option<AvatarFile>,
}

impl From<&Profile> for ProfileDraft {
    fn from(profile: &Profile) -> Self {
        Self {
            username: profile.username.clone(),
            full_name: profile.full_name.clone().unwrap_or_default(),
            bio: profile.bio.clone().unwrap_or_default(),
            location: profile.location.clone().unwrap_or_default(),
            website: profile.website.clone().unwrap_or_default(),
            expertise_areas: profile.expertise_areas.clone(),
            avatar: None,
        }
    }
}

pub struct ProfileEditor {
    ctx: ClientContext,
    saved: Profile,
    pub draft: ProfileDraft,
}

impl ProfileEditor {
    /// Load the signed-in user's profile into a fresh draft.
    pub async fn load(ctx: ClientContext) -> Result<Self, ClientError> {
        let result = Self::try_load(&ctx).await;
        ctx.reported("load profile", result)
    }

    async fn try_load(ctx: &ClientContext) -> Result<Self, ClientError> {
        let session = ctx.session.current().ok_or_else(|| {
            ClientError::AuthRequired("You must be logged in to edit your profile".into())
        })?;

        let remote = ctx.remote.clone();
        let user_id = session.user_id.clone();
        let profile = ctx
            .cache
            .fetch(QueryKey::CurrentProfile(user_id.clone()), || async move {
                Ok(remote.get_profile(&user_id).await?)
            })
            .await?;
        let profile = (*profile)
            .clone()
            .ok_or_else(|| ClientError::NotFound("Profile not found".into()))?;

        Ok(Self {
            ctx: ctx.clone(),
            draft: ProfileDraft::from(&profile),
            saved: profile,
        })
    }

    /// The profile as last loaded or saved.
    pub fn profile(&self) -> &Profile {
        &self.saved
    }

    pub fn add_expertise(&mut self, area: &str) -> Result<(), ClientError> {
        let area = area.trim();
        if area.is_empty() {
            return Err(ClientError::Validation("Expertise area cannot be empty".into()));
        }
        if self.draft.expertise_areas.iter().any(|a| a == area) {
            return Err(ClientError::Validation(
                "This expertise area is already added".into(),
            ));
        }
        self.draft.expertise_areas.push(area.to_string());
        Ok(())
    }

    pub fn remove_expertise(&mut self, area: &str) -> bool {
        let before = self.draft.expertise_areas.len();
        self.draft.expertise_areas.retain(|a| a != area);
        self.draft.expertise_areas.len() != before
    }

    pub fn set_avatar(&mut self, file_name: impl Into<String>, bytes: Vec<u8>) {
        self.draft.avatar = Some(AvatarFile {
            file_name: file_name.into(),
            bytes,
        });
    }

    /// Save the draft in one update.
    ///
    /// Returns the new profile route when the username changed.
    pub async fn save(&mut self, now: DateTime<Utc>) -> Result<Option<Route>, ClientError> {
        let result = self.try_save(now).await;
        if result.is_ok() {
            self.ctx.notifier.success("Profile updated successfully!");
        }
        self.ctx.reported("save profile", result)
    }

    async fn try_save(&mut self, now: DateTime<Utc>) -> Result<Option<Route>, ClientError> {
        let user_id = self.saved.id.clone();
        // The backend writes to whoever is signed in now
        if self.ctx.session.current().map(|s| s.user_id) != Some(user_id.clone()) {
            return Err(ClientError::AuthRequired(
                "Your session changed, reload your profile to edit it".into(),
            ));
        }

        let old_username = self.saved.username.clone();
        let username = self.draft.username.trim().to_string();
        if username.is_empty() {
            return Err(ClientError::Validation("Username is required".into()));
        }

        let renamed = username != old_username;
        if renamed
            && self
                .ctx
                .remote
                .username_taken(&username, Some(user_id.as_str()))
                .await?
        {
            return Err(ClientError::Validation("Username is already taken".into()));
        }

        let avatar_url = match &self.draft.avatar {
            Some(file) => {
                let path = format!("{}/{}.{}", user_id, now.timestamp_millis(), file.extension());
                let url = self
                    .ctx
                    .remote
                    .upload(AVATAR_BUCKET, &path, &file.bytes)
                    .await?;
                tracing::info!(%user_id, %path, "Avatar uploaded");
                Some(url)
            }
            None => None,
        };

        let request = UpdateProfileRequest {
            username: Some(username.clone()),
            full_name: Some(self.draft.full_name.trim().to_string()),
            bio: Some(self.draft.bio.trim().to_string()),
            avatar_url,
            location: Some(self.draft.location.trim().to_string()),
            website: Some(self.draft.website.trim().to_string()),
            expertise_areas: Some(self.draft.expertise_areas.clone()),
            social_links: None,
        };
        let profile = self.ctx.remote.update_profile(&request).await?;

        self.ctx.cache.invalidate(&QueryKey::Profile(old_username));
        self.ctx
            .cache
            .invalidate(&QueryKey::Profile(profile.username.clone()));
        self.ctx
            .cache
            .invalidate(&QueryKey::CurrentProfile(profile.id.clone()));
        self.ctx.cache.invalidate_where(QueryKey::is_search);
        self.ctx.session.set(Some(SessionInfo {
            user_id: profile.id.clone(),
            username: profile.username.clone(),
        }));

        self.draft = ProfileDraft::from(&profile);
        self.saved = profile;
        Ok(renamed.then(|| Route::Profile(username)))
    }
}
