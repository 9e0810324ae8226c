// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account details, profile images, channel pages and watch history.

use crate::db::UserStore;
use crate::error::AppError;
use crate::models::user::normalize_identifier;
use crate::models::{ChannelProfile, ProfileImage, UserResponse, WatchHistoryEntry};
use crate::services::media::{MediaFile, MediaUploader};
use mongodb::bson::oid::ObjectId;
use std::sync::Arc;
use validator::ValidateEmail;

#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn UserStore>,
    media: Arc<dyn MediaUploader>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn UserStore>, media: Arc<dyn MediaUploader>) -> Self {
        Self { store, media }
    }

    /// Load the sanitized record for an authenticated user.
    pub async fn current_user(&self, user_id: ObjectId) -> Result<Option<UserResponse>, AppError> {
        Ok(self
            .store
            .find_by_id(user_id)
            .await?
            .map(|u| UserResponse::from(&u)))
    }

    pub async fn update_account(
        &self,
        user_id: ObjectId,
        full_name: &str,
        email: &str,
    ) -> Result<UserResponse, AppError> {
        let full_name = full_name.trim();
        let email = normalize_identifier(email);
        if full_name.is_empty() || email.is_empty() {
            return Err(AppError::BadRequest("All fields are required".to_string()));
        }
        if !email.validate_email() {
            return Err(AppError::BadRequest("Invalid value for: email".to_string()));
        }

        let user = self
            .store
            .update_account(user_id, full_name, &email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        tracing::info!(user_id = %user_id, "Account details updated");
        Ok(UserResponse::from(&user))
    }

    /// Upload a new avatar or cover image and point the profile at it.
    pub async fn update_image(
        &self,
        user_id: ObjectId,
        image: ProfileImage,
        file: Option<MediaFile>,
    ) -> Result<UserResponse, AppError> {
        let file = file.ok_or_else(|| {
            AppError::BadRequest(match image {
                ProfileImage::Avatar => "Avatar file is missing".to_string(),
                ProfileImage::CoverImage => "Cover image file is missing".to_string(),
            })
        })?;

        let url = self.media.upload(&file).await?;

        let user = self
            .store
            .update_image(user_id, image, &url)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        tracing::info!(user_id = %user_id, field = image.field(), "Profile image updated");
        Ok(UserResponse::from(&user))
    }

    /// Public channel page, with `isSubscribed` relative to `viewer`.
    pub async fn channel_profile(
        &self,
        user_name: &str,
        viewer: Option<ObjectId>,
    ) -> Result<ChannelProfile, AppError> {
        let user_name = normalize_identifier(user_name);
        if user_name.is_empty() {
            return Err(AppError::BadRequest("Username is missing".to_string()));
        }

        self.store
            .channel_profile(&user_name, viewer)
            .await?
            .ok_or_else(|| AppError::NotFound("Channel does not exist".to_string()))
    }

    pub async fn watch_history(&self, user_id: ObjectId) -> Result<Vec<WatchHistoryEntry>, AppError> {
        self.store
            .watch_history(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::User;
    use crate::services::media::InMemoryMedia;

    async fn setup() -> (Arc<MemoryStore>, Arc<InMemoryMedia>, ProfileService, User) {
        let store = Arc::new(MemoryStore::new());
        let media = Arc::new(InMemoryMedia::new());
        let profiles = ProfileService::new(store.clone(), media.clone());

        let user = User {
            id: ObjectId::new(),
            user_name: "alice".to_string(),
            email: "alice@example.com".to_string(),
            full_name: "Alice".to_string(),
            avatar: "https://media.test/0/old.png".to_string(),
            cover_image: String::new(),
            password: "hash".to_string(),
            refresh_token: None,
            watch_history: vec![],
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        };
        store.insert_user(&user).await.unwrap();
        (store, media, profiles, user)
    }

    fn png() -> Option<MediaFile> {
        Some(MediaFile {
            file_name: "new.png".to_string(),
            content_type: Some("image/png".to_string()),
            bytes: vec![7; 16],
        })
    }

    #[tokio::test]
    async fn test_update_account() {
        let (_, _, profiles, user) = setup().await;

        let updated = profiles
            .update_account(user.id, " Alice Liddell ", "Alice@Wonder.land")
            .await
            .unwrap();
        assert_eq!(updated.full_name, "Alice Liddell");
        assert_eq!(updated.email, "alice@wonder.land");

        assert!(matches!(
            profiles.update_account(user.id, "", "a@b.com").await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            profiles.update_account(user.id, "Alice", "nope").await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_update_account_email_taken() {
        let (store, _, profiles, user) = setup().await;
        let mut bob = user.clone();
        bob.id = ObjectId::new();
        bob.user_name = "bob".to_string();
        bob.email = "bob@example.com".to_string();
        store.insert_user(&bob).await.unwrap();

        assert!(matches!(
            profiles.update_account(user.id, "Alice", "bob@example.com").await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_update_images() {
        let (_, media, profiles, user) = setup().await;

        let updated = profiles
            .update_image(user.id, ProfileImage::CoverImage, png())
            .await
            .unwrap();
        assert!(updated.cover_image.ends_with("new.png"));
        assert_eq!(updated.avatar, user.avatar);

        assert!(matches!(
            profiles.update_image(user.id, ProfileImage::Avatar, None).await,
            Err(AppError::BadRequest(_))
        ));

        media.set_failing(true);
        assert!(matches!(
            profiles.update_image(user.id, ProfileImage::Avatar, png()).await,
            Err(AppError::Upload(_))
        ));
    }

    #[tokio::test]
    async fn test_channel_profile_lookup() {
        let (store, _, profiles, user) = setup().await;
        let viewer = ObjectId::new();
        store.add_subscription(viewer, user.id).await;

        let profile = profiles.channel_profile("ALICE", Some(viewer)).await.unwrap();
        assert_eq!(profile.subscribers_count, 1);
        assert!(profile.is_subscribed);

        assert!(matches!(
            profiles.channel_profile("  ", None).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            profiles.channel_profile("nobody", None).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_watch_history_unknown_user() {
        let (_, _, profiles, user) = setup().await;

        assert!(profiles.watch_history(user.id).await.unwrap().is_empty());
        assert!(matches!(
            profiles.watch_history(ObjectId::new()).await,
            Err(AppError::NotFound(_))
        ));
    }
}
