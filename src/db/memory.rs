//! In-process `UserStore` used by tests and local runs without MongoDB.
//!
//! A single lock guards all collections, so every trait method is atomic
//! with respect to the others, matching the single-document atomicity the
//! MongoDB backend gets from the server.

use crate::db::{assemble_watch_history, UserStore};
use crate::error::AppError;
use crate::models::{ChannelProfile, ProfileImage, Subscription, User, Video, WatchHistoryEntry};
use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Collections {
    users: HashMap<ObjectId, User>,
    subscriptions: Vec<Subscription>,
    videos: HashMap<ObjectId, Video>,
}

/// In-memory store.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `subscriber` following `channel`.
    pub async fn add_subscription(&self, subscriber: ObjectId, channel: ObjectId) {
        self.inner.write().await.subscriptions.push(Subscription {
            id: ObjectId::new(),
            subscriber,
            channel,
            created_at: chrono::Utc::now().to_rfc3339(),
        });
    }

    pub async fn add_video(&self, video: Video) {
        self.inner.write().await.videos.insert(video.id, video);
    }

    /// Append a video to a user's watch history.
    pub async fn push_watch_history(&self, user_id: ObjectId, video_id: ObjectId) {
        if let Some(user) = self.inner.write().await.users.get_mut(&user_id) {
            user.watch_history.push(video_id);
        }
    }
}

fn touch(user: &mut User) {
    user.updated_at = chrono::Utc::now().to_rfc3339();
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;

        let taken = inner
            .users
            .values()
            .any(|u| u.email == user.email || u.user_name == user.user_name);
        if taken {
            return Err(AppError::Conflict(
                "User with email or username already exists".to_string(),
            ));
        }

        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<User>, AppError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_by_email_or_user_name(
        &self,
        email: Option<&str>,
        user_name: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| {
                email.is_some_and(|e| u.email == e) || user_name.is_some_and(|n| u.user_name == n)
            })
            .cloned())
    }

    async fn set_refresh_token(&self, id: ObjectId, token: Option<&str>) -> Result<(), AppError> {
        if let Some(user) = self.inner.write().await.users.get_mut(&id) {
            user.refresh_token = token.map(str::to_string);
        }
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        id: ObjectId,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        match inner.users.get_mut(&id) {
            Some(user) if user.refresh_token.as_deref() == Some(expected) => {
                user.refresh_token = Some(replacement.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_password(&self, id: ObjectId, password_hash: &str) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(false);
        };
        user.password = password_hash.to_string();
        user.refresh_token = None;
        touch(user);
        Ok(true)
    }

    async fn update_account(
        &self,
        id: ObjectId,
        full_name: &str,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        let mut inner = self.inner.write().await;

        if inner.users.values().any(|u| u.id != id && u.email == email) {
            return Err(AppError::Conflict(
                "User with email or username already exists".to_string(),
            ));
        }

        Ok(inner.users.get_mut(&id).map(|user| {
            user.full_name = full_name.to_string();
            user.email = email.to_string();
            touch(user);
            user.clone()
        }))
    }

    async fn update_image(
        &self,
        id: ObjectId,
        image: ProfileImage,
        url: &str,
    ) -> Result<Option<User>, AppError> {
        let mut inner = self.inner.write().await;
        Ok(inner.users.get_mut(&id).map(|user| {
            match image {
                ProfileImage::Avatar => user.avatar = url.to_string(),
                ProfileImage::CoverImage => user.cover_image = url.to_string(),
            }
            touch(user);
            user.clone()
        }))
    }

    async fn channel_profile(
        &self,
        user_name: &str,
        viewer: Option<ObjectId>,
    ) -> Result<Option<ChannelProfile>, AppError> {
        let inner = self.inner.read().await;
        let Some(user) = inner.users.values().find(|u| u.user_name == user_name) else {
            return Ok(None);
        };

        let subscribers = inner
            .subscriptions
            .iter()
            .filter(|s| s.channel == user.id)
            .count() as u64;
        let subscribed_to = inner
            .subscriptions
            .iter()
            .filter(|s| s.subscriber == user.id)
            .count() as u64;
        let is_subscribed = viewer.is_some_and(|v| {
            inner
                .subscriptions
                .iter()
                .any(|s| s.channel == user.id && s.subscriber == v)
        });

        Ok(Some(ChannelProfile::new(
            user,
            subscribers,
            subscribed_to,
            is_subscribed,
        )))
    }

    async fn watch_history(&self, id: ObjectId) -> Result<Option<Vec<WatchHistoryEntry>>, AppError> {
        let inner = self.inner.read().await;
        let Some(user) = inner.users.get(&id) else {
            return Ok(None);
        };

        let videos: Vec<Video> = user
            .watch_history
            .iter()
            .filter_map(|v| inner.videos.get(v).cloned())
            .collect();
        let owners: Vec<User> = videos
            .iter()
            .filter_map(|v| inner.users.get(&v.owner).cloned())
            .collect();

        Ok(Some(assemble_watch_history(
            &user.watch_history,
            videos,
            &owners,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> User {
        User {
            id: ObjectId::new(),
            user_name: name.to_string(),
            email: format!("{name}@example.com"),
            full_name: name.to_uppercase(),
            avatar: format!("https://media.example/{name}.png"),
            cover_image: String::new(),
            password: "hash".to_string(),
            refresh_token: None,
            watch_history: vec![],
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_email_or_name() {
        let store = MemoryStore::new();
        store.insert_user(&user("alice")).await.unwrap();

        let mut same_name = user("alice");
        same_name.email = "other@example.com".to_string();
        assert!(matches!(
            store.insert_user(&same_name).await,
            Err(AppError::Conflict(_))
        ));

        let mut same_email = user("bob");
        same_email.email = "alice@example.com".to_string();
        assert!(matches!(
            store.insert_user(&same_email).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_rotate_is_compare_and_swap() {
        let store = MemoryStore::new();
        let alice = user("alice");
        store.insert_user(&alice).await.unwrap();
        store.set_refresh_token(alice.id, Some("t1")).await.unwrap();

        assert!(store.rotate_refresh_token(alice.id, "t1", "t2").await.unwrap());
        // Second rotation from the superseded token must lose.
        assert!(!store.rotate_refresh_token(alice.id, "t1", "t3").await.unwrap());

        let stored = store.find_by_id(alice.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some("t2"));
    }

    #[tokio::test]
    async fn test_rotate_fails_after_logout() {
        let store = MemoryStore::new();
        let alice = user("alice");
        store.insert_user(&alice).await.unwrap();
        store.set_refresh_token(alice.id, Some("t1")).await.unwrap();
        store.set_refresh_token(alice.id, None).await.unwrap();

        assert!(!store.rotate_refresh_token(alice.id, "t1", "t2").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_password_clears_refresh_token() {
        let store = MemoryStore::new();
        let alice = user("alice");
        store.insert_user(&alice).await.unwrap();
        store.set_refresh_token(alice.id, Some("t1")).await.unwrap();

        assert!(store.update_password(alice.id, "new-hash").await.unwrap());

        let stored = store.find_by_id(alice.id).await.unwrap().unwrap();
        assert_eq!(stored.password, "new-hash");
        assert!(stored.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_channel_profile_counts() {
        let store = MemoryStore::new();
        let (alice, bob, carol) = (user("alice"), user("bob"), user("carol"));
        for u in [&alice, &bob, &carol] {
            store.insert_user(u).await.unwrap();
        }
        store.add_subscription(bob.id, alice.id).await;
        store.add_subscription(carol.id, alice.id).await;
        store.add_subscription(alice.id, carol.id).await;

        let profile = store
            .channel_profile("alice", Some(bob.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.subscribers_count, 2);
        assert_eq!(profile.channels_subscribed_to_count, 1);
        assert!(profile.is_subscribed);

        let anonymous = store.channel_profile("alice", None).await.unwrap().unwrap();
        assert!(!anonymous.is_subscribed);

        assert!(store.channel_profile("nobody", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_watch_history_order_and_owner() {
        let store = MemoryStore::new();
        let (alice, bob) = (user("alice"), user("bob"));
        store.insert_user(&alice).await.unwrap();
        store.insert_user(&bob).await.unwrap();

        let first = Video {
            id: ObjectId::new(),
            title: "First".to_string(),
            thumbnail: String::new(),
            video_file: String::new(),
            duration: 12.5,
            views: 3,
            owner: bob.id,
        };
        let second = Video {
            title: "Second".to_string(),
            id: ObjectId::new(),
            ..first.clone()
        };
        store.add_video(second.clone()).await;
        store.add_video(first.clone()).await;
        store.push_watch_history(alice.id, first.id).await;
        store.push_watch_history(alice.id, ObjectId::new()).await; // deleted video
        store.push_watch_history(alice.id, second.id).await;

        let history = store.watch_history(alice.id).await.unwrap().unwrap();
        let titles: Vec<&str> = history.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["First", "Second"]);
        assert_eq!(history[0].owner.as_ref().unwrap().user_name, "bob");

        assert!(store.watch_history(ObjectId::new()).await.unwrap().is_none());
    }
}
