//! Credential store: the `UserStore` interface and its backends.

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoDb;

use crate::error::AppError;
use crate::models::{ChannelProfile, ProfileImage, User, Video, VideoOwner, WatchHistoryEntry};
use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use std::collections::HashMap;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const SUBSCRIPTIONS: &str = "subscriptions";
    pub const VIDEOS: &str = "videos";
}

/// Persistence operations the account services need.
///
/// User names and emails passed in are already normalized
/// (see [`crate::models::user::normalize_identifier`]).
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Fails with `Conflict` if the email or user name is taken.
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<User>, AppError>;

    /// Find a user whose email OR user name matches any of the given values.
    async fn find_by_email_or_user_name(
        &self,
        email: Option<&str>,
        user_name: Option<&str>,
    ) -> Result<Option<User>, AppError>;

    /// Unconditionally overwrite (or clear) the stored refresh token.
    async fn set_refresh_token(&self, id: ObjectId, token: Option<&str>) -> Result<(), AppError>;

    /// Replace the stored refresh token only if it still equals `expected`.
    ///
    /// Returns `false` when the user is gone or another writer got there first.
    async fn rotate_refresh_token(
        &self,
        id: ObjectId,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, AppError>;

    /// Store a new password hash and clear the refresh token in one write.
    async fn update_password(&self, id: ObjectId, password_hash: &str) -> Result<bool, AppError>;

    /// Update name and email, returning the updated record.
    async fn update_account(
        &self,
        id: ObjectId,
        full_name: &str,
        email: &str,
    ) -> Result<Option<User>, AppError>;

    /// Point a profile image at a new URL, returning the updated record.
    async fn update_image(
        &self,
        id: ObjectId,
        image: ProfileImage,
        url: &str,
    ) -> Result<Option<User>, AppError>;

    /// Channel page for `user_name` with subscription counts relative to `viewer`.
    async fn channel_profile(
        &self,
        user_name: &str,
        viewer: Option<ObjectId>,
    ) -> Result<Option<ChannelProfile>, AppError>;

    /// Watched videos in stored order. `None` if the user does not exist.
    async fn watch_history(&self, id: ObjectId) -> Result<Option<Vec<WatchHistoryEntry>>, AppError>;
}

/// Order fetched videos by `watched` and attach owner summaries.
///
/// Ids in `watched` with no matching video are skipped.
pub(crate) fn assemble_watch_history(
    watched: &[ObjectId],
    videos: Vec<Video>,
    owners: &[User],
) -> Vec<WatchHistoryEntry> {
    let videos: HashMap<ObjectId, Video> = videos.into_iter().map(|v| (v.id, v)).collect();

    watched
        .iter()
        .filter_map(|id| videos.get(id))
        .map(|video| {
            let owner = owners
                .iter()
                .find(|u| u.id == video.owner)
                .map(|u| VideoOwner {
                    id: u.id.to_hex(),
                    full_name: u.full_name.clone(),
                    user_name: u.user_name.clone(),
                    avatar: u.avatar.clone(),
                });
            WatchHistoryEntry::new(video, owner)
        })
        .collect()
}
