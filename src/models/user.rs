//! User model for storage and API.

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// User record stored in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// Unique, lower-cased handle (also the channel name)
    pub user_name: String,
    /// Unique, lower-cased email address
    pub email: String,
    pub full_name: String,
    /// Avatar URL on the media host
    pub avatar: String,
    /// Cover image URL, empty when none was uploaded
    #[serde(default)]
    pub cover_image: String,
    /// Argon2 PHC string
    pub password: String,
    /// Most recently issued refresh token, `None` when logged out
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Watched video ids, oldest first
    #[serde(default)]
    pub watch_history: Vec<ObjectId>,
    pub created_at: String,
    pub updated_at: String,
}

/// Sanitized user view returned to clients (no password, no refresh token).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_name: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    pub watch_history: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_hex(),
            user_name: user.user_name.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            avatar: user.avatar.clone(),
            cover_image: user.cover_image.clone(),
            watch_history: user.watch_history.iter().map(|id| id.to_hex()).collect(),
            created_at: user.created_at.clone(),
            updated_at: user.updated_at.clone(),
        }
    }
}

/// Which profile image an upload replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileImage {
    Avatar,
    CoverImage,
}

impl ProfileImage {
    /// Document field holding the image URL.
    pub fn field(self) -> &'static str {
        match self {
            ProfileImage::Avatar => "avatar",
            ProfileImage::CoverImage => "coverImage",
        }
    }
}

/// Normalize a user name or email for storage and lookup.
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim().to_lowercase()
}
