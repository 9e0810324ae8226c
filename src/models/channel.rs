//! Subscription edges and the derived channel profile view.

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// A `subscriber` following a `channel`, stored in `subscriptions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub subscriber: ObjectId,
    pub channel: ObjectId,
    pub created_at: String,
}

/// Public channel page for a user, with counts derived from `subscriptions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub full_name: String,
    pub user_name: String,
    pub email: String,
    pub avatar: String,
    pub cover_image: String,
    pub subscribers_count: u64,
    pub channels_subscribed_to_count: u64,
    /// Whether the requesting user subscribes to this channel
    pub is_subscribed: bool,
}

impl ChannelProfile {
    pub fn new(
        user: &super::User,
        subscribers_count: u64,
        channels_subscribed_to_count: u64,
        is_subscribed: bool,
    ) -> Self {
        Self {
            id: user.id.to_hex(),
            full_name: user.full_name.clone(),
            user_name: user.user_name.clone(),
            email: user.email.clone(),
            avatar: user.avatar.clone(),
            cover_image: user.cover_image.clone(),
            subscribers_count,
            channels_subscribed_to_count,
            is_subscribed,
        }
    }
}
