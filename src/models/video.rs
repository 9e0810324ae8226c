//! Video documents as read for a user's watch history.

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Video stored in the `videos` collection. Only the fields this service reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub video_file: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub views: u64,
    pub owner: ObjectId,
}

/// Owner summary embedded in each watch-history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoOwner {
    #[serde(rename = "_id")]
    pub id: String,
    pub full_name: String,
    pub user_name: String,
    pub avatar: String,
}

/// One watched video with its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchHistoryEntry {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub thumbnail: String,
    pub video_file: String,
    pub duration: f64,
    pub views: u64,
    /// `None` when the owner account no longer exists
    pub owner: Option<VideoOwner>,
}

impl WatchHistoryEntry {
    pub fn new(video: &Video, owner: Option<VideoOwner>) -> Self {
        Self {
            id: video.id.to_hex(),
            title: video.title.clone(),
            thumbnail: video.thumbnail.clone(),
            video_file: video.video_file.clone(),
            duration: video.duration,
            views: video.views,
            owner,
        }
    }
}
