// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! MongoDB client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profiles, password hashes, refresh-token register)
//! - Subscriptions (read-only, for channel counts)
//! - Videos (read-only, for watch history)

use crate::db::{assemble_watch_history, collections, UserStore};
use crate::error::AppError;
use crate::models::{ChannelProfile, ProfileImage, Subscription, User, Video, WatchHistoryEntry};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, IndexModel};

/// Server error code for unique index violations.
const DUPLICATE_KEY: i32 = 11000;

/// MongoDB database client.
#[derive(Clone)]
pub struct MongoDb {
    db: mongodb::Database,
}

impl MongoDb {
    /// Connect and verify the server is reachable.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        let db = client.database(database);
        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| AppError::Database(format!("MongoDB ping failed: {}", e)))?;

        tracing::info!(database, "Connected to MongoDB");

        Ok(Self { db })
    }

    /// Create the unique and lookup indexes the store relies on.
    ///
    /// The unique indexes on `email` and `userName` are what make concurrent
    /// registrations with the same identifier fail with `Conflict`.
    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        let unique = || IndexOptions::builder().unique(true).build();

        for field in ["email", "userName"] {
            self.users()
                .create_index(
                    IndexModel::builder()
                        .keys(doc! { field: 1 })
                        .options(unique())
                        .build(),
                )
                .await
                .map_err(db_error)?;
        }

        for field in ["channel", "subscriber"] {
            self.subscriptions()
                .create_index(IndexModel::builder().keys(doc! { field: 1 }).build())
                .await
                .map_err(db_error)?;
        }

        tracing::debug!("MongoDB indexes ensured");
        Ok(())
    }

    fn users(&self) -> Collection<User> {
        self.db.collection(collections::USERS)
    }

    fn subscriptions(&self) -> Collection<Subscription> {
        self.db.collection(collections::SUBSCRIPTIONS)
    }

    fn videos(&self) -> Collection<Video> {
        self.db.collection(collections::VIDEOS)
    }

    /// `$set` the given fields plus `updatedAt`, returning the new document.
    async fn set_fields(&self, id: ObjectId, mut fields: Document) -> Result<Option<User>, AppError> {
        fields.insert("updatedAt", chrono::Utc::now().to_rfc3339());

        self.users()
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": fields })
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    AppError::Conflict("User with email or username already exists".to_string())
                } else {
                    db_error(e)
                }
            })
    }
}

fn db_error(e: mongodb::error::Error) -> AppError {
    AppError::Database(e.to_string())
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

#[async_trait]
impl UserStore for MongoDb {
    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        self.users().insert_one(user).await.map_err(|e| {
            if is_duplicate_key(&e) {
                AppError::Conflict("User with email or username already exists".to_string())
            } else {
                db_error(e)
            }
        })?;
        Ok(())
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<User>, AppError> {
        self.users()
            .find_one(doc! { "_id": id })
            .await
            .map_err(db_error)
    }

    async fn find_by_email_or_user_name(
        &self,
        email: Option<&str>,
        user_name: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        let mut any_of: Vec<Document> = Vec::new();
        if let Some(email) = email {
            any_of.push(doc! { "email": email });
        }
        if let Some(user_name) = user_name {
            any_of.push(doc! { "userName": user_name });
        }
        if any_of.is_empty() {
            return Ok(None);
        }

        self.users()
            .find_one(doc! { "$or": any_of })
            .await
            .map_err(db_error)
    }

    async fn set_refresh_token(&self, id: ObjectId, token: Option<&str>) -> Result<(), AppError> {
        let value = token.map_or(Bson::Null, |t| Bson::String(t.to_string()));

        self.users()
            .update_one(doc! { "_id": id }, doc! { "$set": { "refreshToken": value } })
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        id: ObjectId,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, AppError> {
        // Single conditional update: the filter on the current token makes
        // this a compare-and-swap on the server.
        let result = self
            .users()
            .update_one(
                doc! { "_id": id, "refreshToken": expected },
                doc! { "$set": { "refreshToken": replacement } },
            )
            .await
            .map_err(db_error)?;

        Ok(result.matched_count == 1)
    }

    async fn update_password(&self, id: ObjectId, password_hash: &str) -> Result<bool, AppError> {
        let result = self
            .users()
            .update_one(
                doc! { "_id": id },
                doc! { "$set": {
                    "password": password_hash,
                    "refreshToken": Bson::Null,
                    "updatedAt": chrono::Utc::now().to_rfc3339(),
                } },
            )
            .await
            .map_err(db_error)?;

        Ok(result.matched_count == 1)
    }

    async fn update_account(
        &self,
        id: ObjectId,
        full_name: &str,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        self.set_fields(id, doc! { "fullName": full_name, "email": email })
            .await
    }

    async fn update_image(
        &self,
        id: ObjectId,
        image: ProfileImage,
        url: &str,
    ) -> Result<Option<User>, AppError> {
        self.set_fields(id, doc! { image.field(): url }).await
    }

    async fn channel_profile(
        &self,
        user_name: &str,
        viewer: Option<ObjectId>,
    ) -> Result<Option<ChannelProfile>, AppError> {
        let Some(user) = self
            .users()
            .find_one(doc! { "userName": user_name })
            .await
            .map_err(db_error)?
        else {
            return Ok(None);
        };

        let subscribers_count = self
            .subscriptions()
            .count_documents(doc! { "channel": user.id })
            .await
            .map_err(db_error)?;

        let channels_subscribed_to_count = self
            .subscriptions()
            .count_documents(doc! { "subscriber": user.id })
            .await
            .map_err(db_error)?;

        let is_subscribed = match viewer {
            Some(viewer) => {
                self.subscriptions()
                    .count_documents(doc! { "channel": user.id, "subscriber": viewer })
                    .await
                    .map_err(db_error)?
                    > 0
            }
            None => false,
        };

        Ok(Some(ChannelProfile::new(
            &user,
            subscribers_count,
            channels_subscribed_to_count,
            is_subscribed,
        )))
    }

    async fn watch_history(&self, id: ObjectId) -> Result<Option<Vec<WatchHistoryEntry>>, AppError> {
        let Some(user) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        if user.watch_history.is_empty() {
            return Ok(Some(Vec::new()));
        }

        let videos: Vec<Video> = self
            .videos()
            .find(doc! { "_id": { "$in": user.watch_history.clone() } })
            .await
            .map_err(db_error)?
            .try_collect()
            .await
            .map_err(db_error)?;

        let mut owner_ids: Vec<ObjectId> = videos.iter().map(|v| v.owner).collect();
        owner_ids.sort();
        owner_ids.dedup();

        let owners: Vec<User> = self
            .users()
            .find(doc! { "_id": { "$in": owner_ids } })
            .await
            .map_err(db_error)?
            .try_collect()
            .await
            .map_err(db_error)?;

        tracing::debug!(
            user_id = %id,
            watched = user.watch_history.len(),
            found = videos.len(),
            "Loaded watch history"
        );

        Ok(Some(assemble_watch_history(
            &user.watch_history,
            videos,
            &owners,
        )))
    }
}
