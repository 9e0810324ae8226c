// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session lifecycle: register, login, logout, refresh, change password.
//!
//! Each user has a single refresh-token slot. Login overwrites it, logout and
//! password changes clear it, and refresh swaps it atomically so a refresh
//! token can be redeemed at most once.

use crate::db::UserStore;
use crate::error::AppError;
use crate::models::user::normalize_identifier;
use crate::models::{User, UserResponse};
use crate::services::media::{MediaFile, MediaUploader};
use crate::services::password::{hash_password, verify_password};
use crate::services::tokens::{TokenIssuer, TokenKind, TokenPair};
use mongodb::bson::oid::ObjectId;
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;

/// New account as submitted on the registration form.
#[derive(Debug, Clone, Default, Validate)]
pub struct Registration {
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    pub user_name: String,
    pub password: String,
    pub avatar: Option<MediaFile>,
    pub cover_image: Option<MediaFile>,
}

/// Successful login: the user plus a fresh token pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    pub user: UserResponse,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// Session controller over the credential store.
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn UserStore>,
    media: Arc<dyn MediaUploader>,
    tokens: TokenIssuer,
}

impl SessionService {
    pub fn new(store: Arc<dyn UserStore>, media: Arc<dyn MediaUploader>, tokens: TokenIssuer) -> Self {
        Self {
            store,
            media,
            tokens,
        }
    }

    /// Create an account. Returns the stored record, sanitized.
    pub async fn register(&self, mut form: Registration) -> Result<UserResponse, AppError> {
        form.full_name = form.full_name.trim().to_string();
        form.email = normalize_identifier(&form.email);
        form.user_name = normalize_identifier(&form.user_name);

        let fields = [&form.full_name, &form.email, &form.user_name, &form.password];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err(AppError::BadRequest("All fields are required".to_string()));
        }
        form.validate()?;

        if self
            .store
            .find_by_email_or_user_name(Some(&form.email), Some(&form.user_name))
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "User with email or username already exists".to_string(),
            ));
        }

        let avatar_file = form
            .avatar
            .as_ref()
            .ok_or_else(|| AppError::BadRequest("Avatar file is required".to_string()))?;
        let avatar = self.media.upload(avatar_file).await?;

        let cover_image = match &form.cover_image {
            Some(file) => self.media.upload(file).await.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Cover image upload failed, continuing without it");
                String::new()
            }),
            None => String::new(),
        };

        let now = chrono::Utc::now().to_rfc3339();
        let user = User {
            id: ObjectId::new(),
            user_name: form.user_name,
            email: form.email,
            full_name: form.full_name,
            avatar,
            cover_image,
            password: hash_password(&form.password).await?,
            refresh_token: None,
            watch_history: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.store.insert_user(&user).await?;

        let created = self.store.find_by_id(user.id).await?.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("User {} missing after insert", user.id))
        })?;

        tracing::info!(user_id = %created.id, user_name = %created.user_name, "User registered");
        Ok(UserResponse::from(&created))
    }

    /// Authenticate by email or user name and start a session.
    pub async fn login(
        &self,
        email: Option<&str>,
        user_name: Option<&str>,
        password: &str,
    ) -> Result<LoginOutcome, AppError> {
        let email = email.map(normalize_identifier).filter(|e| !e.is_empty());
        let user_name = user_name.map(normalize_identifier).filter(|n| !n.is_empty());
        if email.is_none() && user_name.is_none() {
            return Err(AppError::BadRequest(
                "Username or email is required".to_string(),
            ));
        }

        let user = self
            .store
            .find_by_email_or_user_name(email.as_deref(), user_name.as_deref())
            .await?
            .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

        if !verify_password(password, &user.password).await? {
            tracing::info!(user_id = %user.id, "Login rejected: bad password");
            return Err(AppError::InvalidCredentials);
        }

        let tokens = self.tokens.issue(user.id)?;
        self.store
            .set_refresh_token(user.id, Some(&tokens.refresh_token))
            .await?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(LoginOutcome {
            user: UserResponse::from(&user),
            tokens,
        })
    }

    /// End the session by clearing the stored refresh token.
    pub async fn logout(&self, user_id: ObjectId) -> Result<(), AppError> {
        self.store.set_refresh_token(user_id, None).await?;
        tracing::info!(user_id = %user_id, "User logged out");
        Ok(())
    }

    /// Trade a refresh token for a new pair, invalidating the old one.
    pub async fn refresh(&self, incoming: Option<&str>) -> Result<TokenPair, AppError> {
        let incoming = incoming
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized)?;

        let user_id = self.tokens.verify(incoming, TokenKind::Refresh)?;

        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::InvalidToken)?;

        if user.refresh_token.as_deref() != Some(incoming) {
            tracing::warn!(user_id = %user_id, "Stale or reused refresh token presented");
            return Err(AppError::TokenExpiredOrReused);
        }

        let tokens = self.tokens.issue(user_id)?;
        let swapped = self
            .store
            .rotate_refresh_token(user_id, incoming, &tokens.refresh_token)
            .await?;
        if !swapped {
            tracing::warn!(user_id = %user_id, "Lost refresh rotation race");
            return Err(AppError::TokenExpiredOrReused);
        }

        tracing::debug!(user_id = %user_id, "Refresh token rotated");
        Ok(tokens)
    }

    /// Replace the password after checking the current one.
    ///
    /// The stored refresh token is cleared in the same write, ending every
    /// session for this user.
    pub async fn change_password(
        &self,
        user_id: ObjectId,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        if old_password.is_empty() || new_password.is_empty() {
            return Err(AppError::BadRequest(
                "Old and new password are required".to_string(),
            ));
        }

        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(old_password, &user.password).await? {
            return Err(AppError::InvalidCredentials);
        }

        let hash = hash_password(new_password).await?;
        if !self.store.update_password(user_id, &hash).await? {
            return Err(AppError::Unauthorized);
        }

        tracing::info!(user_id = %user_id, "Password changed, sessions revoked");
        Ok(())
    }
}
