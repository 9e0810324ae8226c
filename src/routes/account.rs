// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile routes: current user, account details, images, channel, history.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{ChannelProfile, ProfileImage, UserResponse, WatchHistoryEntry};
use crate::routes::response::{read_form, ApiResponse, AppJson};
use crate::AppState;
use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        Path, State,
    },
    routing::{get, patch},
    Extension, Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Routes behind `require_auth` (applied in routes/mod.rs).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/current-user", get(current_user))
        .route("/update-account", patch(update_account))
        .route("/update-avatar", patch(update_avatar))
        .route("/update-cover-image", patch(update_cover_image))
        .route("/watch-history", get(watch_history))
}

/// Routes behind `optional_auth`.
pub fn channel_routes() -> Router<Arc<AppState>> {
    Router::new().route("/channel/{user_name}", get(channel_profile))
}

async fn current_user(Extension(auth): Extension<AuthUser>) -> ApiResponse<UserResponse> {
    ApiResponse::ok(auth.user, "Current user fetched successfully")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateAccountRequest {
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    email: String,
}

async fn update_account(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    AppJson(body): AppJson<UpdateAccountRequest>,
) -> Result<ApiResponse<UserResponse>> {
    let user = state
        .profiles
        .update_account(auth.user_id, &body.full_name, &body.email)
        .await?;

    Ok(ApiResponse::ok(user, "Account details updated successfully"))
}

async fn update_image(
    state: &AppState,
    auth: &AuthUser,
    image: ProfileImage,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<UserResponse> {
    let mut form = read_form(multipart).await?;
    let file = form.take_file(image.field());

    state.profiles.update_image(auth.user_id, image, file).await
}

async fn update_avatar(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<UserResponse>> {
    let user = update_image(&state, &auth, ProfileImage::Avatar, multipart).await?;
    Ok(ApiResponse::ok(user, "Avatar updated successfully"))
}

async fn update_cover_image(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<UserResponse>> {
    let user = update_image(&state, &auth, ProfileImage::CoverImage, multipart).await?;
    Ok(ApiResponse::ok(user, "Cover image updated successfully"))
}

async fn channel_profile(
    State(state): State<Arc<AppState>>,
    viewer: Option<Extension<AuthUser>>,
    Path(user_name): Path<String>,
) -> Result<ApiResponse<ChannelProfile>> {
    let viewer = viewer.map(|Extension(auth)| auth.user_id);

    let channel = state.profiles.channel_profile(&user_name, viewer).await?;
    Ok(ApiResponse::ok(channel, "User channel fetched successfully"))
}

async fn watch_history(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<ApiResponse<Vec<WatchHistoryEntry>>> {
    let history = state.profiles.watch_history(auth.user_id).await?;
    Ok(ApiResponse::ok(history, "Watch history fetched successfully"))
}
