// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access-token authentication middleware.

use crate::error::AppError;
use crate::models::UserResponse;
use crate::services::TokenKind;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use mongodb::bson::oid::ObjectId;
use std::sync::Arc;

/// Cookie carrying the access token.
pub const ACCESS_COOKIE: &str = "accessToken";
/// Cookie carrying the refresh token.
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Authenticated user extracted from the access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: ObjectId,
    /// Sanitized record as loaded at authentication time
    pub user: UserResponse,
}

/// Access token from the cookie, falling back to a bearer header.
fn access_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(ACCESS_COOKIE) {
        return Some(cookie.value().to_string());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

async fn authenticate(state: &AppState, token: &str) -> Result<AuthUser, AppError> {
    let user_id = state.tokens.verify(token, TokenKind::Access)?;

    let user = state
        .profiles
        .current_user(user_id)
        .await?
        .ok_or(AppError::InvalidToken)?;

    Ok(AuthUser { user_id, user })
}

/// Middleware that requires a valid access token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = access_token(&jar, request.headers()).ok_or(AppError::Unauthorized)?;

    let auth_user = authenticate(&state, &token).await?;
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Middleware that attaches the user when a valid token is present.
///
/// Missing or invalid tokens are not an error; the request proceeds anonymously.
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = access_token(&jar, request.headers()) {
        match authenticate(&state, &token).await {
            Ok(auth_user) => {
                request.extensions_mut().insert(auth_user);
            }
            Err(e) => tracing::debug!(error = %e, "Ignoring unusable access token"),
        }
    }

    next.run(request).await
}
