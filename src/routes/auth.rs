// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session routes: register, login, logout, token refresh, password change.

use axum::{
    body::Bytes,
    extract::{
        multipart::{Multipart, MultipartRejection},
        State,
    },
    routing::post,
    Extension, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::middleware::auth::{AuthUser, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::models::UserResponse;
use crate::routes::response::{read_form, ApiResponse, AppJson};
use crate::services::{LoginOutcome, Registration, TokenKind, TokenPair};
use crate::AppState;

/// Routes that need no access token.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
}

/// Routes behind `require_auth` (applied in routes/mod.rs).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
}

// ─── Cookies ─────────────────────────────────────────────────

fn token_cookie(name: &'static str, value: String, max_age: time::Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age)
        .build()
}

/// Set both token cookies, each living as long as its token.
fn set_token_cookies(jar: CookieJar, state: &AppState, tokens: &TokenPair) -> CookieJar {
    let secure = state.config.cookie_secure;
    let ttl = |kind| time::Duration::seconds(state.tokens.ttl(kind).num_seconds());

    jar.add(token_cookie(
        ACCESS_COOKIE,
        tokens.access_token.clone(),
        ttl(TokenKind::Access),
        secure,
    ))
    .add(token_cookie(
        REFRESH_COOKIE,
        tokens.refresh_token.clone(),
        ttl(TokenKind::Refresh),
        secure,
    ))
}

/// Expire both token cookies, using the same attributes they were set with.
fn clear_token_cookies(jar: CookieJar, config: &Config) -> CookieJar {
    let secure = config.cookie_secure;

    jar.add(token_cookie(ACCESS_COOKIE, String::new(), time::Duration::ZERO, secure))
        .add(token_cookie(REFRESH_COOKIE, String::new(), time::Duration::ZERO, secure))
}

// ─── Handlers ────────────────────────────────────────────────

async fn register(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<UserResponse>> {
    let mut form = read_form(multipart).await?;

    let registration = Registration {
        full_name: form.text("fullName"),
        email: form.text("email"),
        user_name: form.text("userName"),
        password: form.text("password"),
        avatar: form.take_file("avatar"),
        cover_image: form.take_file("coverImage"),
    };

    let user = state.sessions.register(registration).await?;
    Ok(ApiResponse::created(user, "User registered successfully"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_name: Option<String>,
    #[serde(default)]
    password: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    AppJson(body): AppJson<LoginRequest>,
) -> Result<(CookieJar, ApiResponse<LoginOutcome>)> {
    let outcome = state
        .sessions
        .login(
            body.email.as_deref(),
            body.user_name.as_deref(),
            &body.password,
        )
        .await?;

    let jar = set_token_cookies(jar, &state, &outcome.tokens);
    Ok((jar, ApiResponse::ok(outcome, "User logged in successfully")))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<serde_json::Value>)> {
    state.sessions.logout(auth.user_id).await?;

    let jar = clear_token_cookies(jar, &state.config);
    Ok((
        jar,
        ApiResponse::ok(serde_json::json!({}), "User logged out successfully"),
    ))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Refresh token from the cookie, or from a JSON body when there is no cookie.
fn incoming_refresh_token(jar: &CookieJar, body: &[u8]) -> Option<String> {
    if let Some(cookie) = jar.get(REFRESH_COOKIE) {
        return Some(cookie.value().to_string());
    }

    if body.is_empty() {
        return None;
    }
    match serde_json::from_slice::<RefreshRequest>(body) {
        Ok(req) => req.refresh_token,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring unparseable refresh body");
            None
        }
    }
}

async fn refresh_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, ApiResponse<TokenPair>)> {
    let incoming = incoming_refresh_token(&jar, &body);

    let tokens = state.sessions.refresh(incoming.as_deref()).await?;

    let jar = set_token_cookies(jar, &state, &tokens);
    Ok((jar, ApiResponse::ok(tokens, "Access token refreshed")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    #[serde(default)]
    old_password: String,
    #[serde(default)]
    new_password: String,
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    jar: CookieJar,
    AppJson(body): AppJson<ChangePasswordRequest>,
) -> Result<(CookieJar, ApiResponse<serde_json::Value>)> {
    state
        .sessions
        .change_password(auth.user_id, &body.old_password, &body.new_password)
        .await?;

    // Every session was revoked, including this one.
    let jar = clear_token_cookies(jar, &state.config);
    Ok((
        jar,
        ApiResponse::ok(serde_json::json!({}), "Password changed successfully"),
    ))
}
