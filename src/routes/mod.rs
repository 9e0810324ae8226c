// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod account;
pub mod auth;
pub mod response;

use crate::error::AppError;
use crate::middleware::auth::{optional_auth, require_auth};
use crate::AppState;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Prefix all user routes are mounted under.
pub const USERS_PREFIX: &str = "/api/v1/users";

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

async fn route_not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer - allow the configured frontend and localhost (for dev)
    let cors_origin = state.config.cors_origin.clone();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                cors_origin == "*"
                    || origin_str == cors_origin
                    || origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Public routes (no auth required)
    let public_routes = auth::routes();

    // Protected routes (auth required)
    let protected_routes = auth::protected_routes()
        .merge(account::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Channel pages: viewer is attached when logged in
    let channel_routes = account::channel_routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), optional_auth));

    let users = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(channel_routes);

    Router::new()
        .route("/health", get(health_check))
        .nest(USERS_PREFIX, users)
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
