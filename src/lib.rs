// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Vidshare accounts: user accounts and sessions for a video-sharing site
//!
//! This crate provides the backend API for registration, login, token
//! refresh, profile management, channel pages and watch history.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::{Config, ConfigError};
use db::UserStore;
use services::{MediaUploader, ProfileService, SessionService, TokenIssuer};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub tokens: TokenIssuer,
    pub sessions: SessionService,
    pub profiles: ProfileService,
}

impl AppState {
    /// Wire the services over the given store and media host.
    pub fn new(
        config: Config,
        store: Arc<dyn UserStore>,
        media: Arc<dyn MediaUploader>,
    ) -> Result<Self, ConfigError> {
        let tokens = TokenIssuer::new(&config)?;
        let sessions = SessionService::new(store.clone(), media.clone(), tokens.clone());
        let profiles = ProfileService::new(store, media);

        Ok(Self {
            config,
            tokens,
            sessions,
            profiles,
        })
    }
}
