// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Vidshare accounts API server
//!
//! Serves registration, sessions and profiles for the video-sharing site,
//! backed by MongoDB and a Cloudinary-compatible media host.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vidshare_accounts::{
    config::Config,
    db::MongoDb,
    services::CloudinaryUploader,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting vidshare-accounts API");

    // Connect to MongoDB and make sure unique indexes exist
    let db = MongoDb::connect(&config.mongodb_uri, &config.mongodb_database).await?;
    db.ensure_indexes().await?;

    if config.cloudinary_cloud_name.is_empty() {
        tracing::warn!("CLOUDINARY_CLOUD_NAME not set, image uploads will fail");
    }
    let media = CloudinaryUploader::from_config(&config);

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), Arc::new(db), Arc::new(media))?);

    // Build router
    let app = vidshare_accounts::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("vidshare_accounts=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
