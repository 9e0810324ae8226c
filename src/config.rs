//! Application configuration loaded from environment variables.
//!
//! Everything the services need (signing keys, token lifetimes, cookie
//! flags) is resolved once at startup and handed to them explicitly.

use chrono::Duration;
use std::env;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Server port
    pub port: u16,
    /// Frontend origin allowed by CORS
    pub cors_origin: String,
    /// MongoDB connection string
    pub mongodb_uri: String,
    /// MongoDB database name
    pub mongodb_database: String,
    /// Access token lifetime
    pub access_token_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_token_ttl: Duration,
    /// Whether auth cookies carry the `Secure` attribute
    pub cookie_secure: bool,
    /// Largest accepted request body (multipart uploads)
    pub max_upload_bytes: usize,
    /// Cloudinary cloud name for media uploads
    pub cloudinary_cloud_name: String,
    /// Unsigned upload preset configured on the Cloudinary account
    pub cloudinary_upload_preset: String,

    // --- Secrets ---
    /// HMAC key for access tokens (raw bytes)
    pub access_token_secret: Vec<u8>,
    /// HMAC key for refresh tokens (raw bytes)
    pub refresh_token_secret: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .unwrap_or(8000),
            cors_origin: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            mongodb_uri: env::var("MONGODB_URI").map_err(|_| ConfigError::Missing("MONGODB_URI"))?,
            mongodb_database: env::var("MONGODB_DATABASE")
                .unwrap_or_else(|_| "videotube".to_string()),
            access_token_ttl: duration_var("ACCESS_TOKEN_EXPIRY", "1d")?,
            refresh_token_ttl: duration_var("REFRESH_TOKEN_EXPIRY", "10d")?,
            cookie_secure: env::var("COOKIE_SECURE")
                .map(|v| !matches!(v.trim(), "false" | "0" | "no"))
                .unwrap_or(true),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            cloudinary_cloud_name: env::var("CLOUDINARY_CLOUD_NAME").unwrap_or_default(),
            cloudinary_upload_preset: env::var("CLOUDINARY_UPLOAD_PRESET").unwrap_or_default(),

            access_token_secret: env::var("ACCESS_TOKEN_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("ACCESS_TOKEN_SECRET"))?
                .into_bytes(),
            refresh_token_secret: env::var("REFRESH_TOKEN_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("REFRESH_TOKEN_SECRET"))?
                .into_bytes(),
        })
    }

    /// Config for tests: fixed keys, no external services.
    pub fn test_default() -> Self {
        Self {
            port: 8000,
            cors_origin: "http://localhost:5173".to_string(),
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_database: "videotube_test".to_string(),
            access_token_ttl: Duration::days(1),
            refresh_token_ttl: Duration::days(10),
            cookie_secure: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cloudinary_cloud_name: String::new(),
            cloudinary_upload_preset: String::new(),
            access_token_secret: b"test_access_key_32_bytes_minimum".to_vec(),
            refresh_token_secret: b"test_refresh_key_32_bytes_minimum".to_vec(),
        }
    }
}

fn duration_var(name: &'static str, default: &str) -> Result<Duration, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    parse_duration(&raw).ok_or(ConfigError::Invalid(name))
}

/// Parse a lifetime such as `15m`, `1d` or `3600` (seconds).
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let value: i64 = digits.parse().ok()?;

    // Out-of-range values yield None.
    match unit {
        "" | "s" => Duration::try_seconds(value),
        "m" => Duration::try_minutes(value),
        "h" => Duration::try_hours(value),
        "d" => Duration::try_days(value),
        "w" => Duration::try_weeks(value),
        _ => None,
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Token signing keys must be non-empty and distinct")]
    SigningKeys,
}
