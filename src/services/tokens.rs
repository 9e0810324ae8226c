// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access/refresh token issuance and verification.
//!
//! Both token kinds are HS256 JWTs carrying the user id in `sub`. They are
//! signed with different keys, so a refresh token is never accepted where an
//! access token is expected and vice versa.

use crate::config::{Config, ConfigError};
use crate::error::AppError;
use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// JWT claims structure shared by both token kinds.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user id, hex)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Unique token id; keeps two tokens minted in the same second distinct
    pub jti: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Freshly issued access/refresh pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningKeys {
    fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }
}

/// Signs and verifies tokens with the configured keys.
#[derive(Clone)]
pub struct TokenIssuer {
    access: Arc<SigningKeys>,
    refresh: Arc<SigningKeys>,
}

impl TokenIssuer {
    /// Build from config. Empty or identical keys are a misconfiguration.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let (access, refresh) = (&config.access_token_secret, &config.refresh_token_secret);
        if access.is_empty() || refresh.is_empty() || access == refresh {
            return Err(ConfigError::SigningKeys);
        }

        Ok(Self {
            access: Arc::new(SigningKeys::new(access, config.access_token_ttl)),
            refresh: Arc::new(SigningKeys::new(refresh, config.refresh_token_ttl)),
        })
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Lifetime of tokens of the given kind.
    pub fn ttl(&self, kind: TokenKind) -> Duration {
        self.keys(kind).ttl
    }

    /// Mint a new access/refresh pair for `user_id`.
    pub fn issue(&self, user_id: ObjectId) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.sign(user_id, TokenKind::Access)?,
            refresh_token: self.sign(user_id, TokenKind::Refresh)?,
        })
    }

    fn sign(&self, user_id: ObjectId, kind: TokenKind) -> Result<String, AppError> {
        let keys = self.keys(kind);
        let now = chrono::Utc::now().timestamp();

        let claims = Claims {
            sub: user_id.to_hex(),
            iat: now as usize,
            exp: (now + keys.ttl.num_seconds()).max(0) as usize,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to sign {:?} token: {}", kind, e))
        })
    }

    /// Check signature and expiry and return the user id the token is bound to.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<ObjectId, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data = decode::<Claims>(token, &self.keys(kind).decoding, &validation)
            .map_err(|e| {
                tracing::debug!(error = %e, ?kind, "Token verification failed");
                AppError::InvalidToken
            })?;

        ObjectId::parse_str(&token_data.claims.sub).map_err(|_| AppError::InvalidToken)
    }
}
