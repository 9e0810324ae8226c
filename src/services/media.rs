// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Media host client for avatar and cover image uploads.
//!
//! The account service only needs "bytes in, public URL out", so the host is
//! behind the `MediaUploader` trait. Production uses Cloudinary's unsigned
//! upload endpoint; tests use `InMemoryMedia`.

use crate::config::Config;
use crate::error::AppError;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// An uploaded file as received from a multipart form.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait MediaUploader: Send + Sync {
    /// Upload `file` and return its public URL.
    async fn upload(&self, file: &MediaFile) -> Result<String, AppError>;
}

/// Cloudinary upload API client.
#[derive(Clone)]
pub struct CloudinaryUploader {
    http: reqwest::Client,
    upload_url: String,
    upload_preset: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
}

impl CloudinaryUploader {
    pub fn new(cloud_name: &str, upload_preset: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            upload_url: format!(
                "https://api.cloudinary.com/v1_1/{}/image/upload",
                cloud_name
            ),
            upload_preset: upload_preset.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.cloudinary_cloud_name,
            &config.cloudinary_upload_preset,
        )
    }
}

#[async_trait]
impl MediaUploader for CloudinaryUploader {
    async fn upload(&self, file: &MediaFile) -> Result<String, AppError> {
        let mut part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone());
        if let Some(content_type) = &file.content_type {
            part = part
                .mime_str(content_type)
                .map_err(|e| AppError::Upload(format!("Invalid content type: {}", e)))?;
        }

        let form = reqwest::multipart::Form::new()
            .text("upload_preset", self.upload_preset.clone())
            .part("file", part);

        let response = self
            .http
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Upload(format!("Upload request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %text, "Media host rejected upload");
            return Err(AppError::Upload(format!("Media host returned {}", status)));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upload(format!("Invalid upload response: {}", e)))?;

        let url = body
            .secure_url
            .or(body.url)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AppError::Upload("Upload response had no URL".to_string()))?;

        tracing::debug!(file = %file.file_name, bytes = file.bytes.len(), "Uploaded media");
        Ok(url)
    }
}

/// Uploader that fabricates URLs locally. Can be switched to fail.
#[derive(Default)]
pub struct InMemoryMedia {
    uploads: AtomicUsize,
    failing: AtomicBool,
}

impl InMemoryMedia {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent uploads fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of successful uploads so far.
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaUploader for InMemoryMedia {
    async fn upload(&self, file: &MediaFile) -> Result<String, AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Upload("Media host unavailable".to_string()));
        }
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("https://media.test/{}/{}", n, file.file_name))
    }
}
