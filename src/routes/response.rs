// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Success envelope and request extractors shared by the handlers.

use crate::error::AppError;
use crate::services::MediaFile;
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::collections::HashMap;

/// `{statusCode, data, message, success}` envelope for successful calls.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    #[serde(skip)]
    status: StatusCode,
    status_code: u16,
    data: T,
    message: String,
    success: bool,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn with_status(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status,
            status_code: status.as_u16(),
            data,
            message: message.into(),
            success: status.is_success(),
        }
    }

    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::OK, data, message)
    }

    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::CREATED, data, message)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// `Json` extractor whose rejections use the error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Text fields and files from a multipart form.
#[derive(Debug, Default)]
pub struct FormData {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, MediaFile>,
}

impl FormData {
    /// Text field value, empty when absent.
    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    pub fn take_file(&mut self, name: &str) -> Option<MediaFile> {
        self.files.remove(name)
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::BadRequest(e.body_text())
    }
}

/// Drain a multipart body. Empty file parts are treated as absent.
pub async fn read_form(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<FormData, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let mut form = FormData::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(multipart_error)?;
                if bytes.is_empty() {
                    continue;
                }
                form.files.insert(
                    name,
                    MediaFile {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    },
                );
            }
            None => {
                let value = field
                    .text()
                    .await
                    .map_err(multipart_error)?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}
