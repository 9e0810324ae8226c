// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    response::Response,
    Router,
};
use mongodb::bson::oid::ObjectId;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use vidshare_accounts::config::Config;
use vidshare_accounts::db::{MemoryStore, MongoDb};
use vidshare_accounts::routes::create_router;
use vidshare_accounts::services::InMemoryMedia;
use vidshare_accounts::AppState;

pub const BOUNDARY: &str = "----vidshare-test-boundary";

/// Check if a MongoDB server is available via environment variable.
#[allow(dead_code)]
pub fn mongo_available() -> bool {
    std::env::var("MONGODB_URI").is_ok()
}

/// Skip test with message if MongoDB is not available.
#[macro_export]
macro_rules! require_mongo {
    () => {
        if !crate::common::mongo_available() {
            eprintln!("⚠️  Skipping: MONGODB_URI not set");
            return;
        }
    };
}

/// Connect to the MongoDB named by `MONGODB_URI`, using a fresh database per call.
#[allow(dead_code)]
pub async fn test_db() -> MongoDb {
    let uri = std::env::var("MONGODB_URI").expect("MONGODB_URI not set");
    let database = format!("vidshare_test_{}", ObjectId::new().to_hex());
    let db = MongoDb::connect(&uri, &database)
        .await
        .expect("Failed to connect to MongoDB");
    db.ensure_indexes().await.expect("Failed to create indexes");
    db
}

/// Router plus handles on the in-memory collaborators.
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub media: Arc<InMemoryMedia>,
}

/// Create a test app with in-memory store and media host.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let media = Arc::new(InMemoryMedia::new());
    let state = Arc::new(AppState::new(config, store.clone(), media.clone()).unwrap());

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        media,
    }
}

/// Encode a multipart/form-data body. Files are `(field, file name)` with PNG-ish bytes.
#[allow(dead_code)]
pub fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, file_name) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(&[0x89, b'P', b'N', b'G', 0x0d, 0x0a]);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

#[allow(dead_code)]
pub fn multipart_request(
    method: Method,
    uri: &str,
    body: Vec<u8>,
    cookie: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

#[allow(dead_code)]
pub fn json_request(method: Method, uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[allow(dead_code)]
pub fn empty_request(method: Method, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// Run one request and return status, headers and JSON body.
#[allow(dead_code)]
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response: Response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

#[allow(dead_code)]
pub fn set_cookie_headers(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

/// Value of a Set-Cookie header (`name=value; ...` -> `value`).
#[allow(dead_code)]
pub fn cookie_value(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.split_once('='))
        .map(|(_, v)| v.to_string())
        .unwrap_or_default()
}

/// Register `name` with email `{name}@example.com` and password `pw-{name}`.
#[allow(dead_code)]
pub async fn register_user(app: &Router, name: &str) -> Value {
    let email = format!("{name}@example.com");
    let password = format!("pw-{name}");
    let body = multipart_body(
        &[
            ("fullName", name),
            ("email", email.as_str()),
            ("userName", name),
            ("password", password.as_str()),
        ],
        &[("avatar", "avatar.png")],
    );

    let (status, _, json) = send(
        app,
        multipart_request(Method::POST, "/api/v1/users/register", body, None),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {json}");
    json["data"].clone()
}

/// Tokens returned by a successful login.
#[allow(dead_code)]
pub struct Session {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
}

#[allow(dead_code)]
impl Session {
    pub fn access_cookie(&self) -> String {
        format!("accessToken={}", self.access_token)
    }

    pub fn refresh_cookie(&self) -> String {
        format!("refreshToken={}", self.refresh_token)
    }
}

#[allow(dead_code)]
pub async fn login_user(app: &Router, name: &str) -> Session {
    let (status, _, json) = send(
        app,
        json_request(
            Method::POST,
            "/api/v1/users/login",
            serde_json::json!({ "userName": name, "password": format!("pw-{name}") }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {json}");

    Session {
        user_id: json["data"]["user"]["_id"].as_str().unwrap().to_string(),
        access_token: json["data"]["accessToken"].as_str().unwrap().to_string(),
        refresh_token: json["data"]["refreshToken"].as_str().unwrap().to_string(),
    }
}
