//! Integration tests for the CreepyGallery API
//!
//! These tests drive the full router against the in-memory SQL backend,
//! with image hosts replaced by in-process fakes.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

use creepy_gallery::{
    config::ImageHostKind,
    constants::{DEFAULT_MAX_UPLOAD_BYTES, MEMORY_GALLERY_CAP, UPLOADS_BACKUP_CAP},
    db::DocumentStore,
    models::ImageUpload,
    router,
    security::verify_token,
    storage::{HostedImage, ImageHost, UploadsBackup},
    AppError, AppState, Config, Database, StorageChain,
};

// Test configuration constants
const TEST_JWT_SECRET: &str = "test-jwt-secret";
const TEST_ADMIN_SECRET: &str = "test-admin-secret";
const TEST_PASSWORD: &str = "Spooky123";
const BOUNDARY: &str = "creepy-gallery-test-boundary";

// =============================================================================
// Fake Image Hosts
// =============================================================================

/// Host that refuses every request
struct DownHost;

#[async_trait]
impl ImageHost for DownHost {
    fn name(&self) -> &'static str {
        "down"
    }

    async fn upload(&self, _id: &str, _upload: &ImageUpload) -> creepy_gallery::Result<HostedImage> {
        Err(AppError::ImageHost("503 Service Unavailable".to_string()))
    }

    async fn list(&self) -> creepy_gallery::Result<Vec<HostedImage>> {
        Err(AppError::ImageHost("503 Service Unavailable".to_string()))
    }
}

/// Host that accepts uploads and lists a fixed set of images
struct WorkingHost(Vec<HostedImage>);

#[async_trait]
impl ImageHost for WorkingHost {
    fn name(&self) -> &'static str {
        "working"
    }

    async fn upload(&self, id: &str, _upload: &ImageUpload) -> creepy_gallery::Result<HostedImage> {
        Ok(HostedImage {
            id: id.to_string(),
            url: format!("https://cdn.test/creepy-gallery/{}.png", id),
            name: id.to_string(),
            created_at: None,
        })
    }

    async fn list(&self) -> creepy_gallery::Result<Vec<HostedImage>> {
        Ok(self.0.clone())
    }
}

/// Host that lists back whatever it was sent
#[derive(Default)]
struct RecordingHost(Mutex<Vec<HostedImage>>);

#[async_trait]
impl ImageHost for RecordingHost {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn upload(&self, id: &str, _upload: &ImageUpload) -> creepy_gallery::Result<HostedImage> {
        let hosted = HostedImage {
            id: format!("creepy-gallery/{}", id),
            url: format!("https://cdn.test/creepy-gallery/{}.png", id),
            name: id.to_string(),
            created_at: None,
        };
        self.0.lock().unwrap().push(hosted.clone());
        Ok(hosted)
    }

    async fn list(&self) -> creepy_gallery::Result<Vec<HostedImage>> {
        Ok(self.0.lock().unwrap().clone())
    }
}

// =============================================================================
// Test Helpers
// =============================================================================

/// Create a test configuration
fn test_config() -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        environment: "test".to_string(),
        allowed_origins: vec!["http://localhost:3000".to_string()],
        database_url: None,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        token_ttl_hours: 1,
        admin_secret_key: Some(TEST_ADMIN_SECRET.to_string()),
        document_store_path: None,
        uploads_backup_dir: String::new(),
        max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        cdn_timeout_secs: 5,
        primary_image_host: ImageHostKind::Cloudinary,
        cloudinary: None,
        imagekit: None,
        log_requests: false,
    }
}

/// State with the relational shim, memory tier and a failing primary host
fn test_state(config: Config) -> AppState {
    let chain = StorageChain::new(Database::in_memory(), MEMORY_GALLERY_CAP, reqwest::Client::new())
        .with_image_hosts(Some(Arc::new(DownHost)), None);
    AppState::new(config, chain)
}

fn create_test_app(state: AppState) -> Router {
    router(state)
}

/// Parse response body as JSON
async fn body_to_json(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_to_bytes(body: Body) -> Vec<u8> {
    body.collect().await.unwrap().to_bytes().to_vec()
}

/// Create a POST request with JSON body
fn make_post_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Create a GET request
fn make_get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn make_delete_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Build a multipart/form-data body from text fields and an optional file
fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    if let Some((file_name, content_type, bytes)) = file {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn make_upload_request(token: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/gallery")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).unwrap()
}

/// A tiny payload that claims to be a PNG
fn fake_png(len: usize) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    bytes.extend((0..len.saturating_sub(8)).map(|i| (i % 251) as u8));
    bytes
}

/// Sign up and log in, returning the session token
async fn signup_and_login(app: &Router, email: &str, username: &str) -> String {
    let response = app
        .clone()
        .oneshot(make_post_request(
            "/api/auth/signup",
            json!({ "email": email, "username": username, "password": TEST_PASSWORD }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(make_post_request(
            "/api/auth/login",
            json!({ "email": email, "password": TEST_PASSWORD }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_to_json(response.into_body()).await;
    body["token"].as_str().unwrap().to_string()
}

/// Upload a small PNG and return the created item
async fn upload_small_image(app: &Router, token: &str, title: &str) -> Value {
    let png = fake_png(64);
    let body = multipart_body(
        &[("title", title), ("tags", "fog, pier"), ("chillLevel", "4")],
        Some(("pier.png", "image/png", &png)),
    );
    let response = app
        .clone()
        .oneshot(make_upload_request(Some(token), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_to_json(response.into_body()).await
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check_returns_healthy() {
    let app = create_test_app(test_state(test_config()));

    let response = app.oneshot(make_get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["backend"], "memory-sql");
    assert!(body["version"].as_str().is_some());
}

// =============================================================================
// Signup Tests
// =============================================================================

#[tokio::test]
async fn test_signup_success() {
    let app = create_test_app(test_state(test_config()));

    let response = app
        .oneshot(make_post_request(
            "/api/auth/signup",
            json!({ "email": "Ghost@Haunted.House", "username": "ghost", "password": TEST_PASSWORD }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["message"], "User created successfully");
    assert_eq!(body["user"]["email"], "ghost@haunted.house");
    assert_eq!(body["user"]["username"], "ghost");
    assert!(body["user"]["id"].as_str().is_some());
    assert!(body["user"].get("password").is_none());
}

#[tokio::test]
async fn test_signup_weak_password_lists_every_rule() {
    let app = create_test_app(test_state(test_config()));

    let response = app
        .oneshot(make_post_request(
            "/api/auth/signup",
            json!({ "email": "ghost@haunted.house", "username": "ghost", "password": "boo" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_to_json(response.into_body()).await;
    let details: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(
        details,
        vec![
            "Password must be at least 8 characters long",
            "Password must contain at least one uppercase letter",
            "Password must contain at least one number",
        ]
    );
}

#[tokio::test]
async fn test_signup_invalid_email_and_username() {
    let app = create_test_app(test_state(test_config()));

    let response = app
        .oneshot(make_post_request(
            "/api/auth/signup",
            json!({ "email": "not-an-email", "username": "gh", "password": TEST_PASSWORD }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["details"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_signup_missing_fields() {
    let app = create_test_app(test_state(test_config()));

    let response = app
        .oneshot(make_post_request(
            "/api/auth/signup",
            json!({ "email": "ghost@haunted.house" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_signup_duplicate_email_returns_conflict() {
    let state = test_state(test_config());
    let app = create_test_app(state.clone());

    let response = app
        .clone()
        .oneshot(make_post_request(
            "/api/auth/signup",
            json!({ "email": "ghost@haunted.house", "username": "ghost", "password": TEST_PASSWORD }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Same address, different case
    let response = app
        .oneshot(make_post_request(
            "/api/auth/signup",
            json!({ "email": "GHOST@haunted.house", "username": "other", "password": TEST_PASSWORD }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_to_json(response.into_body()).await;
    assert!(body["error"].as_str().unwrap().contains("already exists"));
    assert_eq!(state.db.count_users().await.unwrap(), 1);
}

// =============================================================================
// Login Tests
// =============================================================================

#[tokio::test]
async fn test_login_token_carries_identity() {
    let app = create_test_app(test_state(test_config()));

    let token = signup_and_login(&app, "ghost@haunted.house", "ghost").await;

    let claims = verify_token(TEST_JWT_SECRET, &token).unwrap();
    assert_eq!(claims.email, "ghost@haunted.house");
    assert_eq!(claims.username, "ghost");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["id"], claims.sub);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = create_test_app(test_state(test_config()));
    signup_and_login(&app, "ghost@haunted.house", "ghost").await;

    let wrong_password = app
        .clone()
        .oneshot(make_post_request(
            "/api/auth/login",
            json!({ "email": "ghost@haunted.house", "password": "Wrong1234" }),
        ))
        .await
        .unwrap();
    let unknown_email = app
        .oneshot(make_post_request(
            "/api/auth/login",
            json!({ "email": "nobody@haunted.house", "password": TEST_PASSWORD }),
        ))
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);

    let first = body_to_json(wrong_password.into_body()).await;
    let second = body_to_json(unknown_email.into_body()).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_login_missing_fields() {
    let app = create_test_app(test_state(test_config()));

    let response = app
        .oneshot(make_post_request(
            "/api/auth/login",
            json!({ "email": "ghost@haunted.house" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_me_rejects_tampered_token() {
    let app = create_test_app(test_state(test_config()));
    let token = signup_and_login(&app, "ghost@haunted.house", "ghost").await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::AUTHORIZATION, format!("Bearer {}x", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Upload Tests
// =============================================================================

#[tokio::test]
async fn test_upload_requires_token() {
    let app = create_test_app(test_state(test_config()));

    let png = fake_png(64);
    let body = multipart_body(&[("title", "Fog")], Some(("fog.png", "image/png", &png)));
    let response = app.oneshot(make_upload_request(None, body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upload_with_host_down_inlines_small_image() {
    let state = test_state(test_config());
    let app = create_test_app(state.clone());
    let token = signup_and_login(&app, "ghost@haunted.house", "ghost").await;

    let item = upload_small_image(&app, &token, "Foggy pier").await;

    let image_url = item["imageUrl"].as_str().unwrap();
    assert!(image_url.starts_with("data:image/png;base64,"));
    assert_eq!(item["author"], "ghost");
    assert_eq!(item["chillLevel"], 4);
    assert_eq!(item["downloads"], 0);
    assert_eq!(item["tags"], json!(["fog", "pier"]));

    // Relational and memory tiers hold the same id
    let id = item["id"].as_str().unwrap();
    assert!(state.db.get_gallery_item(id).await.unwrap().is_some());
    assert!(state.storage.memory().get(id).await.is_some());
}

#[tokio::test]
async fn test_upload_with_host_down_rejects_large_image() {
    let state = test_state(test_config());
    let app = create_test_app(state.clone());
    let token = signup_and_login(&app, "ghost@haunted.house", "ghost").await;

    let png = fake_png(3 * 1024 * 1024);
    let body = multipart_body(&[("title", "Huge")], Some(("huge.png", "image/png", &png)));
    let response = app
        .oneshot(make_upload_request(Some(&token), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(state.storage.memory().len().await, 0);
}

#[tokio::test]
async fn test_upload_uses_working_host_url() {
    let chain = StorageChain::new(Database::in_memory(), MEMORY_GALLERY_CAP, reqwest::Client::new())
        .with_image_hosts(Some(Arc::new(WorkingHost(Vec::new()))), None);
    let app = create_test_app(AppState::new(test_config(), chain));
    let token = signup_and_login(&app, "ghost@haunted.house", "ghost").await;

    let item = upload_small_image(&app, &token, "Foggy pier").await;

    let id = item["id"].as_str().unwrap();
    assert_eq!(
        item["imageUrl"],
        format!("https://cdn.test/creepy-gallery/{}.png", id)
    );
}

#[tokio::test]
async fn test_upload_over_body_limit_returns_payload_too_large() {
    let mut config = test_config();
    config.max_upload_bytes = 1024;
    let state = test_state(config);
    let app = create_test_app(state.clone());
    let token = signup_and_login(&app, "ghost@haunted.house", "ghost").await;

    let png = fake_png(4096);
    let body = multipart_body(&[("title", "Big")], Some(("big.png", "image/png", &png)));
    let response = app
        .oneshot(make_upload_request(Some(&token), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["error"], "Upload size exceeds maximum allowed");
    assert_eq!(state.storage.memory().len().await, 0);
}

#[tokio::test]
async fn test_upload_invalid_chill_level() {
    let app = create_test_app(test_state(test_config()));
    let token = signup_and_login(&app, "ghost@haunted.house", "ghost").await;

    let png = fake_png(64);
    let body = multipart_body(
        &[("title", "Fog"), ("chillLevel", "9")],
        Some(("fog.png", "image/png", &png)),
    );
    let response = app
        .oneshot(make_upload_request(Some(&token), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_rejects_non_image() {
    let app = create_test_app(test_state(test_config()));
    let token = signup_and_login(&app, "ghost@haunted.house", "ghost").await;

    let body = multipart_body(
        &[("title", "Notes")],
        Some(("notes.txt", "text/plain", b"boo")),
    );
    let response = app
        .oneshot(make_upload_request(Some(&token), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_to_json(response.into_body()).await;
    assert!(body["details"]
        .as_array()
        .unwrap()
        .iter()
        .any(|d| d == "Only image files are allowed"));
}

// =============================================================================
// Gallery Listing Tests
// =============================================================================

#[tokio::test]
async fn test_gallery_merges_tiers_without_duplicates() {
    let app = create_test_app(test_state(test_config()));
    let token = signup_and_login(&app, "ghost@haunted.house", "ghost").await;

    upload_small_image(&app, &token, "Foggy pier").await;
    upload_small_image(&app, &token, "Empty hallway").await;

    let response = app.oneshot(make_get_request("/api/gallery")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_to_json(response.into_body()).await;
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|item| item["title"].as_str())
        .collect();
    // Newest first, one entry per (title, author) even though two tiers hold each
    assert_eq!(titles, vec!["Empty hallway", "Foggy pier"]);
}

#[tokio::test]
async fn test_gallery_includes_host_only_images_as_placeholders() {
    let hosted = HostedImage {
        id: "creepy-gallery/old-one".to_string(),
        url: "https://cdn.test/creepy-gallery/old-one.jpg".to_string(),
        name: "old-one".to_string(),
        created_at: None,
    };
    let chain = StorageChain::new(Database::in_memory(), MEMORY_GALLERY_CAP, reqwest::Client::new())
        .with_image_hosts(None, Some(Arc::new(WorkingHost(vec![hosted]))));
    let app = create_test_app(AppState::new(test_config(), chain));

    let response = app.oneshot(make_get_request("/api/gallery")).await.unwrap();
    let body = body_to_json(response.into_body()).await;

    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["author"], "Unknown");
    assert_eq!(items[0]["tags"], json!(["recovered"]));
    assert_eq!(items[0]["chillLevel"], 3);
    assert_eq!(items[0]["userId"], "unknown");
}

#[tokio::test]
async fn test_gallery_lists_hosted_copy_alongside_metadata() {
    let chain = StorageChain::new(Database::in_memory(), MEMORY_GALLERY_CAP, reqwest::Client::new())
        .with_image_hosts(Some(Arc::new(RecordingHost::default())), None);
    let app = create_test_app(AppState::new(test_config(), chain));
    let token = signup_and_login(&app, "ghost@haunted.house", "ghost").await;

    let item = upload_small_image(&app, &token, "Foggy pier").await;
    let id = item["id"].as_str().unwrap();

    let response = app.oneshot(make_get_request("/api/gallery")).await.unwrap();
    let body = body_to_json(response.into_body()).await;

    // The host listing only knows the upload id, so it does not merge with the titled entry
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["title"], "Foggy pier");
    assert_eq!(items[0]["author"], "ghost");
    assert_eq!(items[1]["title"], id);
    assert_eq!(items[1]["author"], "Unknown");
    assert_eq!(items[1]["imageUrl"], items[0]["imageUrl"]);
}

#[tokio::test]
async fn test_gallery_empty_when_nothing_uploaded() {
    let app = create_test_app(test_state(test_config()));

    let response = app.oneshot(make_get_request("/api/gallery")).await.unwrap();
    let body = body_to_json(response.into_body()).await;

    assert_eq!(body, json!([]));
}

// =============================================================================
// Download Tests
// =============================================================================

#[tokio::test]
async fn test_download_returns_bytes_and_counts_once() {
    let state = test_state(test_config());
    let app = create_test_app(state.clone());
    let token = signup_and_login(&app, "ghost@haunted.house", "ghost").await;

    let item = upload_small_image(&app, &token, "Foggy pier").await;
    let id = item["id"].as_str().unwrap();

    let response = app
        .oneshot(make_get_request(&format!("/api/download/{}", id)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "64");
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(disposition, "attachment; filename=\"Foggy_pier.png\"");

    let bytes = body_to_bytes(response.into_body()).await;
    assert_eq!(bytes, fake_png(64));

    // Counted in the relational tier only
    let stored = state.db.get_gallery_item(id).await.unwrap().unwrap();
    assert_eq!(stored.downloads, 1);
    assert_eq!(state.storage.memory().get(id).await.unwrap().downloads, 0);
}

#[tokio::test]
async fn test_download_unknown_id_returns_not_found() {
    let app = create_test_app(test_state(test_config()));

    let response = app
        .oneshot(make_get_request("/api/download/does-not-exist"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_from_local_backup() {
    let temp_dir = TempDir::new().unwrap();
    let chain = StorageChain::new(Database::in_memory(), MEMORY_GALLERY_CAP, reqwest::Client::new())
        .with_local_backup(UploadsBackup::new(temp_dir.path(), UPLOADS_BACKUP_CAP))
        .with_image_hosts(Some(Arc::new(DownHost)), None);
    let state = AppState::new(test_config(), chain);
    let app = create_test_app(state.clone());
    let token = signup_and_login(&app, "ghost@haunted.house", "ghost").await;

    let item = upload_small_image(&app, &token, "Foggy pier").await;
    let id = item["id"].as_str().unwrap();

    // Only the backup copy remains
    state.db.clear_gallery().await.unwrap();
    state.storage.memory().clear().await;

    let response = app
        .oneshot(make_get_request(&format!("/api/download/{}", id)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = body_to_bytes(response.into_body()).await;
    assert_eq!(bytes, fake_png(64));

    let local = state.storage.local_backup().unwrap();
    assert_eq!(local.get(id).await.unwrap().unwrap().item.downloads, 1);
}

#[tokio::test]
async fn test_download_json_named_image_from_local_backup() {
    let temp_dir = TempDir::new().unwrap();
    let chain = StorageChain::new(Database::in_memory(), MEMORY_GALLERY_CAP, reqwest::Client::new())
        .with_local_backup(UploadsBackup::new(temp_dir.path(), UPLOADS_BACKUP_CAP))
        .with_image_hosts(Some(Arc::new(DownHost)), None);
    let app = create_test_app(AppState::new(test_config(), chain));
    let token = signup_and_login(&app, "ghost@haunted.house", "ghost").await;

    let png = fake_png(64);
    let body = multipart_body(&[("title", "Cursed")], Some(("cursed.json", "image/png", &png)));
    let response = app
        .clone()
        .oneshot(make_upload_request(Some(&token), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let item = body_to_json(response.into_body()).await;
    let id = item["id"].as_str().unwrap();

    let response = app
        .oneshot(make_get_request(&format!("/api/download/{}", id)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "64");
    assert_eq!(body_to_bytes(response.into_body()).await, png);
}

// =============================================================================
// Document Store Tests
// =============================================================================

#[tokio::test]
async fn test_upload_reaches_document_store() {
    let temp_dir = TempDir::new().unwrap();
    let documents = DocumentStore::open(temp_dir.path().join("documents.redb")).unwrap();
    let chain = StorageChain::new(Database::in_memory(), MEMORY_GALLERY_CAP, reqwest::Client::new())
        .with_documents(documents);
    let state = AppState::new(test_config(), chain);
    let app = create_test_app(state.clone());
    let token = signup_and_login(&app, "ghost@haunted.house", "ghost").await;

    let item = upload_small_image(&app, &token, "Foggy pier").await;
    let id = item["id"].as_str().unwrap();

    let stored = state.storage.documents().unwrap().get(id).await.unwrap();
    assert_eq!(stored.unwrap().title, "Foggy pier");
}

// =============================================================================
// Admin Endpoint Tests
// =============================================================================

#[tokio::test]
async fn test_admin_requires_key() {
    let app = create_test_app(test_state(test_config()));

    let missing = app
        .clone()
        .oneshot(make_get_request("/api/admin/users"))
        .await
        .unwrap();
    let wrong = app
        .oneshot(make_get_request("/api/admin/users?key=wrong-key"))
        .await
        .unwrap();

    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_disabled_without_configured_key() {
    let mut config = test_config();
    config.admin_secret_key = None;
    let app = create_test_app(test_state(config));

    let response = app
        .oneshot(make_get_request("/api/admin/stats?key=any-key"))
        .await
        .unwrap();

    // Should return unauthorized because admin_secret_key is None
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_lists_and_deletes_users() {
    let app = create_test_app(test_state(test_config()));
    signup_and_login(&app, "ghost@haunted.house", "ghost").await;
    signup_and_login(&app, "wraith@haunted.house", "wraith").await;

    let uri = format!("/api/admin/users?key={}", TEST_ADMIN_SECRET);
    let response = app.clone().oneshot(make_get_request(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_to_json(response.into_body()).await;
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.get("password").is_none()));

    let response = app
        .clone()
        .oneshot(make_delete_request(&uri))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_json(response.into_body()).await["removed"], 2);

    let response = app.oneshot(make_get_request(&uri)).await.unwrap();
    assert_eq!(body_to_json(response.into_body()).await, json!([]));
}

#[tokio::test]
async fn test_admin_delete_gallery_item_reports_tiers() {
    let app = create_test_app(test_state(test_config()));
    let token = signup_and_login(&app, "ghost@haunted.house", "ghost").await;
    let item = upload_small_image(&app, &token, "Foggy pier").await;
    let id = item["id"].as_str().unwrap();

    let uri = format!("/api/admin/gallery?key={}&id={}", TEST_ADMIN_SECRET, id);
    let response = app.clone().oneshot(make_delete_request(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["removedFrom"], json!(["relational", "memory"]));

    let response = app.oneshot(make_delete_request(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_clear_memory() {
    let state = test_state(test_config());
    let app = create_test_app(state.clone());
    let token = signup_and_login(&app, "ghost@haunted.house", "ghost").await;
    upload_small_image(&app, &token, "Foggy pier").await;

    let uri = format!("/api/admin/clear-memory?key={}", TEST_ADMIN_SECRET);
    let response = app.oneshot(make_delete_request(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["tier"], "memory");
    assert_eq!(body["removed"], 1);
    assert_eq!(state.storage.memory().len().await, 0);
    // Other tiers keep their copy
    assert_eq!(state.db.count_gallery().await.unwrap(), 1);
}

#[tokio::test]
async fn test_admin_stats_success() {
    let app = create_test_app(test_state(test_config()));
    let token = signup_and_login(&app, "ghost@haunted.house", "ghost").await;
    upload_small_image(&app, &token, "Foggy pier").await;

    let uri = format!("/api/admin/stats?key={}", TEST_ADMIN_SECRET);
    let response = app.oneshot(make_get_request(&uri)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["backend"], "memory-sql");
    assert_eq!(body["userCount"], 1);
    assert_eq!(body["gallery"]["relational"], 1);
    assert_eq!(body["gallery"]["memory"], 1);
    assert!(body["gallery"]["documents"].is_null());
    assert_eq!(body["documentStoreSizeHuman"], "0 bytes");
}
