//! HTTP surface driven through the router with `oneshot`.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use common::{TestApp, ACCESS_TTL_MINUTES};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_me(token: &str) -> Request<Body> {
    Request::builder()
        .uri("/auth/me")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

async fn register_alice(app: &TestApp) -> Value {
    let (status, body) = send(
        app.router(),
        post_json(
            "/auth/register",
            json!({ "name": "Alice", "email": "alice@x.com", "password": "pw123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

#[tokio::test]
async fn test_health_check_returns_ok() {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(app.router(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_register_returns_profile_and_tokens() {
    let app = TestApp::new();
    let body = register_alice(&app).await;

    assert_eq!(body["name"], "Alice");
    assert_eq!(body["email"], "alice@x.com");
    assert!(body["id"].is_string());
    assert!(body["created_at"].is_string());
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], ACCESS_TTL_MINUTES * 60);
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_validates_input() {
    let app = TestApp::new();

    let (status, body) = send(
        app.router(),
        post_json(
            "/auth/register",
            json!({ "name": "Alice", "email": "not-an-email", "password": "pw123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Validation error");

    let (status, _) = send(
        app.router(),
        post_json(
            "/auth/register",
            json!({ "name": "", "email": "alice@x.com", "password": "pw123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_register_rejects_malformed_json() {
    let app = TestApp::new();
    let request = Request::builder()
        .method("POST")
        .uri("/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, _) = send(app.router(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_register_is_conflict() {
    let app = TestApp::new();
    register_alice(&app).await;

    let (status, body) = send(
        app.router(),
        post_json(
            "/auth/register",
            json!({ "name": "Other", "email": "alice@x.com", "password": "other" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "User already exists");
}

#[tokio::test]
async fn test_login_success_and_failure() {
    let app = TestApp::new();
    let registered = register_alice(&app).await;

    let (status, body) = send(
        app.router(),
        post_json(
            "/auth/login",
            json!({ "email": "alice@x.com", "password": "pw123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], registered["id"]);
    assert_eq!(body["token_type"], "Bearer");

    let (status, body) = send(
        app.router(),
        post_json(
            "/auth/login",
            json!({ "email": "alice@x.com", "password": "wrong" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, body) = send(
        app.router(),
        post_json(
            "/auth/login",
            json!({ "email": "nobody@x.com", "password": "pw123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn test_refresh_returns_only_tokens_and_rotates() {
    let app = TestApp::new();
    let registered = register_alice(&app).await;
    let old = registered["refresh_token"].as_str().unwrap().to_string();

    let (status, body) = send(
        app.router(),
        post_json("/auth/refresh", json!({ "refresh_token": old })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    assert!(body.get("id").is_none());
    assert!(body.get("email").is_none());

    let (status, body) = send(
        app.router(),
        post_json("/auth/refresh", json!({ "refresh_token": old })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn test_refresh_with_empty_token_is_unauthorized() {
    let app = TestApp::new();

    let (status, _) = send(
        app.router(),
        post_json("/auth/refresh", json!({ "refresh_token": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_returns_profile_for_bearer() {
    let app = TestApp::new();
    let registered = register_alice(&app).await;
    let token = registered["access_token"].as_str().unwrap();

    let (status, body) = send(app.router(), get_me(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], registered["id"]);
    assert_eq!(body["name"], "Alice");
    assert_eq!(body["email"], "alice@x.com");
    assert!(body.get("access_token").is_none());
}

#[tokio::test]
async fn test_me_requires_valid_bearer() {
    let app = TestApp::new();

    let missing = Request::builder()
        .uri("/auth/me")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app.router(), missing).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(app.router(), get_me("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn test_internal_failures_are_generic() {
    let store = std::sync::Arc::new(auth_api::services::MemoryStore::new());
    let writer = std::sync::Arc::new(common::FailingTokenWriter::new(store.clone()));
    let app = TestApp::with_writer(writer, store);

    let (status, body) = send(
        app.router(),
        post_json(
            "/auth/register",
            json!({ "name": "Alice", "email": "alice@x.com", "password": "pw123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
    assert!(!body.to_string().contains("disk full"));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();

    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-123");
}
