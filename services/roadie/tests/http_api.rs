//! End-to-end tests for the REST surface, driven through the router
//! without a live listener.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use roadie::routes;
use roadie::state::AppState;
use roadie_core::Result;
use roadie_core::inference::{ResponseGenerator, Transcriber};
use roadie_core::pipeline::PipelineDeadlines;
use roadie_types::Interaction;
use serde_json::{Value, json};
use tower::ServiceExt;

struct StubTranscriber;

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(&self, _audio: &[u8]) -> Result<String> {
        Ok("stub transcript".to_string())
    }
}

struct StubGenerator;

#[async_trait]
impl ResponseGenerator for StubGenerator {
    async fn respond(&self, _interaction: &Interaction) -> Result<String> {
        Ok("stub reply".to_string())
    }
}

fn test_app() -> (tempfile::TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(
        dir.path().to_path_buf(),
        Arc::new(StubTranscriber),
        Arc::new(StubGenerator),
        PipelineDeadlines::default(),
    );
    (dir, routes::router(state))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn login_request(username: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "username": username }).to_string()))
        .unwrap()
}

fn create_request(cookie: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/v1/interactions")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

fn list_request(cookie: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri("/api/v1/interactions")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn login_sets_the_identity_cookie() {
    let (_dir, app) = test_app();

    let response = app.oneshot(login_request("sam")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("username=sam;"));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));

    let body = body_json(response).await;
    assert_eq!(body, json!({ "success": true }));
}

#[tokio::test]
async fn login_rejects_a_blank_username() {
    let (_dir, app) = test_app();

    let response = app.oneshot(login_request("   ")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("blank"));
}

#[tokio::test]
async fn requests_without_the_cookie_are_rejected() {
    let (_dir, app) = test_app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/interactions")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body, json!({ "error": "User is not logged in" }));
}

#[tokio::test]
async fn websocket_route_requires_the_cookie_too() {
    let (_dir, app) = test_app();

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1/interactions/some-id/ws")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_then_list_round_trip() {
    let (_dir, app) = test_app();
    let cookie = "username=sam";

    let created = app.clone().oneshot(create_request(cookie)).await.unwrap();
    assert_eq!(created.status(), StatusCode::OK);
    let created = body_json(created).await;
    assert_eq!(created["success"], true);
    let interaction_id = created["interactionId"].as_str().unwrap().to_string();

    let listed = app.oneshot(list_request(cookie)).await.unwrap();
    assert_eq!(listed.status(), StatusCode::OK);
    let listed = body_json(listed).await;
    let entries = listed.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["interactionId"], interaction_id.as_str());
    assert_eq!(entries[0]["status"], "created");
}

#[tokio::test]
async fn interactions_are_scoped_per_identity() {
    let (_dir, app) = test_app();

    let created = app
        .clone()
        .oneshot(create_request("username=sam"))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::OK);

    let listed = app.oneshot(list_request("username=alex")).await.unwrap();
    assert_eq!(listed.status(), StatusCode::OK);
    let listed = body_json(listed).await;
    assert_eq!(listed, json!([]));
}
