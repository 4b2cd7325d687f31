//! HTTP API tests through the full router.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use room_service::actors::Hub;
use room_service::observability::HealthState;
use room_service::routes::{build_routes, AppState};
use room_service::store::{MemoryStore, Store};
use room_test_utils::{test_config, test_settings, TEST_PASSWORD};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

struct TestApp {
    router: Router,
    hub: Arc<Hub>,
    store: Arc<MemoryStore>,
}

fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let store_dyn: Arc<dyn Store> = store.clone();
    let hub = Hub::new(store_dyn, test_settings());
    let state = Arc::new(AppState {
        hub: Arc::clone(&hub),
        config: test_config(),
    });
    let router = build_routes(state, Arc::new(HealthState::new()), None);
    TestApp { router, hub, store }
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create_room(app: &TestApp) -> String {
    let response = app
        .router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/rooms",
            json!({"name": "lobby", "password": TEST_PASSWORD}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Log in and return the session token from `Set-Cookie`.
async fn login(app: &TestApp, room_id: &str, handle: &str) -> String {
    let response = app
        .router
        .clone()
        .oneshot(json_request(
            Method::POST,
            &format!("/api/rooms/{room_id}/login"),
            json!({"handle": handle, "password": TEST_PASSWORD}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Path=/"));

    cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix("hushsess="))
        .expect("hushsess cookie")
        .to_string()
}

#[tokio::test]
async fn test_create_room_returns_id() {
    let app = test_app();
    let id = create_room(&app).await;

    assert_eq!(id.len(), test_settings().room_id_length);
    let room = app.hub.get_room(&id).await.expect("room registered");
    assert_eq!(room.name(), "lobby");
    assert!(app.store.room_exists(&id).await.unwrap());
}

#[tokio::test]
async fn test_create_room_validation() {
    let app = test_app();

    for body in [
        json!({"name": "ab", "password": TEST_PASSWORD}),
        json!({"name": "lobby", "password": "short"}),
        json!({"name": "lobby"}),
    ] {
        let response = app
            .router
            .clone()
            .oneshot(json_request(Method::POST, "/api/rooms", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "BAD_REQUEST");
    }

    assert_eq!(app.hub.room_count().await, 0);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/rooms")
        .body(Body::from("{nope"))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_issues_session_cookie() {
    let app = test_app();
    let id = create_room(&app).await;

    let token = login(&app, &id, "alice").await;

    assert_eq!(token.len(), 32);
    let session = app.store.get_session(&token, &id).await.unwrap().unwrap();
    assert_eq!(session.handle, "alice");
}

#[tokio::test]
async fn test_login_failures() {
    let app = test_app();
    let id = create_room(&app).await;

    let wrong_password = app
        .router
        .clone()
        .oneshot(json_request(
            Method::POST,
            &format!("/api/rooms/{id}/login"),
            json!({"handle": "alice", "password": "not-the-password"}),
        ))
        .await
        .unwrap();
    assert_eq!(wrong_password.status(), StatusCode::FORBIDDEN);

    let unknown_room = app
        .router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/rooms/doesnotexist/login",
            json!({"handle": "alice", "password": TEST_PASSWORD}),
        ))
        .await
        .unwrap();
    assert_eq!(unknown_room.status(), StatusCode::NOT_FOUND);

    let long_handle = app
        .router
        .clone()
        .oneshot(json_request(
            Method::POST,
            &format!("/api/rooms/{id}/login"),
            json!({"handle": "x".repeat(31), "password": TEST_PASSWORD}),
        ))
        .await
        .unwrap();
    assert_eq!(long_handle.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_removes_session() {
    let app = test_app();
    let id = create_room(&app).await;
    let token = login(&app, &id, "alice").await;

    let request = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/rooms/{id}/login"))
        .header(header::COOKIE, format!("hushsess={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cleared = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("removal cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cleared.starts_with("hushsess="));
    assert!(cleared.contains("Max-Age=0"));
    assert!(app.store.get_session(&token, &id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_ws_requires_session() {
    let app = test_app();
    let id = create_room(&app).await;

    let no_cookie = Request::builder()
        .uri(format!("/ws/{id}"))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(no_cookie).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let bogus = Request::builder()
        .uri(format!("/ws/{id}"))
        .header(header::COOKIE, "hushsess=not-a-session")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(bogus).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_ws_session_is_scoped_to_its_room() {
    let app = test_app();
    let first = create_room(&app).await;
    let second = create_room(&app).await;
    let token = login(&app, &first, "alice").await;

    let request = Request::builder()
        .uri(format!("/ws/{second}"))
        .header(header::COOKIE, format!("hushsess={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Authorized, but not an upgrade request: the upgrade rejection answers.
    let request = Request::builder()
        .uri(format!("/ws/{first}"))
        .header(header::COOKIE, format!("hushsess={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_ne!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_probes_are_routed() {
    let app = test_app();

    let health = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    let ready = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(ready.status(), StatusCode::SERVICE_UNAVAILABLE);

    let metrics = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(metrics.status(), StatusCode::NOT_FOUND);
}
