//! Shared helpers for HTTP-level tests.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response},
    Router,
};
use chrono::{DateTime, Utc};
use license_panel::config::Config;
use license_panel::{build_router, AppState};
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "correct-horse";

/// Router over a fresh in-memory database, plus the state for direct service access.
pub async fn test_app() -> (Router, AppState) {
    let (app, state, _) = test_app_with_pool().await;
    (app, state)
}

/// Same as `test_app`, also handing back the pool for direct row edits.
pub async fn test_app_with_pool() -> (Router, AppState, SqlitePool) {
    let pool = license_db::connect_in_memory().await.unwrap();
    let config = Config::from_lookup(|name| match name {
        "ADMIN_USERNAME" => Some(ADMIN_USERNAME.to_string()),
        "ADMIN_PASSWORD" => Some(ADMIN_PASSWORD.to_string()),
        "SECRET_KEY" => Some("integration-test-secret".to_string()),
        _ => None,
    })
    .unwrap();

    let state = AppState::new(config, pool.clone());
    (build_router(state.clone()), state, pool)
}

pub async fn set_expiry(pool: &SqlitePool, id: i64, expires_at: DateTime<Utc>) {
    sqlx::query("UPDATE licenses SET expires_at = ? WHERE id = ?")
        .bind(expires_at)
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn get_with_cookie(app: &Router, uri: &str, cookie: &str) -> Response<Body> {
    let request = Request::get(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub fn form_request(uri: &str, form: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(form.to_string())).unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn location(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string())
}

/// `name=value` pair of the first Set-Cookie header.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    let raw = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    raw.split(';').next().map(|pair| pair.trim().to_string())
}

/// Log in with the test credentials and return the cookie to replay.
pub async fn login(app: &Router) -> String {
    let form = format!("username={}&password={}", ADMIN_USERNAME, ADMIN_PASSWORD);
    let response = send(app, form_request("/login", &form, None)).await;
    assert_eq!(location(&response).as_deref(), Some("/dashboard"));
    session_cookie(&response).expect("login sets a session cookie")
}
