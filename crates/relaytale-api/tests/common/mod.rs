//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::BodyExt;
use relaytale_core::rng::{DeterministicRng, SystemRng};
use relaytale_store::pg_game_repository::PgGameRepository;
use relaytale_store::pg_settings::PgSettingsProvider;
use relaytale_test_support::ManualClock;
use sqlx::PgPool;
use tower::ServiceExt;

use relaytale_api::app;
use relaytale_api::state::AppState;

/// Start time used across all integration tests.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

/// Build the full app with the Postgres repository and settings, a seeded
/// RNG and a manual clock starting at [`t0`]. Uses the same router as
/// `main.rs`.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_clock(pool, Arc::new(ManualClock::new(t0())))
}

/// Like [`build_test_app`] with a clock the test can move forward.
pub fn build_test_app_with_clock(pool: PgPool, clock: Arc<ManualClock>) -> Router {
    let rng: Arc<Mutex<dyn DeterministicRng + Send>> =
        Arc::new(Mutex::new(SystemRng::seeded(2026)));
    let app_state = AppState::new(
        clock,
        rng,
        Arc::new(PgGameRepository::new(pool.clone())),
        Arc::new(PgSettingsProvider::new(pool)),
        Duration::from_millis(10),
    );

    app(app_state)
}

/// Overwrite a tunable in the settings table.
pub async fn set_setting(pool: &PgPool, key: &str, value: &str) {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES ($1, $2) \
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await
    .unwrap();
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
