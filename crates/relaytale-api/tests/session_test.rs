//! Integration tests for the game session lifecycle.

mod common;

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use chrono::TimeDelta;
use relaytale_test_support::ManualClock;
use serde_json::{Value, json};
use sqlx::PgPool;

async fn create(app: &Router, mode: &str, time_limit: u32) -> (String, String) {
    let (status, json) = common::post_json(
        app.clone(),
        "/api/v1/sessions",
        &json!({
            "game_name": "Fables",
            "creator_name": "Ada",
            "creator_user_id": "u1",
            "user_limit": 6,
            "time_limit_minutes": time_limit,
            "progress_mode": mode,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (
        json["session_id"].as_str().unwrap().to_owned(),
        json["entry_word"].as_str().unwrap().to_owned(),
    )
}

async fn join(app: &Router, entry_word: &str, user_id: &str) -> (StatusCode, Value) {
    common::post_json(
        app.clone(),
        "/api/v1/sessions/join",
        &json!({
            "entry_word": entry_word,
            "player_name": format!("Player {user_id}"),
            "user_id": user_id,
        }),
    )
    .await
}

async fn act(app: &Router, session_id: &str, action: &str, body: Value) -> (StatusCode, Value) {
    common::post_json(
        app.clone(),
        &format!("/api/v1/sessions/{session_id}/{action}"),
        &body,
    )
    .await
}

async fn status(app: &Router, session_id: &str, user_id: &str) -> (StatusCode, Value) {
    common::get_json(
        app.clone(),
        &format!("/api/v1/sessions/{session_id}/status?user_id={user_id}"),
    )
    .await
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_two_player_game_plays_to_the_end(pool: PgPool) {
    let app = common::build_test_app(pool);

    // Lobby
    let (session_id, entry_word) = create(&app, "all_ready", 3).await;
    let (status_code, joined) = join(&app, &entry_word, "u2").await;
    assert_eq!(status_code, StatusCode::OK);
    assert_eq!(joined["join_order"], 2);

    let (status_code, started) = act(&app, &session_id, "start", json!({ "user_id": "u1" })).await;
    assert_eq!(status_code, StatusCode::OK);
    assert_eq!(started["player_count"], 2);

    // Round 1: everyone titles their own story.
    let (_, first) = act(
        &app,
        &session_id,
        "submit",
        json!({ "user_id": "u1", "content": "The Lighthouse" }),
    )
    .await;
    let (_, second) = act(
        &app,
        &session_id,
        "submit",
        json!({ "user_id": "u2", "content": "Salt and Iron" }),
    )
    .await;
    assert_eq!(first["story_index"], 0);
    assert_eq!(second["story_index"], 1);

    act(&app, &session_id, "ready", json!({ "user_id": "u1", "round": 1 })).await;
    let (_, advanced) = act(&app, &session_id, "ready", json!({ "user_id": "u2", "round": 1 })).await;
    assert_eq!(advanced["advanced_to_next_round"], true);
    assert_eq!(advanced["game_ended"], false);

    // Round 2: stories swap hands.
    let (status_code, view) = status(&app, &session_id, "u1").await;
    assert_eq!(status_code, StatusCode::OK);
    assert_eq!(view["current_round"], 2);
    assert_eq!(view["total_rounds"], 2);
    assert_eq!(view["my_story_index"], 1);
    assert_eq!(view["previous_text"], "Salt and Iron");
    assert_eq!(view["ready_players"], json!([]));

    act(
        &app,
        &session_id,
        "submit",
        json!({ "user_id": "u1", "content": "The keeper counted ships." }),
    )
    .await;
    act(&app, &session_id, "ready", json!({ "user_id": "u1" })).await;
    let (_, ended) = act(&app, &session_id, "ready", json!({ "user_id": "u2" })).await;
    assert_eq!(ended["advanced_to_next_round"], false);
    assert_eq!(ended["game_ended"], true);

    // Ended
    let (_, view) = status(&app, &session_id, "u2").await;
    assert_eq!(view["session"]["phase"], "ended");
    assert_eq!(view["current_round"], 2);
    assert_eq!(view["total_rounds"], 2);
    assert_eq!(view["my_story_index"], Value::Null);
    assert_eq!(view["entry_word"], Value::Null);

    let (status_code, json) = join(&app, &entry_word, "u3").await;
    assert_eq!(status_code, StatusCode::CONFLICT);
    assert_eq!(json["error"], "session_not_joinable");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_resubmitting_replaces_the_line(pool: PgPool) {
    // Arrange
    let app = common::build_test_app(pool.clone());
    let (session_id, entry_word) = create(&app, "all_ready", 3).await;
    join(&app, &entry_word, "u2").await;
    act(&app, &session_id, "start", json!({ "user_id": "u1" })).await;

    // Act
    act(
        &app,
        &session_id,
        "submit",
        json!({ "user_id": "u1", "content": "Draft" }),
    )
    .await;
    let (status_code, second) = act(
        &app,
        &session_id,
        "submit",
        json!({ "user_id": "u1", "content": "Final" }),
    )
    .await;

    // Assert
    assert_eq!(status_code, StatusCode::OK);
    assert_eq!(second["replaced"], true);
    let rows: Vec<String> = sqlx::query_scalar("SELECT content FROM story_texts")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(rows, vec!["Final".to_owned()]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_time_limit_advances_a_single_round_per_evaluation(pool: PgPool) {
    // Arrange
    common::set_setting(&pool, "DISCONNECT_TIMEOUT_SEC", "3600").await;
    let clock = Arc::new(ManualClock::new(common::t0()));
    let app = common::build_test_app_with_clock(pool, Arc::clone(&clock));
    let (session_id, entry_word) = create(&app, "time_limit", 1).await;
    join(&app, &entry_word, "u2").await;
    join(&app, &entry_word, "u3").await;
    act(&app, &session_id, "start", json!({ "user_id": "u1" })).await;

    // Act
    clock.advance(TimeDelta::minutes(5));
    let (status_code, view) = status(&app, &session_id, "u1").await;

    // Assert
    assert_eq!(status_code, StatusCode::OK);
    assert_eq!(view["session"]["phase"], "in_progress");
    assert_eq!(view["current_round"], 2);
    assert_eq!(view["round_deadline"], "2026-01-15T10:02:00Z");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_late_joiner_takes_over_a_disconnected_seat(pool: PgPool) {
    // Arrange
    let clock = Arc::new(ManualClock::new(common::t0()));
    let app = common::build_test_app_with_clock(pool, Arc::clone(&clock));
    let (session_id, entry_word) = create(&app, "all_ready", 3).await;
    join(&app, &entry_word, "u2").await;
    join(&app, &entry_word, "u3").await;
    act(&app, &session_id, "start", json!({ "user_id": "u1" })).await;
    act(
        &app,
        &session_id,
        "submit",
        json!({ "user_id": "u2", "content": "Written before leaving" }),
    )
    .await;

    clock.advance(TimeDelta::seconds(31));
    for user_id in ["u1", "u3"] {
        let (status_code, _) = act(&app, &session_id, "heartbeat", json!({ "user_id": user_id })).await;
        assert_eq!(status_code, StatusCode::NO_CONTENT);
    }

    // Act
    let (status_code, joined) = join(&app, &entry_word, "u4").await;

    // Assert
    assert_eq!(status_code, StatusCode::OK);
    assert_eq!(joined["join_order"], 2);
    assert_eq!(joined["is_rejoining"], false);

    let (_, view) = status(&app, &session_id, "u4").await;
    assert_eq!(view["my_join_order"], 2);
    assert_eq!(view["my_story_index"], 1);
    assert_eq!(view["total_rounds"], 3);

    let (status_code, json) = act(
        &app,
        &session_id,
        "submit",
        json!({ "user_id": "u4", "content": "Someone else's title" }),
    )
    .await;
    assert_eq!(status_code, StatusCode::CONFLICT);
    assert_eq!(json["error"], "line_already_authored");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_full_lobby_rejects_joiners(pool: PgPool) {
    // Arrange
    let app = common::build_test_app(pool);
    let (status_code, json) = common::post_json(
        app.clone(),
        "/api/v1/sessions",
        &json!({
            "game_name": "Pairs",
            "creator_name": "Ada",
            "creator_user_id": "u1",
            "user_limit": 2,
            "progress_mode": "all_ready",
        }),
    )
    .await;
    assert_eq!(status_code, StatusCode::CREATED);
    let entry_word = json["entry_word"].as_str().unwrap().to_owned();
    join(&app, &entry_word, "u2").await;

    // Act
    let (status_code, json) = join(&app, &entry_word, "u3").await;

    // Assert
    assert_eq!(status_code, StatusCode::CONFLICT);
    assert_eq!(json["error"], "session_full");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_created_sessions_receive_distinct_entry_words(pool: PgPool) {
    let app = common::build_test_app(pool);

    let (_, first) = create(&app, "all_ready", 2).await;
    let (_, second) = create(&app, "all_ready", 2).await;

    assert_ne!(first, second);
}
