//! Watch session endpoint tests.

use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::{fixtures, setup};
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

fn code(body: &Value) -> &str {
    body["code"].as_str().unwrap_or_default()
}

async fn session_ids(server: &TestServer, token: &str) -> Vec<String> {
    let sessions: Vec<Value> = server
        .get("/api/watch-sessions")
        .add_header("Authorization", setup::bearer(token))
        .await
        .json();
    sessions
        .iter()
        .map(|s| s["watch_session_id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_create_with_client_token() {
    let ctx = setup::TestContext::new();
    let server = ctx.server();
    let token = setup::signup(&server, &fixtures::unique_username("sessions")).await;

    let session = setup::create_session(&server, &token, &fixtures::session_draft(Some("client-1"), "abc")).await;
    assert_eq!(session["watch_session_id"], "client-1");
    assert_eq!(session["video_id"], "abc");
    assert_eq!(session["path"], "/watch");
    assert_eq!(session["referer"], fixtures::REFERER);

    let fetched: Value = server
        .get("/api/watch-sessions/client-1")
        .add_header("Authorization", setup::bearer(&token))
        .await
        .json();
    assert_eq!(fetched, session);
}

#[tokio::test]
async fn test_create_generates_token() {
    let ctx = setup::TestContext::new();
    let server = ctx.server();
    let token = setup::signup(&server, &fixtures::unique_username("sessions")).await;

    let response = server
        .post("/api/watch-sessions")
        .add_header("Authorization", setup::bearer(&token))
        .json(&fixtures::session_draft(None, "abc"))
        .await;
    response.assert_status_ok();
    let session: Value = response.json();
    assert!(Uuid::parse_str(session["watch_session_id"].as_str().unwrap()).is_ok());
    assert!(session["referer"].is_null());
}

#[tokio::test]
async fn test_create_validation() {
    let ctx = setup::TestContext::new();
    let server = ctx.server();
    let token = setup::signup(&server, &fixtures::unique_username("sessions")).await;

    setup::create_session(&server, &token, &fixtures::session_draft(Some("taken"), "abc")).await;

    let post = |body: Value| {
        server
            .post("/api/watch-sessions")
            .add_header("Authorization", setup::bearer(&token))
            .json(&body)
    };

    let duplicate = post(fixtures::session_draft(Some("taken"), "abc")).await;
    duplicate.assert_status(StatusCode::CONFLICT);
    assert_eq!(code(&duplicate.json()), "CONFLICT_001");

    let bad_token = post(fixtures::session_draft(Some("bad token!"), "abc")).await;
    bad_token.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(code(&bad_token.json()), "VALID_003");

    let blank_path = post(json!({ "video_id": "abc", "path": "   " })).await;
    assert_eq!(code(&blank_path.json()), "VALID_009");

    let missing_video = post(json!({ "path": "/watch" })).await;
    assert_eq!(code(&missing_video.json()), "VALID_001");

    let long_video = post(json!({ "video_id": "v".repeat(33) })).await;
    assert_eq!(code(&long_video.json()), "VALID_004");
}

#[tokio::test]
async fn test_list_orders_by_activity() {
    let ctx = setup::TestContext::new();
    let server = ctx.server();
    let token = setup::signup(&server, &fixtures::unique_username("sessions")).await;

    setup::create_session(&server, &token, &fixtures::session_draft(Some("first"), "abc")).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    setup::create_session(&server, &token, &fixtures::session_draft(Some("second"), "abc")).await;

    assert_eq!(session_ids(&server, &token).await, vec!["second", "first"]);

    tokio::time::sleep(Duration::from_millis(5)).await;
    setup::create_event(&server, &token, Some("first"), &fixtures::playing("abc", 1.0)).await;
    assert_eq!(session_ids(&server, &token).await, vec!["first", "second"]);
}

#[tokio::test]
async fn test_update_keeps_identity() {
    let ctx = setup::TestContext::new();
    let server = ctx.server();
    let token = setup::signup(&server, &fixtures::unique_username("sessions")).await;

    let created = setup::create_session(&server, &token, &fixtures::session_draft(Some("edit-me"), "abc")).await;

    let response = server
        .put("/api/watch-sessions/edit-me")
        .add_header("Authorization", setup::bearer(&token))
        .json(&json!({ "watch_session_id": "renamed", "video_id": "xyz", "path": "/embed" }))
        .await;
    response.assert_status_ok();
    let updated: Value = response.json();
    assert_eq!(updated["watch_session_id"], "edit-me");
    assert_eq!(updated["video_id"], "xyz");
    assert_eq!(updated["path"], "/embed");
    assert_eq!(updated["referer"], created["referer"]);
    assert_eq!(updated["last_active"], created["last_active"]);

    server
        .get("/api/watch-sessions/renamed")
        .add_header("Authorization", setup::bearer(&token))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_keeps_event_links() {
    let ctx = setup::TestContext::new();
    let server = ctx.server();
    let token = setup::signup(&server, &fixtures::unique_username("sessions")).await;

    setup::create_session(&server, &token, &fixtures::session_draft(Some("gone"), "abc")).await;
    let event = setup::create_event(&server, &token, Some("gone"), &fixtures::playing("abc", 1.0)).await;

    let deleted: Value = server
        .delete("/api/watch-sessions/gone")
        .add_header("Authorization", setup::bearer(&token))
        .await
        .json();
    assert_eq!(deleted, json!({ "ok": true, "deleted_id": "gone" }));

    server
        .get("/api/watch-sessions/gone")
        .add_header("Authorization", setup::bearer(&token))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let fetched: Value = server
        .get(&format!("/api/video-events/{}", event["id"].as_str().unwrap()))
        .add_header("Authorization", setup::bearer(&token))
        .await
        .json();
    assert_eq!(fetched["watch_session_id"], "gone");

    // A new event naming the deleted token is stored without a session
    let orphan = setup::create_event(&server, &token, Some("gone"), &fixtures::playing("abc", 2.0)).await;
    assert!(orphan["watch_session_id"].is_null());
}
