//! Watch event ingestion and CRUD tests.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use integration_tests::{fixtures, setup};
use serde_json::{json, Value};
use uuid::Uuid;

async fn viewer(server: &axum_test::TestServer) -> String {
    setup::signup(server, &fixtures::unique_username("events")).await
}

fn code(body: &Value) -> &str {
    body["code"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn test_create_then_get() {
    let ctx = setup::TestContext::new();
    let server = ctx.server();
    let token = viewer(&server).await;

    let mut body = fixtures::playing("abc", 12.5);
    body["referer"] = json!("https://spoofed.test");
    body["watch_session_id"] = json!("spoofed");

    let created = setup::create_event(&server, &token, None, &body).await;
    assert_eq!(created["referer"], fixtures::REFERER);
    assert_eq!(created["video_id"], "abc");
    assert_eq!(created["current_time"], 12.5);
    assert!(created["watch_session_id"].is_null());

    let id = created["id"].as_str().unwrap();
    let fetched: Value = server
        .get(&format!("/api/video-events/{id}"))
        .add_header("Authorization", setup::bearer(&token))
        .await
        .json();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_state_value_bounds() {
    let ctx = setup::TestContext::new();
    let server = ctx.server();
    let token = viewer(&server).await;

    for value in -1..=5 {
        let mut body = fixtures::playing("abc", 1.0);
        body["video_state_value"] = json!(value);
        let response = setup::post_event(&server, &token, None, &body).await;
        response.assert_status(StatusCode::CREATED);
    }

    for value in [-2, 6] {
        let mut body = fixtures::playing("abc", 1.0);
        body["video_state_value"] = json!(value);
        let response = setup::post_event(&server, &token, None, &body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(code(&response.json()), "VALID_008");
    }
}

#[tokio::test]
async fn test_referer_header_rules() {
    let ctx = setup::TestContext::new();
    let server = ctx.server();
    let token = viewer(&server).await;
    let body = fixtures::playing("abc", 1.0);

    let missing = server
        .post("/api/video-events")
        .add_header("Authorization", setup::bearer(&token))
        .json(&body)
        .await;
    missing.assert_status(StatusCode::BAD_REQUEST);
    let missing: Value = missing.json();
    assert_eq!(code(&missing), "VALID_002");
    assert_eq!(missing["error"], "Validation failed");

    let post_with = |referer: String| {
        server
            .post("/api/video-events")
            .add_header("Authorization", setup::bearer(&token))
            .add_header("Referer", referer)
            .json(&body)
    };

    let empty = post_with(String::new()).await;
    assert_eq!(code(&empty.json()), "VALID_002");

    let too_long = post_with(format!("https://a.test/{}", "x".repeat(241))).await;
    assert_eq!(code(&too_long.json()), "VALID_002");

    let at_limit = post_with(format!("https://a.test/{}", "x".repeat(240))).await;
    at_limit.assert_status(StatusCode::CREATED);

    assert_eq!(ctx.store.event_count(), 1);
}

#[tokio::test]
async fn test_session_header_rules() {
    let ctx = setup::TestContext::new();
    let server = ctx.server();
    let token = viewer(&server).await;

    let bad = setup::post_event(&server, &token, Some("has space"), &fixtures::playing("abc", 1.0)).await;
    bad.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(code(&bad.json()), "VALID_003");

    let too_long = "a".repeat(65);
    let bad = setup::post_event(&server, &token, Some(&too_long), &fixtures::playing("abc", 1.0)).await;
    assert_eq!(code(&bad.json()), "VALID_003");

    // Referer is checked before the session token, which is checked before the body
    let both_bad = server
        .post("/api/video-events")
        .add_header("Authorization", setup::bearer(&token))
        .add_header("x-session-id", "bad token")
        .json(&fixtures::playing("abc", 1.0))
        .await;
    assert_eq!(code(&both_bad.json()), "VALID_002");

    let token_and_body_bad = server
        .post("/api/video-events")
        .add_header("Authorization", setup::bearer(&token))
        .add_header("Referer", fixtures::REFERER)
        .add_header("x-session-id", "bad token")
        .content_type("application/json")
        .bytes("nope".into())
        .await;
    assert_eq!(code(&token_and_body_bad.json()), "VALID_003");
}

#[tokio::test]
async fn test_field_validation_codes() {
    let ctx = setup::TestContext::new();
    let server = ctx.server();
    let token = viewer(&server).await;

    let cases = [
        ("video_id", json!(""), "VALID_004"),
        ("video_id", json!("x".repeat(33)), "VALID_004"),
        ("video_title", json!("   "), "VALID_005"),
        ("video_title", json!("t".repeat(256)), "VALID_005"),
        ("current_time", json!(-0.5), "VALID_006"),
        ("video_state_label", json!(""), "VALID_007"),
        ("video_state_label", json!("L".repeat(65)), "VALID_007"),
    ];

    for (field, value, expected) in cases {
        let mut body = fixtures::playing("abc", 1.0);
        body[field] = value;
        let response = setup::post_event(&server, &token, None, &body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(code(&body), expected, "{field}");
        assert!(body["details"][0].as_str().unwrap().starts_with(field));
    }

    let not_json = server
        .post("/api/video-events")
        .add_header("Authorization", setup::bearer(&token))
        .add_header("Referer", fixtures::REFERER)
        .content_type("application/json")
        .bytes("{\"video_id\": ".into())
        .await;
    not_json.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(code(&not_json.json()), "VALID_001");

    let missing_field = setup::post_event(&server, &token, None, &json!({ "video_id": "abc" })).await;
    assert_eq!(code(&missing_field.json()), "VALID_001");

    assert_eq!(ctx.store.event_count(), 0);
}

#[tokio::test]
async fn test_session_attachment() {
    let ctx = setup::TestContext::new();
    let server = ctx.server();
    let token = viewer(&server).await;

    let unknown = setup::create_event(&server, &token, Some("sess-1"), &fixtures::playing("abc", 1.0)).await;
    assert!(unknown["watch_session_id"].is_null());

    let session = setup::create_session(&server, &token, &fixtures::session_draft(Some("sess-2"), "abc")).await;
    let attached = setup::create_event(&server, &token, Some("sess-2"), &fixtures::playing("abc", 2.0)).await;
    assert_eq!(attached["watch_session_id"], "sess-2");

    let touched: Value = server
        .get("/api/watch-sessions/sess-2")
        .add_header("Authorization", setup::bearer(&token))
        .await
        .json();
    let last_active = |v: &Value| {
        v["last_active"]
            .as_str()
            .unwrap()
            .parse::<DateTime<Utc>>()
            .unwrap()
    };
    assert!(last_active(&touched) >= last_active(&session));
}

#[tokio::test]
async fn test_update_rewrites_player_state_only() {
    let ctx = setup::TestContext::new();
    let server = ctx.server();
    let token = viewer(&server).await;

    setup::create_session(&server, &token, &fixtures::session_draft(Some("sess-u"), "abc")).await;
    let created = setup::create_event(&server, &token, Some("sess-u"), &fixtures::playing("abc", 1.0)).await;
    let id = created["id"].as_str().unwrap();

    let mut update = fixtures::player_state("abc", "PAUSED", 40.0);
    update["video_state_value"] = json!(2);
    update["referer"] = json!("https://spoofed.test");

    let response = server
        .put(&format!("/api/video-events/{id}"))
        .add_header("Authorization", setup::bearer(&token))
        .json(&update)
        .await;
    response.assert_status_ok();
    let updated: Value = response.json();
    assert_eq!(updated["video_state_label"], "PAUSED");
    assert_eq!(updated["video_state_value"], 2);
    assert_eq!(updated["current_time"], 40.0);
    assert_eq!(updated["id"], created["id"]);
    assert_eq!(updated["time"], created["time"]);
    assert_eq!(updated["referer"], created["referer"]);
    assert_eq!(updated["watch_session_id"], "sess-u");

    let mut invalid = update.clone();
    invalid["video_state_value"] = json!(9);
    let response = server
        .put(&format!("/api/video-events/{id}"))
        .add_header("Authorization", setup::bearer(&token))
        .json(&invalid)
        .await;
    assert_eq!(code(&response.json()), "VALID_008");
}

#[tokio::test]
async fn test_delete_event() {
    let ctx = setup::TestContext::new();
    let server = ctx.server();
    let token = viewer(&server).await;

    let created = setup::create_event(&server, &token, None, &fixtures::playing("abc", 1.0)).await;
    let id = created["id"].as_str().unwrap();
    let path = format!("/api/video-events/{id}");

    let deleted: Value = server
        .delete(&path)
        .add_header("Authorization", setup::bearer(&token))
        .await
        .json();
    assert_eq!(deleted, json!({ "ok": true, "deleted_id": id }));

    let again = server
        .delete(&path)
        .add_header("Authorization", setup::bearer(&token))
        .await;
    again.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(code(&again.json()), "NOT_FOUND_001");

    server
        .get(&path)
        .add_header("Authorization", setup::bearer(&token))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_pagination_is_disjoint() {
    let ctx = setup::TestContext::new();
    let server = ctx.server();
    let token = viewer(&server).await;

    for i in 0..4 {
        setup::create_event(&server, &token, None, &fixtures::playing("abc", f64::from(i))).await;
    }

    let page = |offset: u32| {
        server
            .get("/api/video-events")
            .add_query_param("limit", 2)
            .add_query_param("offset", offset)
            .add_header("Authorization", setup::bearer(&token))
    };

    let first: Vec<Value> = page(0).await.json();
    let second: Vec<Value> = page(2).await.json();
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);
    for event in &first {
        assert!(!second.iter().any(|other| other["id"] == event["id"]));
    }

    let all: Vec<Value> = server
        .get("/api/video-events")
        .add_header("Authorization", setup::bearer(&token))
        .await
        .json();
    assert_eq!(all.len(), 4);
    let positions: Vec<f64> = all.iter().map(|e| e["current_time"].as_f64().unwrap()).collect();
    assert_eq!(positions, vec![0.0, 1.0, 2.0, 3.0]);

    let bad = server
        .get("/api/video-events")
        .add_query_param("limit", "lots")
        .add_header("Authorization", setup::bearer(&token))
        .await;
    bad.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_failed_session_touch_stores_nothing() {
    let ctx = setup::TestContext::new();
    let server = ctx.server();
    let token = viewer(&server).await;
    setup::create_session(&server, &token, &fixtures::session_draft(Some("sess-f"), "abc")).await;

    ctx.store.set_fail_session_writes(true);
    let response = setup::post_event(&server, &token, Some("sess-f"), &fixtures::playing("abc", 1.0)).await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(code(&body), "DB_001");
    assert_eq!(body["error"], "Database error");
    assert!(body.get("details").is_none());
    assert_eq!(ctx.store.event_count(), 0);

    ctx.store.set_fail_session_writes(false);
    setup::create_event(&server, &token, Some("sess-f"), &fixtures::playing("abc", 1.0)).await;
    assert_eq!(ctx.store.event_count(), 1);
}

#[tokio::test]
async fn test_unknown_or_malformed_event_id() {
    let ctx = setup::TestContext::new();
    let server = ctx.server();
    let token = viewer(&server).await;

    let missing = server
        .get(&format!("/api/video-events/{}", Uuid::new_v4()))
        .add_header("Authorization", setup::bearer(&token))
        .await;
    missing.assert_status(StatusCode::NOT_FOUND);

    let malformed = server
        .get("/api/video-events/not-a-uuid")
        .add_header("Authorization", setup::bearer(&token))
        .await;
    malformed.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(malformed.json::<Value>(), missing.json::<Value>());
}
