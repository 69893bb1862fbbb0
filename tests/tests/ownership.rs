//! Cross-user isolation tests.
//!
//! Records owned by someone else must be indistinguishable from records
//! that do not exist.

use axum::http::StatusCode;
use axum_test::{TestResponse, TestServer};
use integration_tests::{fixtures, setup};
use serde_json::Value;
use uuid::Uuid;

struct Pair {
    owner: String,
    intruder: String,
}

async fn pair(server: &TestServer) -> Pair {
    Pair {
        owner: setup::signup(server, &fixtures::unique_username("owner")).await,
        intruder: setup::signup(server, &fixtures::unique_username("intruder")).await,
    }
}

fn assert_same_not_found(foreign: TestResponse, missing: TestResponse) {
    foreign.assert_status(StatusCode::NOT_FOUND);
    missing.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(foreign.json::<Value>(), missing.json::<Value>());
}

#[tokio::test]
async fn test_foreign_event_reads_as_missing() {
    let ctx = setup::TestContext::new();
    let server = ctx.server();
    let users = pair(&server).await;

    let event = setup::create_event(&server, &users.owner, None, &fixtures::playing("abc", 1.0)).await;
    let foreign = format!("/api/video-events/{}", event["id"].as_str().unwrap());
    let missing = format!("/api/video-events/{}", Uuid::new_v4());
    let auth = setup::bearer(&users.intruder);

    assert_same_not_found(
        server.get(&foreign).add_header("Authorization", &auth).await,
        server.get(&missing).add_header("Authorization", &auth).await,
    );

    let update = fixtures::player_state("abc", "PAUSED", 99.0);
    assert_same_not_found(
        server.put(&foreign).add_header("Authorization", &auth).json(&update).await,
        server.put(&missing).add_header("Authorization", &auth).json(&update).await,
    );

    assert_same_not_found(
        server.delete(&foreign).add_header("Authorization", &auth).await,
        server.delete(&missing).add_header("Authorization", &auth).await,
    );

    // The owner's record is untouched
    let still_there: Value = server
        .get(&foreign)
        .add_header("Authorization", setup::bearer(&users.owner))
        .await
        .json();
    assert_eq!(still_there, event);
}

#[tokio::test]
async fn test_foreign_session_reads_as_missing() {
    let ctx = setup::TestContext::new();
    let server = ctx.server();
    let users = pair(&server).await;

    setup::create_session(&server, &users.owner, &fixtures::session_draft(Some("owned"), "abc")).await;
    let auth = setup::bearer(&users.intruder);

    assert_same_not_found(
        server.get("/api/watch-sessions/owned").add_header("Authorization", &auth).await,
        server.get("/api/watch-sessions/nope").add_header("Authorization", &auth).await,
    );

    let draft = fixtures::session_draft(None, "xyz");
    assert_same_not_found(
        server
            .put("/api/watch-sessions/owned")
            .add_header("Authorization", &auth)
            .json(&draft)
            .await,
        server
            .put("/api/watch-sessions/nope")
            .add_header("Authorization", &auth)
            .json(&draft)
            .await,
    );

    assert_same_not_found(
        server.delete("/api/watch-sessions/owned").add_header("Authorization", &auth).await,
        server.delete("/api/watch-sessions/nope").add_header("Authorization", &auth).await,
    );

    server
        .get("/api/watch-sessions/owned")
        .add_header("Authorization", setup::bearer(&users.owner))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_lists_are_scoped_to_caller() {
    let ctx = setup::TestContext::new();
    let server = ctx.server();
    let users = pair(&server).await;

    setup::create_event(&server, &users.owner, None, &fixtures::playing("abc", 1.0)).await;
    setup::create_event(&server, &users.owner, None, &fixtures::playing("abc", 2.0)).await;
    setup::create_event(&server, &users.intruder, None, &fixtures::playing("abc", 3.0)).await;
    setup::create_session(&server, &users.owner, &fixtures::session_draft(Some("owner-s"), "abc")).await;

    let owner_events: Vec<Value> = server
        .get("/api/video-events")
        .add_header("Authorization", setup::bearer(&users.owner))
        .await
        .json();
    assert_eq!(owner_events.len(), 2);

    let intruder_events: Vec<Value> = server
        .get("/api/video-events")
        .add_header("Authorization", setup::bearer(&users.intruder))
        .await
        .json();
    assert_eq!(intruder_events.len(), 1);
    assert_eq!(intruder_events[0]["current_time"], 3.0);

    let intruder_sessions: Vec<Value> = server
        .get("/api/watch-sessions")
        .add_header("Authorization", setup::bearer(&users.intruder))
        .await
        .json();
    assert!(intruder_sessions.is_empty());
}

#[tokio::test]
async fn test_user_stats_are_scoped_to_caller() {
    let ctx = setup::TestContext::new();
    let server = ctx.server();
    let users = pair(&server).await;

    for position in [1.0, 2.0, 3.0] {
        setup::create_event(&server, &users.owner, None, &fixtures::playing("abc", position)).await;
    }

    let intruder: Value = server
        .get("/api/stats/me")
        .add_header("Authorization", setup::bearer(&users.intruder))
        .await
        .json();
    assert_eq!(intruder["totals"]["total_events"], 0);
    assert!(intruder["recent_events"].as_array().unwrap().is_empty());

    let owner: Value = server
        .get("/api/stats/me")
        .add_header("Authorization", setup::bearer(&users.owner))
        .await
        .json();
    assert_eq!(owner["totals"]["total_events"], 3);
}
