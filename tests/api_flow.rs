//! End-to-end tests of the REST surface against an in-memory database.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use calendar_app::db;
use calendar_app::routes::{app, AppState};

async fn test_app() -> Router {
    let pool = db::memory_pool().await.expect("in-memory pool");
    db::init(&pool).await.expect("schema bootstrap");
    app(AppState { db: pool, ai: None })
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn register(router: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        router,
        "POST",
        "/api/auth/register",
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {body}");
    body["id"].as_str().expect("user id").to_string()
}

fn event_json(id: &str, user_id: &str, title: &str, date: &str) -> Value {
    json!({
        "id": id,
        "userId": user_id,
        "title": title,
        "description": "",
        "date": date,
        "time": "09:00",
        "color": "bg-blue-500",
    })
}

#[tokio::test]
async fn register_then_login_returns_the_same_user() {
    let router = test_app().await;
    let id = register(&router, "alice", "pw1").await;

    let (status, body) = send(
        &router,
        "POST",
        "/api/auth/login",
        Some(json!({ "username": "alice", "password": "pw1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["username"], "alice");
    assert!(body.get("passwordHash").is_none());
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_username_is_a_conflict() {
    let router = test_app().await;
    register(&router, "alice", "pw1").await;

    let (status, body) = send(
        &router,
        "POST",
        "/api/auth/register",
        Some(json!({ "username": "alice", "password": "other" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Username already exists");
}

#[tokio::test]
async fn register_requires_username_and_password() {
    let router = test_app().await;
    let (status, _) = send(
        &router,
        "POST",
        "/api/auth/register",
        Some(json!({ "username": "", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &router,
        "POST",
        "/api/auth/register",
        Some(json!({ "username": "alice", "password": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_password_and_unknown_user_are_indistinguishable() {
    let router = test_app().await;
    register(&router, "alice", "pw1").await;

    let (wrong_status, wrong_body) = send(
        &router,
        "POST",
        "/api/auth/login",
        Some(json!({ "username": "alice", "password": "nope" })),
    )
    .await;
    let (unknown_status, unknown_body) = send(
        &router,
        "POST",
        "/api/auth/login",
        Some(json!({ "username": "bob", "password": "nope" })),
    )
    .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
}

#[tokio::test]
async fn listing_events_requires_user_id() {
    let router = test_app().await;
    let (status, body) = send(&router, "GET", "/api/events", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing userId");
}

#[tokio::test]
async fn unknown_user_has_no_events() {
    let router = test_app().await;
    let (status, body) = send(&router, "GET", "/api/events?userId=nobody", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn upsert_is_idempotent() {
    let router = test_app().await;
    let user_id = register(&router, "alice", "pw1").await;
    let event = event_json("e1", &user_id, "Standup", "2025-03-10");

    for _ in 0..2 {
        let (status, body) = send(&router, "POST", "/api/events", Some(event.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }

    let (_, body) = send(&router, "GET", &format!("/api/events?userId={user_id}"), None).await;
    assert_eq!(body, json!([event]));
}

#[tokio::test]
async fn upsert_overwrites_mutable_fields() {
    let router = test_app().await;
    let user_id = register(&router, "alice", "pw1").await;

    let first = event_json("e1", &user_id, "Standup", "2025-03-10");
    send(&router, "POST", "/api/events", Some(first)).await;

    let mut second = event_json("e1", &user_id, "Retro", "2025-03-12");
    second["time"] = json!("16:30");
    second["color"] = json!("bg-red-500");
    send(&router, "POST", "/api/events", Some(second.clone())).await;

    let (_, body) = send(&router, "GET", &format!("/api/events?userId={user_id}"), None).await;
    assert_eq!(body, json!([second]));
}

#[tokio::test]
async fn deleting_a_missing_event_is_ok_and_changes_nothing() {
    let router = test_app().await;
    let user_id = register(&router, "alice", "pw1").await;
    let event = event_json("e1", &user_id, "Standup", "2025-03-10");
    send(&router, "POST", "/api/events", Some(event.clone())).await;

    let (status, body) = send(&router, "DELETE", "/api/events/no-such-id", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = send(&router, "GET", &format!("/api/events?userId={user_id}"), None).await;
    assert_eq!(body, json!([event]));
}

#[tokio::test]
async fn events_outside_the_palette_are_rejected() {
    let router = test_app().await;
    let user_id = register(&router, "alice", "pw1").await;
    let mut event = event_json("e1", &user_id, "Standup", "2025-03-10");
    event["color"] = json!("bg-orange-500");

    let (status, _) = send(&router, "POST", "/api/events", Some(event)).await;
    assert!(status.is_client_error(), "got {status}");

    let (_, body) = send(&router, "GET", &format!("/api/events?userId={user_id}"), None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn alice_creates_lists_and_deletes_an_event() {
    let router = test_app().await;
    let user_id = register(&router, "alice", "pw1").await;
    let event = event_json("e1", &user_id, "Standup", "2025-03-10");

    let (status, body) = send(&router, "POST", "/api/events", Some(event.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = send(&router, "GET", &format!("/api/events?userId={user_id}"), None).await;
    assert_eq!(body, json!([event]));

    let (status, body) = send(&router, "DELETE", "/api/events/e1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = send(&router, "GET", &format!("/api/events?userId={user_id}"), None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn month_view_returns_grid_and_buckets() {
    let router = test_app().await;
    let user_id = register(&router, "alice", "pw1").await;

    for (id, date) in [
        ("e1", "2025-03-10"),
        ("e2", "2025-03-10"),
        ("e3", "2025-03-31"),
        ("e4", "2025-04-01"),
    ] {
        let event = event_json(id, &user_id, id, date);
        send(&router, "POST", "/api/events", Some(event)).await;
    }

    let (status, body) = send(
        &router,
        "GET",
        &format!("/api/calendar?userId={user_id}&year=2025&month=3"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // March 2025 has 31 days and starts on a Saturday
    assert_eq!(body["daysInMonth"], 31);
    assert_eq!(body["leadingBlanks"], 5);
    assert_eq!(body["events"]["10"].as_array().unwrap().len(), 2);
    assert_eq!(body["events"]["31"].as_array().unwrap().len(), 1);
    assert!(body["events"].get("1").is_none());
}

#[tokio::test]
async fn month_view_highlights_the_viewer_supplied_date() {
    let router = test_app().await;
    let user_id = register(&router, "alice", "pw1").await;

    // the highlight follows the date the viewer reports, not the server clock
    let (status, body) = send(
        &router,
        "GET",
        &format!("/api/calendar?userId={user_id}&year=2025&month=3&today=2025-03-10"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["today"], 10);

    // a viewer whose local date falls outside the viewed month gets no highlight
    let (_, body) = send(
        &router,
        "GET",
        &format!("/api/calendar?userId={user_id}&year=2025&month=4&today=2025-03-10"),
        None,
    )
    .await;
    assert_eq!(body["today"], Value::Null);
}

#[tokio::test]
async fn month_view_rejects_impossible_months() {
    let router = test_app().await;
    let user_id = register(&router, "alice", "pw1").await;

    let (status, _) = send(
        &router,
        "GET",
        &format!("/api/calendar?userId={user_id}&year=2025&month=13"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn smart_add_is_unavailable_without_a_credential() {
    let router = test_app().await;
    let (status, body) = send(
        &router,
        "POST",
        "/api/ai/parse",
        Some(json!({ "prompt": "meeting tomorrow", "referenceDate": "2025-03-10" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "AI service unavailable");
}
