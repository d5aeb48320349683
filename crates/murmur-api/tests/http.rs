//! Router-level behaviour: access redirects, session handling and the JSON
//! error contract.

mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use murmur_api::router::router;

use common::{RecordingNotifier, recording_state};

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let location = resp
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, location, body)
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn json_req(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Sign up, verify and sign in `username`; returns the session token.
async fn onboard(app: &Router, notifier: &RecordingNotifier, username: &str) -> String {
    let email = format!("{username}@x.com");

    let (status, _, body) = send(
        app,
        json_req(
            "POST",
            "/api/sign-up",
            None,
            json!({ "username": username, "email": email, "password": "secret-pw" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let code = notifier.last_code_for(&email).unwrap();
    let (status, _, body) = send(
        app,
        json_req(
            "POST",
            "/api/verify-code",
            None,
            json!({ "username": username, "code": code }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, _, body) = send(
        app,
        json_req(
            "POST",
            "/api/sign-in",
            None,
            json!({ "identifier": username, "password": "secret-pw" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn dashboard_requires_session() {
    let (state, _) = recording_state();
    let app = router(state);

    let (status, location, _) = send(&app, get("/dashboard/messages", None)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/sign-in"));

    // Public profile pages are left alone.
    let (status, location, _) = send(&app, get("/u/alice", None)).await;
    assert_ne!(status, StatusCode::SEE_OTHER);
    assert!(location.is_none());
}

#[tokio::test]
async fn signed_in_user_is_sent_to_dashboard() {
    let (state, notifier) = recording_state();
    let app = router(state);
    let token = onboard(&app, &notifier, "alice").await;

    for path in ["/sign-in", "/sign-up", "/", "/verify/alice"] {
        let (status, location, _) = send(&app, get(path, Some(&token))).await;
        assert_eq!(status, StatusCode::SEE_OTHER, "{path}");
        assert_eq!(location.as_deref(), Some("/dashboard"), "{path}");
    }

    let (status, location, _) = send(&app, get("/dashboard", Some(&token))).await;
    assert_ne!(status, StatusCode::SEE_OTHER);
    assert!(location.is_none());
}

#[tokio::test]
async fn owner_routes_reject_missing_session() {
    let (state, _) = recording_state();
    let app = router(state);

    let (status, _, body) = send(&app, get("/api/get-messages", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["kind"], "auth");
}

#[tokio::test]
async fn inbox_over_http() {
    let (state, notifier) = recording_state();
    let app = router(state);
    let token = onboard(&app, &notifier, "alice").await;

    // Below the boundary minimum.
    let (status, _, body) = send(
        &app,
        json_req("POST", "/api/send-message", None, json!({ "username": "alice", "content": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, _, body) = send(
        &app,
        json_req(
            "POST",
            "/api/send-message",
            None,
            json!({ "username": "alice", "content": "what is your favorite book?" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);

    let (status, _, body) = send(&app, get("/api/get-messages", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["content"], "what is your favorite book?");
    let id = messages[0]["id"].as_str().unwrap().to_string();

    // Turn the gate off.
    let (status, _, body) = send(
        &app,
        json_req("POST", "/api/accept-messages", Some(&token), json!({ "accept_messages": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_accepting_messages"], false);

    let (_, _, body) = send(&app, get("/api/accept-messages", Some(&token))).await;
    assert_eq!(body["is_accepting_messages"], false);

    let (status, _, body) = send(
        &app,
        json_req(
            "POST",
            "/api/send-message",
            None,
            json!({ "username": "alice", "content": "can you still hear me?" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "message_rejected");

    // Delete, then delete again.
    let uri = format!("/api/delete-message/{id}");
    let delete = |uri: &str| {
        Request::delete(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    };
    let (status, _, _) = send(&app, delete(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, body) = send(&app, delete(&uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["kind"], "not_found");

    let (_, _, body) = send(&app, get("/api/get-messages", Some(&token))).await;
    assert!(body["messages"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn username_availability_only_counts_verified() {
    let (state, notifier) = recording_state();
    let app = router(state);

    let (status, _, _) = send(
        &app,
        json_req(
            "POST",
            "/api/sign-up",
            None,
            json!({ "username": "bob", "email": "bob@x.com", "password": "secret-pw" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, body) = send(&app, get("/api/check-username-unique?username=bob", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    onboard(&app, &notifier, "carol").await;
    let (status, _, body) =
        send(&app, get("/api/check-username-unique?username=carol", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _, body) = send(&app, get("/api/check-username-unique?username=b!", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn unverified_account_cannot_sign_in() {
    let (state, _) = recording_state();
    let app = router(state);

    send(
        &app,
        json_req(
            "POST",
            "/api/sign-up",
            None,
            json!({ "username": "dana", "email": "dana@x.com", "password": "secret-pw" }),
        ),
    )
    .await;

    let (status, _, body) = send(
        &app,
        json_req(
            "POST",
            "/api/sign-in",
            None,
            json!({ "identifier": "dana@x.com", "password": "secret-pw" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "auth");
}

#[tokio::test]
async fn suggestions_are_best_effort() {
    let (state, _) = recording_state();
    let app = router(state);

    let (status, _, body) = send(&app, json_req("POST", "/api/suggest-messages", None, json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggestions"].as_array().unwrap().len(), 3);
    assert_eq!(body["fallback"], false);
}

#[tokio::test]
async fn malformed_requests_keep_the_error_shape() {
    let (state, _) = recording_state();
    let app = router(state);

    let (status, _, body) = send(
        &app,
        json_req("POST", "/api/send-message", None, json!({ "username": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["kind"], "validation");
    assert!(body["message"].as_str().unwrap().contains("content"));

    let (status, _, body) = send(&app, get("/api/check-username-unique", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let bad_json = Request::post("/api/sign-in")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, body) = send(&app, bad_json).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, _, body) = send(
        &app,
        json_req(
            "POST",
            "/api/sign-up",
            None,
            json!({ "username": "zed", "email": "zed@x.com", "password": "secret-pw", "admin": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn verify_unknown_user_is_not_found() {
    let (state, _) = recording_state();
    let app = router(state);

    let (status, _, body) = send(
        &app,
        json_req("POST", "/api/verify-code", None, json!({ "username": "ghost", "code": "12" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}
