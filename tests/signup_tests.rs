//! Tests for account creation.

mod common;

use axum::http::StatusCode;
use common::{TestSetup, body_json, json_post, setup};
use rotoken::db::ROLE_USER;

fn signup_body(username: &str, password: &str, nickname: &str) -> serde_json::Value {
    serde_json::json!({
        "username": username,
        "password": password,
        "nickname": nickname,
    })
}

#[tokio::test]
async fn test_signup_creates_user_with_user_role() {
    let app = setup().await;

    let response = app
        .send(json_post(
            "/signup",
            signup_body("alice", "password123", "Alice"),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["username"], "alice");
    let id = body["id"].as_i64().unwrap();

    let user = app.db.users().get_by_id(id).await.unwrap().unwrap();
    assert_eq!(user.nickname, "Alice");
    assert_ne!(user.password_hash, "password123");
    assert_eq!(
        app.db.users().authorities(id).await.unwrap(),
        vec![ROLE_USER.to_string()]
    );

    // The new account can log in right away
    let response = app.login("alice", "password123").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_signup_duplicate_username() {
    let app = setup().await;

    let response = app
        .send(json_post(
            "/signup",
            signup_body("alice", "password123", "Alice"),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .send(json_post(
            "/signup",
            signup_body("alice", "otherpassword", "Other"),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_json(response).await;
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_signup_validation() {
    let app = setup().await;

    let cases = [
        signup_body("abc", "password123", "Alice"),
        signup_body("a_very_long_username_x", "password123", "Alice"),
        signup_body("bad name", "password123", "Alice"),
        signup_body("alice", "short", "Alice"),
        signup_body("alice", "password123", "  "),
    ];

    for body in cases {
        let response = app.send(json_post("/signup", body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "bad_request");
    }

    assert!(app.db.users().is_username_available("alice").await.unwrap());
}

#[tokio::test]
async fn test_signup_missing_fields() {
    let app = setup().await;

    let response = app
        .send(json_post(
            "/signup",
            serde_json::json!({ "username": "alice" }),
        ))
        .await;
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_signup_rate_limited() {
    let app = TestSetup::new().with_rate_limits(1000, 1).build().await;

    let response = app
        .send(json_post(
            "/signup",
            signup_body("alice", "password123", "Alice"),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .send(json_post("/signup", signup_body("bob_1", "password123", "Bob")))
        .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}
