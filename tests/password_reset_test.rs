mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::json;
use storefront_account_api::entities::user;

use common::{response_json, TestApp};

const GENERIC_MESSAGE: &str = "If an account exists, you will receive a password reset email";

async fn fetch_user(app: &TestApp, id: uuid::Uuid) -> user::Model {
    user::Entity::find_by_id(id)
        .one(&*app.state.db)
        .await
        .expect("query user")
        .expect("user exists")
}

#[tokio::test]
async fn unknown_email_gets_the_same_answer_as_known() {
    let app = TestApp::new().await;
    app.seed_user("known@example.com", "hunter2").await;

    for email in ["known@example.com", "unknown@example.com"] {
        let response = app
            .request(
                Method::POST,
                "/api/v1/auth/forgot-password",
                Some(json!({ "email": email })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["message"], json!(GENERIC_MESSAGE));
    }
}

#[tokio::test]
async fn forgot_password_stores_a_fresh_token() {
    let app = TestApp::new().await;
    let seeded = app.seed_user("ada@example.com", "hunter2").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/forgot-password",
            Some(json!({ "email": "ada@example.com" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = fetch_user(&app, seeded.id).await;
    let token = stored.reset_token.expect("token stored");
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    let expires_at = stored.reset_token_expires_at.expect("expiry stored");
    assert!(expires_at > Utc::now());
}

#[tokio::test]
async fn valid_token_resets_password_and_is_consumed() {
    let app = TestApp::new().await;
    let seeded = app.seed_user("ada@example.com", "hunter2").await;

    app.request(
        Method::POST,
        "/api/v1/auth/forgot-password",
        Some(json!({ "email": "ada@example.com" })),
        None,
    )
    .await;

    let token = fetch_user(&app, seeded.id)
        .await
        .reset_token
        .expect("token stored");

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/reset-password",
            Some(json!({ "token": token.clone(), "password": "brand-new-pass" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = fetch_user(&app, seeded.id).await;
    assert!(stored.reset_token.is_none());
    assert!(stored.reset_token_expires_at.is_none());
    assert!(bcrypt::verify("brand-new-pass", &stored.password_hash).unwrap());
    assert!(!bcrypt::verify("hunter2", &stored.password_hash).unwrap());

    // Replay with the consumed token must fail.
    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/reset-password",
            Some(json!({ "token": token, "password": "another-pass" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["message"], json!("Invalid or expired reset token"));
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let app = TestApp::new().await;
    let seeded = app.seed_user("ada@example.com", "hunter2").await;

    let mut active: user::ActiveModel = seeded.into();
    active.reset_token = Set(Some("a".repeat(64)));
    active.reset_token_expires_at = Set(Some(Utc::now() - Duration::minutes(5)));
    active.update(&*app.state.db).await.expect("expire token");

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/reset-password",
            Some(json!({ "token": "a".repeat(64), "password": "brand-new-pass" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["message"], json!("Invalid or expired reset token"));
}

#[tokio::test]
async fn bogus_token_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/reset-password",
            Some(json!({ "token": "deadbeef", "password": "brand-new-pass" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn short_new_password_is_rejected() {
    let app = TestApp::new().await;
    let seeded = app.seed_user("ada@example.com", "hunter2").await;

    app.request(
        Method::POST,
        "/api/v1/auth/forgot-password",
        Some(json!({ "email": "ada@example.com" })),
        None,
    )
    .await;
    let token = fetch_user(&app, seeded.id)
        .await
        .reset_token
        .expect("token stored");

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/reset-password",
            Some(json!({ "token": token, "password": "short" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Token survives a failed attempt.
    let stored = fetch_user(&app, seeded.id).await;
    assert!(stored.reset_token.is_some());
}

#[tokio::test]
async fn malformed_email_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/forgot-password",
            Some(json!({ "email": "not-an-email" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
