mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use serde_json::json;

use common::{response_json, TestApp};

#[tokio::test]
async fn orders_come_back_newest_first_with_lines() {
    let app = TestApp::new().await;
    let seeded = app.seed_user("ada@example.com", "hunter2").await;
    let token = app.token_for(&seeded);

    let widget = app.seed_product("widget").await;
    let older = app
        .seed_order(seeded.id, "ORD-1001", Utc::now() - Duration::days(7))
        .await;
    let newer = app.seed_order(seeded.id, "ORD-1002", Utc::now()).await;
    app.seed_order_item(older.id, widget.id).await;
    app.seed_order_item(newer.id, widget.id).await;

    let response = app
        .request(Method::GET, "/api/v1/user/orders", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let orders = body["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0]["order_number"], json!("ORD-1002"));
    assert_eq!(orders[1]["order_number"], json!("ORD-1001"));

    assert_eq!(orders[0]["status"], json!("DELIVERED"));
    assert_eq!(orders[0]["shipping_address"]["street"], json!("1 Main St"));
    assert_eq!(orders[0]["shipping_address"]["zip_code"], json!("62704"));

    let items = orders[0]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], json!(2));
    assert_eq!(items[0]["product"]["name"], json!("widget"));
    assert!(items[0]["product"]["image"]
        .as_str()
        .unwrap()
        .starts_with("https://cdn.example.com/"));
}

#[tokio::test]
async fn empty_history_is_an_empty_list() {
    let app = TestApp::new().await;
    let seeded = app.seed_user("ada@example.com", "hunter2").await;
    let token = app.token_for(&seeded);

    let response = app
        .request(Method::GET, "/api/v1/user/orders", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert!(body["orders"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn orders_of_other_users_are_not_listed() {
    let app = TestApp::new().await;
    let owner = app.seed_user("owner@example.com", "hunter2").await;
    let other = app.seed_user("other@example.com", "hunter2").await;

    app.seed_order(owner.id, "ORD-1001", Utc::now()).await;

    let token = app.token_for(&other);
    let response = app
        .request(Method::GET, "/api/v1/user/orders", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert!(body["orders"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn order_history_requires_authentication() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/user/orders", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
