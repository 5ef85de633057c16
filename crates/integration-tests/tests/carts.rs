//! Integration tests for the shopper's own cart.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::json;

use riffhouse_integration_tests::{TestApp, decimal};

#[tokio::test]
async fn test_new_shopper_has_empty_cart() {
    let app = TestApp::spawn().await;
    let (client, id) = app.shopper("ivy@riffhouse.example").await;

    let (status, body) = app.get(&client, "/api/carts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userId"], id.as_i32());
    assert_eq!(body["items"], json!([]));
    assert_eq!(decimal(&body["total"]), Decimal::ZERO);
}

#[tokio::test]
async fn test_add_merges_lines_and_totals() {
    let app = TestApp::spawn().await;
    let strat = app.product("STRAT", "800.00", 10).await;
    let pedal = app.product("PEDAL", "99.50", 10).await;
    let (client, _) = app.shopper("jo@riffhouse.example").await;

    app.add_to_cart(&client, strat.id, 1).await;
    app.add_to_cart(&client, pedal.id, 2).await;
    app.add_to_cart(&client, strat.id, 2).await;

    let (_, body) = app.get(&client, "/api/carts").await;
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["productId"], strat.id.as_i32());
    assert_eq!(items[0]["quantity"], 3);
    assert_eq!(items[1]["quantity"], 2);
    assert_eq!(decimal(&body["total"]), Decimal::new(259_900, 2));

    let (_, body) = app.get(&client, "/api/carts/count").await;
    assert_eq!(body["count"], 5);
}

#[tokio::test]
async fn test_add_defaults_to_one_unit() {
    let app = TestApp::spawn().await;
    let product = app.product("ONE", "10.00", 10).await;
    let (client, _) = app.shopper("kai@riffhouse.example").await;

    let (status, body) = app
        .post(&client, "/api/carts/add", json!({ "productId": product.id }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["cart"]["items"][0]["quantity"], 1);
}

#[tokio::test]
async fn test_add_rejects_bad_input() {
    let app = TestApp::spawn().await;
    let product = app.product("BAD", "10.00", 10).await;
    let (client, _) = app.shopper("lu@riffhouse.example").await;

    for quantity in [0, -3] {
        let (status, _) = app
            .post(
                &client,
                "/api/carts/add",
                json!({ "productId": product.id, "quantity": quantity }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "quantity {quantity}");
    }

    let (status, _) = app
        .post(&client, "/api/carts/add", json!({ "quantity": 1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(&client, "/api/carts/add", json!({ "productId": 4242, "quantity": 1 }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Product not found");

    let (_, body) = app.get(&client, "/api/carts").await;
    assert_eq!(body["items"], json!([]));
}

#[tokio::test]
async fn test_update_sets_exact_quantity() {
    let app = TestApp::spawn().await;
    let product = app.product("UPD", "20.00", 10).await;
    let (client, _) = app.shopper("max@riffhouse.example").await;
    app.add_to_cart(&client, product.id, 2).await;

    let (_, body) = app.get(&client, "/api/carts").await;
    let item = body["items"][0]["id"].as_i64().unwrap();

    let (status, body) = app
        .put(&client, &format!("/api/carts/update/{item}"), json!({ "quantity": 7 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["items"][0]["quantity"], 7);

    // Zero is not a removal
    let (status, _) = app
        .put(&client, &format!("/api/carts/update/{item}"), json!({ "quantity": 0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, body) = app.get(&client, "/api/carts").await;
    assert_eq!(body["items"][0]["quantity"], 7);

    let (status, _) = app
        .put(&client, "/api/carts/update/9999", json!({ "quantity": 1 }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cannot_touch_another_shoppers_line() {
    let app = TestApp::spawn().await;
    let product = app.product("MINE", "20.00", 10).await;
    let (owner, _) = app.shopper("ned@riffhouse.example").await;
    let (other, _) = app.shopper("ola@riffhouse.example").await;
    app.add_to_cart(&owner, product.id, 1).await;

    let (_, body) = app.get(&owner, "/api/carts").await;
    let item = body["items"][0]["id"].as_i64().unwrap();

    let (status, _) = app.delete(&other, &format!("/api/carts/remove/{item}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = app.get(&owner, "/api/carts").await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_remove_and_clear() {
    let app = TestApp::spawn().await;
    let a = app.product("RM-A", "1.00", 10).await;
    let b = app.product("RM-B", "2.00", 10).await;
    let (client, _) = app.shopper("pia@riffhouse.example").await;
    app.add_to_cart(&client, a.id, 1).await;
    app.add_to_cart(&client, b.id, 1).await;

    let (_, body) = app.get(&client, "/api/carts").await;
    let first = body["items"][0]["id"].as_i64().unwrap();

    let (status, body) = app
        .delete(&client, &format!("/api/carts/remove/{first}"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["items"][0]["productId"], b.id.as_i32());

    let (status, body) = app.delete(&client, "/api/carts/clear").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["items"], json!([]));
}
