//! Integration tests for checkout through `/api/carts/finalize` and
//! `/api/orders`.
//!
//! Stock must never go negative, purchased lines leave the cart, failed
//! lines stay exactly as they were.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::json;

use riffhouse_integration_tests::{TestApp, decimal};
use riffhouse_storefront::db::ReceiptRepository;

#[tokio::test]
async fn test_partial_checkout() {
    let app = TestApp::spawn().await;
    let a = app.product("A", "250.00", 5).await;
    let b = app.product("B", "40.00", 3).await;
    let (client, user) = app.shopper("quinn@riffhouse.example").await;
    app.add_to_cart(&client, a.id, 2).await;
    app.add_to_cart(&client, b.id, 10).await;

    let (status, body) = app.post(&client, "/api/carts/finalize", json!({})).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    assert_eq!(decimal(&body["ticket"]["amount"]), Decimal::new(50_000, 2));
    assert_eq!(body["ticket"]["purchaser"], "quinn@riffhouse.example");
    assert!(body["ticket"]["code"].as_str().unwrap().starts_with("RH-"));

    let purchased = body["purchasedItems"].as_array().unwrap();
    assert_eq!(purchased.len(), 1);
    assert_eq!(purchased[0]["productId"], a.id.as_i32());
    assert_eq!(purchased[0]["quantity"], 2);

    let failed = body["failedItems"].as_array().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["productId"], b.id.as_i32());
    assert_eq!(failed[0]["quantity"], 10);
    assert_eq!(failed[0]["reason"], "out_of_stock");

    assert_eq!(app.stock_of(a.id).await, 3);
    assert_eq!(app.stock_of(b.id).await, 3);

    let (_, cart) = app.get(&client, "/api/carts").await;
    let items = cart["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["productId"], b.id.as_i32());
    assert_eq!(items[0]["quantity"], 10);

    let receipts = ReceiptRepository::list_for_user(&app.store, user).await.unwrap();
    assert_eq!(receipts.len(), 1);
}

#[tokio::test]
async fn test_empty_cart_checkout() {
    let app = TestApp::spawn().await;
    let (client, user) = app.shopper("rae@riffhouse.example").await;

    let (status, body) = app.post(&client, "/api/carts/finalize", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cart is empty");
    assert!(body.get("failedItems").is_none());

    let receipts = ReceiptRepository::list_for_user(&app.store, user).await.unwrap();
    assert!(receipts.is_empty());
}

#[tokio::test]
async fn test_nothing_in_stock() {
    let app = TestApp::spawn().await;
    let a = app.product("SHORT-A", "10.00", 1).await;
    let b = app.product("SHORT-B", "10.00", 0).await;
    let (client, user) = app.shopper("sam@riffhouse.example").await;
    app.add_to_cart(&client, a.id, 2).await;
    app.add_to_cart(&client, b.id, 1).await;

    let (status, body) = app.post(&client, "/api/carts/finalize", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let failed = body["failedItems"].as_array().unwrap();
    assert_eq!(failed.len(), 2);
    assert_eq!(failed[0]["productId"], a.id.as_i32());
    assert_eq!(failed[1]["productId"], b.id.as_i32());

    assert_eq!(app.stock_of(a.id).await, 1);
    assert_eq!(app.stock_of(b.id).await, 0);
    let (_, cart) = app.get(&client, "/api/carts").await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 2);
    assert!(
        ReceiptRepository::list_for_user(&app.store, user)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_deleted_product_fails_its_line() {
    let app = TestApp::spawn().await;
    let keep = app.product("KEEP", "30.00", 5).await;
    let gone = app.product("GONE", "30.00", 5).await;
    let admin = app.admin("ops@riffhouse.example").await;
    let (client, _) = app.shopper("tia@riffhouse.example").await;
    app.add_to_cart(&client, keep.id, 1).await;
    app.add_to_cart(&client, gone.id, 1).await;

    let (status, _) = app
        .delete(&admin, &format!("/api/products/{}", gone.id))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.post(&client, "/api/carts/finalize", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["failedItems"][0]["reason"], "product_missing");
    assert_eq!(decimal(&body["ticket"]["amount"]), Decimal::new(3_000, 2));
}

#[tokio::test]
async fn test_concurrent_checkouts_never_oversell() {
    let app = TestApp::spawn().await;
    let last = app.product("LAST-ONE", "1500.00", 1).await;
    let (first, _) = app.shopper("uma@riffhouse.example").await;
    let (second, _) = app.shopper("vic@riffhouse.example").await;
    app.add_to_cart(&first, last.id, 1).await;
    app.add_to_cart(&second, last.id, 1).await;

    let (a, b) = tokio::join!(
        app.post(&first, "/api/carts/finalize", json!({})),
        app.post(&second, "/api/carts/finalize", json!({})),
    );

    let statuses = [a.0, b.0];
    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::OK).count(),
        1,
        "{statuses:?}"
    );
    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == StatusCode::BAD_REQUEST)
            .count(),
        1
    );
    assert_eq!(app.stock_of(last.id).await, 0);
}

#[tokio::test]
async fn test_same_cart_checked_out_twice_at_once() {
    let app = TestApp::spawn().await;
    let product = app.product("TWICE", "10.00", 5).await;
    let (client, user) = app.shopper("wes@riffhouse.example").await;
    app.add_to_cart(&client, product.id, 1).await;

    let (a, b) = tokio::join!(
        app.post(&client, "/api/carts/finalize", json!({})),
        app.post(&client, "/api/carts/finalize", json!({})),
    );
    let mut statuses = [a.0, b.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::BAD_REQUEST]);

    assert_eq!(app.stock_of(product.id).await, 4);
    let receipts = ReceiptRepository::list_for_user(&app.store, user).await.unwrap();
    assert_eq!(receipts.len(), 1);
}

#[tokio::test]
async fn test_repeated_checkouts_keep_stock_non_negative() {
    let app = TestApp::spawn().await;
    let product = app.product("REPEAT", "5.00", 7).await;
    let (client, _) = app.shopper("xan@riffhouse.example").await;

    let mut bought = 0;
    for _ in 0..5 {
        app.add_to_cart(&client, product.id, 2).await;
        let (status, _) = app.post(&client, "/api/carts/finalize", json!({})).await;
        if status == StatusCode::OK {
            bought += 2;
        }
        assert!(app.stock_of(product.id).await >= 0);
    }
    assert_eq!(bought, 6);
    assert_eq!(app.stock_of(product.id).await, 1);
}

#[tokio::test]
async fn test_orders_endpoints() {
    let app = TestApp::spawn().await;
    let product = app.product("ORDER", "75.00", 3).await;
    let (client, _) = app.shopper("yul@riffhouse.example").await;
    let (other, _) = app.shopper("zed@riffhouse.example").await;
    app.add_to_cart(&client, product.id, 2).await;

    let (status, body) = app.post(&client, "/api/orders", json!({})).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["order"], body["ticket"]);
    let id = body["order"]["id"].as_i64().unwrap();
    assert_eq!(body["order"]["lines"][0]["quantity"], 2);
    assert_eq!(decimal(&body["order"]["lines"][0]["unitPrice"]), Decimal::new(7_500, 2));

    let (status, body) = app.get(&client, "/api/orders").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orders"].as_array().unwrap().len(), 1);

    let (status, _) = app.get(&client, &format!("/api/orders/{id}")).await;
    assert_eq!(status, StatusCode::OK);

    // Someone else's order does not exist for them
    let (status, _) = app.get(&other, &format!("/api/orders/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
