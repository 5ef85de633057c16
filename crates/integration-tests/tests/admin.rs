//! Integration tests for the admin panel API: stock levels, tickets and
//! carts addressed by id.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use serde_json::json;

use riffhouse_integration_tests::TestApp;

// =============================================================================
// Stock
// =============================================================================

#[tokio::test]
async fn test_stock_update_is_idempotent() {
    let app = TestApp::spawn().await;
    let product = app.product("STOCK", "100.00", 2).await;
    let admin = app.admin("stock@riffhouse.example").await;

    let update = json!({ "productId": product.id, "newStock": 12 });
    let (status, first) = app.post(&admin, "/admin/stock/update", update.clone()).await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert_eq!(first["product"]["stock"], 12);

    let (status, second) = app.post(&admin, "/admin/stock/update", update).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["product"], second["product"]);
    assert_eq!(app.stock_of(product.id).await, 12);
}

#[tokio::test]
async fn test_stock_update_validation() {
    let app = TestApp::spawn().await;
    let product = app.product("STOCK-V", "100.00", 2).await;
    let admin = app.admin("stock2@riffhouse.example").await;

    for body in [
        json!({ "newStock": 5 }),
        json!({ "productId": product.id }),
        json!({ "productId": product.id, "newStock": -1 }),
    ] {
        let (status, response) = app.post(&admin, "/admin/stock/update", body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert!(response["message"].is_string());
    }

    let (status, _) = app
        .post(
            &admin,
            "/admin/stock/update",
            json!({ "productId": 777, "newStock": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.stock_of(product.id).await, 2);
}

#[tokio::test]
async fn test_restock_unblocks_checkout() {
    let app = TestApp::spawn().await;
    let product = app.product("RESTOCK", "60.00", 0).await;
    let admin = app.admin("stock3@riffhouse.example").await;
    let (client, _) = app.shopper("buyer@riffhouse.example").await;
    app.add_to_cart(&client, product.id, 1).await;

    let (status, _) = app.post(&client, "/api/carts/finalize", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.post(
        &admin,
        "/admin/stock/update",
        json!({ "productId": product.id, "newStock": 1 }),
    )
    .await;

    let (status, _) = app.post(&client, "/api/carts/finalize", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.stock_of(product.id).await, 0);
}

// =============================================================================
// Tickets
// =============================================================================

#[tokio::test]
async fn test_tickets_listing_and_lookup() {
    let app = TestApp::spawn().await;
    let product = app.product("TICKET", "12.00", 5).await;
    let admin = app.admin("tickets@riffhouse.example").await;
    let (client, _) = app.shopper("ticket-buyer@riffhouse.example").await;
    app.add_to_cart(&client, product.id, 1).await;
    let (_, body) = app.post(&client, "/api/carts/finalize", json!({})).await;
    let code = body["ticket"]["code"].as_str().unwrap().to_owned();

    let (status, body) = app.get(&admin, "/admin/tickets").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tickets"][0]["code"], code.as_str());

    let (status, body) = app.get(&admin, &format!("/admin/tickets/{code}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ticket"]["purchaser"], "ticket-buyer@riffhouse.example");

    let (status, _) = app.get(&admin, "/admin/tickets/RH-NOPE").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get(&admin, "/admin/categories").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["categories"], json!(["electric"]));
}

// =============================================================================
// Carts by id
// =============================================================================

#[tokio::test]
async fn test_admin_cart_operations() {
    let app = TestApp::spawn().await;
    let product = app.product("CART-ADM", "15.00", 5).await;
    let admin = app.admin("carts@riffhouse.example").await;
    let (client, _) = app.shopper("cart-owner@riffhouse.example").await;

    let (_, own) = app.get(&client, "/api/carts").await;
    let cart = own["id"].as_i64().unwrap();
    let pid = product.id;

    let (status, body) = app
        .post(&admin, &format!("/api/carts/{cart}/product/{pid}"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["cart"]["items"][0]["quantity"], 1);

    let (_, body) = app.get(&admin, &format!("/api/carts/{cart}")).await;
    assert_eq!(body["items"][0]["productId"], pid.as_i32());

    let (status, body) = app.get(&admin, "/api/carts/all").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["carts"].as_array().unwrap().len() >= 2);

    let (status, body) = app
        .delete(&admin, &format!("/api/carts/{cart}/products/{pid}"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["items"], json!([]));

    let (status, _) = app.delete(&admin, &format!("/api/carts/{cart}")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&admin, &format!("/api/carts/{cart}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Shopper still works: a new cart is created on demand
    let (status, body) = app.get(&client, "/api/carts").await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(body["id"].as_i64().unwrap(), cart);
}

#[tokio::test]
async fn test_admin_cart_add_to_unknown_cart() {
    let app = TestApp::spawn().await;
    let product = app.product("CART-404", "15.00", 5).await;
    let admin = app.admin("carts2@riffhouse.example").await;

    let (status, body) = app
        .post(&admin, &format!("/api/carts/9999/product/{}", product.id), json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Cart not found");
}
