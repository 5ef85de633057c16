//! Cart route handlers.
//!
//! Shopper routes act on the logged-in user's own cart. Routes addressed by
//! cart id are for admins only.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use riffhouse_core::{CartId, CartItemId, ProductId};

use super::extract::{ApiJson, ApiPath};
use super::orders::run_checkout;
use crate::error::Result;
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::services::{CartError, CartView};
use crate::state::AppState;

/// Body of `POST /api/carts/add`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItem {
    pub product_id: Option<ProductId>,
    /// Defaults to one unit.
    pub quantity: Option<i64>,
}

/// Body of `PUT /api/carts/update/{itemId}`.
#[derive(Debug, Deserialize)]
pub struct SetQuantity {
    pub quantity: Option<i64>,
}

fn cart_message(message: &str, cart: &CartView) -> Json<Value> {
    Json(json!({ "message": message, "cart": cart }))
}

pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartView>> {
    Ok(Json(state.carts().view(user.id).await?))
}

pub async fn count(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Value>> {
    let count = state.carts().count(user.id).await?;
    Ok(Json(json!({ "count": count })))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<AddItem>,
) -> Result<(StatusCode, Json<Value>)> {
    let product = body
        .product_id
        .ok_or_else(|| CartError::Validation("productId is required".to_owned()))?;
    let cart = state
        .carts()
        .add(user.id, product, body.quantity.unwrap_or(1))
        .await?;
    Ok((StatusCode::CREATED, cart_message("Product added to cart", &cart)))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(item): ApiPath<CartItemId>,
    ApiJson(body): ApiJson<SetQuantity>,
) -> Result<Json<Value>> {
    let quantity = body
        .quantity
        .ok_or_else(|| CartError::Validation("quantity is required".to_owned()))?;
    let cart = state.carts().update(user.id, item, quantity).await?;
    Ok(cart_message("Cart updated", &cart))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(item): ApiPath<CartItemId>,
) -> Result<Json<Value>> {
    let cart = state.carts().remove(user.id, item).await?;
    Ok(cart_message("Product removed from cart", &cart))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Value>> {
    let cart = state.carts().clear(user.id).await?;
    Ok(cart_message("Cart cleared", &cart))
}

/// Check out the logged-in user's cart.
pub async fn finalize(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Value>> {
    let outcome = run_checkout(&state, &user).await?;
    Ok(Json(json!({
        "message": "Purchase completed",
        "ticket": outcome.receipt,
        "purchasedItems": outcome.purchased_items,
        "failedItems": outcome.failed_items,
    })))
}

// =============================================================================
// Admin
// =============================================================================

pub async fn list_all(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Value>> {
    let carts = state.carts().list_all().await?;
    Ok(Json(json!({ "carts": carts })))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiPath(id): ApiPath<CartId>,
) -> Result<Json<CartView>> {
    Ok(Json(state.carts().get_by_id(id).await?))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<CartId>,
) -> Result<Json<Value>> {
    state.carts().delete(id).await?;
    Ok(Json(json!({ "message": "Cart deleted" })))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn add_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath((cart, product)): ApiPath<(CartId, ProductId)>,
) -> Result<Json<Value>> {
    let cart = state.carts().add_product(cart, product, 1).await?;
    Ok(cart_message("Product added to cart", &cart))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn remove_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath((cart, product)): ApiPath<(CartId, ProductId)>,
) -> Result<Json<Value>> {
    let cart = state.carts().remove_product(cart, product).await?;
    Ok(cart_message("Product removed from cart", &cart))
}
