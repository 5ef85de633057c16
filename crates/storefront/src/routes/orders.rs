//! Order handlers. An order is the receipt a checkout produced.

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};
use tracing::instrument;

use riffhouse_core::ReceiptId;

use super::extract::ApiPath;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::CurrentUser;
use crate::services::{Buyer, CheckoutOutcome};
use crate::state::AppState;

/// Check out `user`'s cart. Shared by `/api/orders` and `/api/carts/finalize`.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub(super) async fn run_checkout(state: &AppState, user: &CurrentUser) -> Result<CheckoutOutcome> {
    add_breadcrumb("checkout", "Checkout started", None);
    let outcome = state.checkout().checkout(&Buyer::from(user)).await?;
    Ok(outcome)
}

/// Place an order from the logged-in user's cart.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<(StatusCode, Json<Value>)> {
    let outcome = run_checkout(&state, &user).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Order placed",
            "order": outcome.receipt,
            "ticket": outcome.receipt,
            "purchasedItems": outcome.purchased_items,
            "failedItems": outcome.failed_items,
        })),
    ))
}

/// The logged-in user's orders, newest first.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Value>> {
    let orders = state.repos().receipts.list_for_user(user.id).await?;
    Ok(Json(json!({ "orders": orders })))
}

pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<ReceiptId>,
) -> Result<Json<Value>> {
    let order = state
        .repos()
        .receipts
        .get_for_user(user.id, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_owned()))?;
    Ok(Json(json!({ "order": order })))
}
