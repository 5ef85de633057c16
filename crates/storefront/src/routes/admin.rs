//! Admin panel API: stock levels and receipts.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use riffhouse_core::{ProductId, ReceiptCode};

use super::extract::{ApiJson, ApiPath};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// How many receipts the ticket listing returns.
const RECENT_TICKETS: u32 = 100;

/// Body of `POST /admin/stock/update`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdate {
    pub product_id: Option<ProductId>,
    pub new_stock: Option<i64>,
}

pub async fn categories(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Value>> {
    let categories = state.catalog().categories().await?;
    Ok(Json(json!({ "categories": categories })))
}

/// Set a product's absolute stock level.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn update_stock(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(body): ApiJson<StockUpdate>,
) -> Result<Json<Value>> {
    let product = state
        .stock()
        .set_stock(body.product_id, body.new_stock)
        .await?;
    Ok(Json(json!({ "message": "Stock updated", "product": product })))
}

pub async fn tickets(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Value>> {
    let tickets = state.repos().receipts.list_recent(RECENT_TICKETS).await?;
    Ok(Json(json!({ "tickets": tickets })))
}

pub async fn ticket(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiPath(code): ApiPath<String>,
) -> Result<Json<Value>> {
    let not_found = || AppError::NotFound("Ticket not found".to_owned());
    let code = ReceiptCode::parse(&code).ok_or_else(not_found)?;
    let ticket = state
        .repos()
        .receipts
        .get_by_code(&code)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(json!({ "ticket": ticket })))
}
