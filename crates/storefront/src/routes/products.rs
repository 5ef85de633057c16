//! Product route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use riffhouse_core::ProductId;

use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::error::Result;
use crate::middleware::{OptionalAuth, RequireAdmin};
use crate::models::{ProductPage, ProductQuery, ProductSort};
use crate::services::ProductDraft;
use crate::state::AppState;

/// Query parameters for the product listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub category: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub sort: ProductSort,
}

/// Product listing.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<ProductPage>> {
    let query = ProductQuery::new(params.category, params.sort, params.page, params.limit);
    Ok(Json(state.catalog().list(&query).await?))
}

pub async fn categories(State(state): State<AppState>) -> Result<Json<Value>> {
    let categories = state.catalog().categories().await?;
    Ok(Json(json!({ "categories": categories })))
}

/// Product detail. Archived products are only visible to admins.
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<Value>> {
    let include_archived = user.is_some_and(|u| u.role.is_admin());
    let product = state.catalog().get(id, include_archived).await?;
    Ok(Json(json!({ "product": product })))
}

#[instrument(skip(state, admin, draft), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(draft): ApiJson<ProductDraft>,
) -> Result<(StatusCode, Json<Value>)> {
    let product = state.catalog().create(draft).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Product created", "product": product })),
    ))
}

#[instrument(skip(state, admin, draft), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(draft): ApiJson<ProductDraft>,
) -> Result<Json<Value>> {
    let product = state.catalog().update(id, draft).await?;
    Ok(Json(json!({ "message": "Product updated", "product": product })))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<Value>> {
    state.catalog().delete(id).await?;
    Ok(Json(json!({ "message": "Product deleted" })))
}
