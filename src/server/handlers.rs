//! HTTP handlers: the boundary layer between axum and the store.
//!
//! Handlers parse input, call exactly one store operation, and return its
//! result. Status-code mapping lives on `StoreError::into_response`, not
//! here.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::core::error::{StoreError, StoreResult};
use crate::core::order::{Order, OrderRequest};
use crate::core::product::{NewProduct, Product, ProductPatch};
use crate::storage::Store;

/// Shared handler state: the store is the only dependency, passed in
/// explicitly at router construction.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
}

/// Unwrap a JSON body, turning axum's rejection into a validation error so
/// malformed and missing-field payloads consistently report as 400.
fn require_json<T>(payload: Result<Json<T>, JsonRejection>) -> StoreResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| StoreError::validation(rejection.body_text()))
}

pub async fn list_products(State(state): State<AppState>) -> StoreResult<Json<Vec<Product>>> {
    state.store.list_products().await.map(Json)
}

pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> StoreResult<(StatusCode, Json<Value>)> {
    let product = require_json(payload)?;
    let id = state.store.insert_product(product).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<ProductPatch>, JsonRejection>,
) -> StoreResult<Json<Product>> {
    let patch = require_json(payload)?;
    state.store.update_product(id, patch).await.map(Json)
}

pub async fn list_orders(State(state): State<AppState>) -> StoreResult<Json<Vec<Order>>> {
    state.store.list_orders().await.map(Json)
}

pub async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> StoreResult<(StatusCode, Json<Value>)> {
    let request = require_json(payload)?;
    let order = state.store.place_order(request).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": order.id }))))
}

#[derive(Deserialize)]
pub struct SearchParams {
    q: Option<String>,
}

pub async fn search_products(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> StoreResult<Json<Vec<Product>>> {
    let q = params
        .q
        .ok_or_else(|| StoreError::validation("missing required query parameter 'q'"))?;
    state.store.search_products(&q).await.map(Json)
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "storefront"
    }))
}

pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Sorry, can't find that!")
}
