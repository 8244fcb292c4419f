//! Order CRUD endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use fabtrack_common::db::models::Order;
use serde::{Deserialize, Serialize};

use crate::db;
use crate::db::orders::{NewOrderItem, OrderWithItems};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub client_id: i64,
    pub reference: String,
    pub notes: Option<String>,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersParams {
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

#[derive(Debug, Serialize)]
pub struct ListOrdersResponse {
    pub orders: Vec<Order>,
    pub page: i64,
    pub total_pages: i64,
}

/// POST /api/orders
///
/// Creates the order and all of its items atomically.
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> ApiResult<(StatusCode, Json<OrderWithItems>)> {
    if request.reference.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "order reference must not be empty".to_string(),
        ));
    }

    let order = db::orders::create_order(
        &state.db,
        request.client_id,
        request.reference.trim(),
        request.notes.as_deref(),
        &request.items,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/orders?page=N
pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<ListOrdersParams>,
) -> ApiResult<Json<ListOrdersResponse>> {
    let (orders, pagination) = db::orders::list_orders(&state.db, params.page).await?;

    Ok(Json(ListOrdersResponse {
        orders,
        page: pagination.page,
        total_pages: pagination.total_pages,
    }))
}

/// GET /api/orders/:id
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<OrderWithItems>> {
    let order = db::orders::get_order(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("order {} not found", id)))?;

    Ok(Json(order))
}

/// DELETE /api/orders/:id
///
/// Cascades to items, progress events, and durations.
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let deleted = db::orders::delete_order(&state.db, id).await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("order {} not found", id)));
    }

    Ok(StatusCode::NO_CONTENT)
}
