//! HTTP handlers for order lifecycle endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use shared::models::order::{Order, OrderKind, ProcessRequest};

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::orders::{CreateOrderPayload, OrderService};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListOrdersParams {
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub nuevo_estado: String,
}

/// Create a purchase order (distributors only)
pub async fn create_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(payload): Json<CreateOrderPayload>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let service = OrderService::new(state.db.clone(), state.config.clone());
    let order = service
        .create_order(&current_user.0, OrderKind::OrdenCompra, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Create a direct order, dispatched without the purchase-order step
pub async fn create_direct_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(payload): Json<CreateOrderPayload>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let service = OrderService::new(state.db.clone(), state.config.clone());
    let order = service
        .create_order(&current_user.0, OrderKind::Pedido, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// List orders visible to the caller, optionally narrowed by kind
pub async fn list_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(params): Query<ListOrdersParams>,
) -> AppResult<Json<Vec<Order>>> {
    let kind = params
        .kind
        .as_deref()
        .map(|raw| {
            OrderKind::parse(raw).ok_or_else(|| AppError::Validation {
                field: "kind".into(),
                message: format!("Unknown order kind '{}'", raw),
                message_es: format!("Tipo de orden desconocido '{}'", raw),
            })
        })
        .transpose()?;

    let service = OrderService::new(state.db.clone(), state.config.clone());
    let orders = service.list_orders(&current_user.0, kind).await?;
    Ok(Json(orders))
}

/// Get one order
pub async fn get_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<String>,
) -> AppResult<Json<Order>> {
    let service = OrderService::new(state.db.clone(), state.config.clone());
    let order = service.get_order(&current_user.0, &order_id).await?;
    Ok(Json(order))
}

/// Process a purchase order with final quantities (warehouse actors)
pub async fn process_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<String>,
    Json(request): Json<ProcessRequest>,
) -> AppResult<Json<Order>> {
    let service = OrderService::new(state.db.clone(), state.config.clone());
    let order = service
        .process_order(&current_user.0, &order_id, request)
        .await?;
    Ok(Json(order))
}

/// Flip a dispatched order to invoiced / in transit
pub async fn set_order_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<String>,
    Json(request): Json<SetStatusRequest>,
) -> AppResult<Json<Order>> {
    let service = OrderService::new(state.db.clone(), state.config.clone());
    let order = service
        .set_status(&current_user.0, &order_id, &request.nuevo_estado)
        .await?;
    Ok(Json(order))
}
