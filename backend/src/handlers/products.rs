//! HTTP handlers for product catalog endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use shared::models::product::Product;
use shared::models::user::Role;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::products::{
    CatalogItem, CreateProductInput, InventoryItem, ProductService, UpdateProductInput,
};
use crate::services::users::UserService;
use crate::AppState;

use super::require_admin;

/// Catalog response: distributors get their single-price view, everyone
/// else the full product records.
#[derive(Serialize)]
#[serde(untagged)]
pub enum CatalogResponse {
    Distribuidor(Vec<CatalogItem>),
    Completo(Vec<Product>),
}

fn product_service(state: &AppState) -> ProductService {
    ProductService::new(state.db.clone(), state.config.warehouses.domestic.clone())
}

/// Create a product (admins only)
pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let admin = require_admin(&state, &current_user.0).await?;
    let product = product_service(&state)
        .create_product(&admin.id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// List the calling admin's products
pub async fn list_products(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Product>>> {
    let admin = require_admin(&state, &current_user.0).await?;
    let products = product_service(&state).list_products(&admin.id).await?;
    Ok(Json(products))
}

/// Catalog of available products, priced per the caller's role
pub async fn available_products(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<CatalogResponse>> {
    let service = product_service(&state);

    if current_user.0.is_distribuidor() {
        let users = UserService::new(state.db.clone());
        let row = users
            .find_by_email(&current_user.0.email)
            .await?
            .ok_or_else(|| AppError::NotFound("Distribuidor".into()))?;
        let tipo_precio = row.tipo_precio()?.ok_or_else(|| AppError::Validation {
            field: "tipo_precio".into(),
            message: "Distributor has no price mode configured".into(),
            message_es: "El distribuidor no tiene configurado un tipo de precio".into(),
        })?;
        let bodega = state.config.warehouses.for_price_mode(tipo_precio);
        let catalog = service.catalog_for_distributor(tipo_precio, bodega).await?;
        return Ok(Json(CatalogResponse::Distribuidor(catalog)));
    }

    let products = service.list_active().await?;
    Ok(Json(CatalogResponse::Completo(products)))
}

/// Get one product with its per-warehouse stock
pub async fn get_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<String>,
) -> AppResult<Json<Product>> {
    let product = product_service(&state).get_product(&product_id).await?;
    Ok(Json(product))
}

/// Update a product (admins only)
pub async fn update_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<String>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    require_admin(&state, &current_user.0).await?;
    let product = product_service(&state)
        .update_product(&product_id, input)
        .await?;
    Ok(Json(product))
}

/// Deactivate a product (admins only). Products are never hard-deleted.
pub async fn delete_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    require_admin(&state, &current_user.0).await?;
    product_service(&state).deactivate_product(&product_id).await?;
    Ok(Json(
        serde_json::json!({"message": "Producto desactivado exitosamente"}),
    ))
}

/// Inventory dashboard: admin sees every warehouse, a warehouse actor
/// sees only their own location
pub async fn inventory(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<InventoryItem>>> {
    let service = product_service(&state);

    match current_user.0.rol {
        Role::Admin => {
            let items = service.inventory(None).await?;
            Ok(Json(items))
        }
        Role::Bodega => {
            let users = UserService::new(state.db.clone());
            let row = users
                .find_by_email(&current_user.0.email)
                .await?
                .ok_or_else(|| AppError::NotFound("Bodega".into()))?;
            let cdi = row.cdi().ok_or_else(|| AppError::Validation {
                field: "cdi".into(),
                message: "Warehouse account has no location assigned".into(),
                message_es: "La bodega no tiene un CDI asignado".into(),
            })?;
            let items = service.inventory(Some(&cdi)).await?;
            Ok(Json(items))
        }
        _ => Err(AppError::Forbidden("ver el inventario".into())),
    }
}
