//! HTTP handlers for dashboard reporting endpoints

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::reporting::{GeneralStats, PopularProduct, RecentOrder, ReportingService};
use crate::AppState;

/// General dashboard counters
pub async fn general_stats(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<GeneralStats>> {
    let service = ReportingService::new(state.db.clone(), state.config.clone());
    let stats = service.general_stats(&current_user.0).await?;
    Ok(Json(stats))
}

/// Five most recent orders visible to the caller
pub async fn recent_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<RecentOrder>>> {
    let service = ReportingService::new(state.db.clone(), state.config.clone());
    let orders = service.recent_orders(&current_user.0).await?;
    Ok(Json(orders))
}

/// Best-selling products of the current month
pub async fn popular_products(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<PopularProduct>>> {
    let service = ReportingService::new(state.db.clone(), state.config.clone());
    let products = service.popular_products(&current_user.0).await?;
    Ok(Json(products))
}
