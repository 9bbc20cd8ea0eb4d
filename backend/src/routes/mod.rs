//! Route definitions for the Distribution Order Management backend

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        // Protected routes - order lifecycle
        .nest("/orders", order_routes())
        // Protected routes - product catalog
        .nest("/products", product_routes())
        // Protected routes - user administration
        .nest("/users", user_routes())
        // Protected routes - dashboard reporting
        .nest("/reports", reporting_routes())
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/token", post(handlers::login))
        .route("/register", post(handlers::register_admin))
        .route("/validate", get(handlers::validate_token))
}

/// Order lifecycle routes (protected)
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders).post(handlers::create_purchase_order))
        .route("/direct", post(handlers::create_direct_order))
        .route("/:order_id", get(handlers::get_order))
        .route("/:order_id/process", post(handlers::process_order))
        .route("/:order_id/status", put(handlers::set_order_status))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Product catalog routes (protected)
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route("/available", get(handlers::available_products))
        .route("/inventory", get(handlers::inventory))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// User administration routes (protected)
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/:user_id",
            put(handlers::update_user).delete(handlers::delete_user),
        )
        .route("/:user_id/cambiar-estado", put(handlers::toggle_user_status))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Dashboard reporting routes (protected)
fn reporting_routes() -> Router<AppState> {
    Router::new()
        .route("/general", get(handlers::general_stats))
        .route("/recientes", get(handlers::recent_orders))
        .route("/populares", get(handlers::popular_products))
        .route_layer(middleware::from_fn(auth_middleware))
}
