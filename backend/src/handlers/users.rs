//! HTTP handlers for user administration endpoints (admins only)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use shared::models::user::User;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::users::{CreateUserInput, UpdateUserInput, UserService};
use crate::AppState;

use super::require_admin;

/// Create a user with one of the non-admin roles
pub async fn create_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateUserInput>,
) -> AppResult<(StatusCode, Json<User>)> {
    let admin = require_admin(&state, &current_user.0).await?;
    let service = UserService::new(state.db.clone());
    let user = service.create_user(&admin.id, input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// List every non-admin user
pub async fn list_users(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<User>>> {
    require_admin(&state, &current_user.0).await?;
    let service = UserService::new(state.db.clone());
    let users = service.list_users().await?;
    Ok(Json(users))
}

/// Update a user
pub async fn update_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<String>,
    Json(input): Json<UpdateUserInput>,
) -> AppResult<Json<User>> {
    require_admin(&state, &current_user.0).await?;
    let service = UserService::new(state.db.clone());
    let user = service.update_user(&user_id, input).await?;
    Ok(Json(user))
}

/// Flip a user between Activo and Inactivo
pub async fn toggle_user_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<User>> {
    require_admin(&state, &current_user.0).await?;
    let service = UserService::new(state.db.clone());
    let user = service.toggle_status(&user_id).await?;
    Ok(Json(user))
}

/// Remove a user
pub async fn delete_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    require_admin(&state, &current_user.0).await?;
    let service = UserService::new(state.db.clone());
    service.delete_user(&user_id).await?;
    Ok(Json(
        serde_json::json!({"message": "Usuario eliminado exitosamente"}),
    ))
}
