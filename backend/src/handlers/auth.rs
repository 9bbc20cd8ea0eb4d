//! Authentication handlers

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};

use shared::models::user::User;

use crate::error::{AppError, AppResult};
use crate::services::auth::TokenResponse;
use crate::services::users::{RegisterAdminInput, UserService};
use crate::services::AuthService;
use crate::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub exp: i64,
}

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let tokens = auth_service.login(&body.email, &body.password).await?;
    Ok(Json(tokens))
}

/// Admin registration endpoint handler (bootstrap)
pub async fn register_admin(
    State(state): State<AppState>,
    Json(input): Json<RegisterAdminInput>,
) -> AppResult<(StatusCode, Json<User>)> {
    let service = UserService::new(state.db.clone());
    let admin = service.register_admin(input).await?;
    Ok((StatusCode::CREATED, Json(admin)))
}

/// Token validation endpoint handler
pub async fn validate_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<ValidateResponse>> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AppError::InvalidToken)?;

    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let exp = auth_service.validate_token(token)?;
    Ok(Json(ValidateResponse { valid: true, exp }))
}
