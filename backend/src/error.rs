//! Error handling for the Distribution Order Management backend
//!
//! Provides consistent error responses in English and Spanish

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use shared::models::order::{InvalidStatus, OrderBuildError};
use shared::types::InvalidPriceMode;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String, message_es: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_es: String,
    },

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Insufficient stock for {producto}: available {disponible}, requested {solicitado}")]
    InsufficientStock {
        producto: String,
        disponible: i64,
        solicitado: u32,
    },

    #[error("Invalid price mode: {0}")]
    InvalidPriceMode(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_es: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "INVALID_CREDENTIALS".to_string(),
                    message_en: "Invalid email or password".to_string(),
                    message_es: "Correo o contraseña incorrectos".to_string(),
                    field: None,
                },
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "INVALID_TOKEN".to_string(),
                    message_en: "Invalid or expired token".to_string(),
                    message_es: "Token inválido o expirado".to_string(),
                    field: None,
                },
            ),
            AppError::Unauthorized { message, message_es } => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "UNAUTHORIZED".to_string(),
                    message_en: message.clone(),
                    message_es: message_es.clone(),
                    field: None,
                },
            ),
            AppError::Forbidden(action) => (
                StatusCode::FORBIDDEN,
                ErrorDetail {
                    code: "FORBIDDEN".to_string(),
                    message_en: format!("Your role is not allowed to {}", action),
                    message_es: format!("Tu rol no tiene permisos para {}", action),
                    field: None,
                },
            ),
            AppError::Validation { field, message, message_es } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: message.clone(),
                    message_es: message_es.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::DuplicateEntry(field) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "DUPLICATE_ENTRY".to_string(),
                    message_en: format!("A record with this {} already exists", field),
                    message_es: format!("Ya existe un registro con este {}", field),
                    field: Some(field.clone()),
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message_en: format!("{} not found", resource),
                    message_es: format!("{} no encontrado", resource),
                    field: None,
                },
            ),
            AppError::InsufficientStock { producto, disponible, solicitado } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INSUFFICIENT_STOCK".to_string(),
                    message_en: format!(
                        "Insufficient stock for {}: available {}, requested {}",
                        producto, disponible, solicitado
                    ),
                    message_es: format!(
                        "Stock insuficiente para {}: disponible {}, solicitado {}",
                        producto, disponible, solicitado
                    ),
                    field: Some(producto.clone()),
                },
            ),
            AppError::InvalidPriceMode(mode) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "INVALID_PRICE_MODE".to_string(),
                    message_en: format!("Invalid price mode: {}", mode),
                    message_es: format!("Tipo de precio no válido: {}", mode),
                    field: None,
                },
            ),
            AppError::InvalidStatus(status) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "INVALID_STATUS".to_string(),
                    message_en: format!("Invalid status: {}", status),
                    message_es: format!("Estado no válido: {}", status),
                    field: None,
                },
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "DATABASE_ERROR".to_string(),
                    message_en: "A database error occurred".to_string(),
                    message_es: "Ocurrió un error de base de datos".to_string(),
                    field: None,
                },
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: msg.clone(),
                    message_es: "Error interno del servidor".to_string(),
                    field: None,
                },
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: "An internal server error occurred".to_string(),
                    message_es: "Error interno del servidor".to_string(),
                    field: None,
                },
            ),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

impl From<OrderBuildError> for AppError {
    fn from(err: OrderBuildError) -> Self {
        match err {
            OrderBuildError::ProductoNoEncontrado(id) => {
                AppError::NotFound(format!("Producto {}", id))
            }
            OrderBuildError::StockInsuficiente {
                producto,
                disponible,
                solicitado,
            } => AppError::InsufficientStock {
                producto,
                disponible,
                solicitado,
            },
        }
    }
}

impl From<InvalidPriceMode> for AppError {
    fn from(err: InvalidPriceMode) -> Self {
        AppError::InvalidPriceMode(err.0)
    }
}

impl From<InvalidStatus> for AppError {
    fn from(err: InvalidStatus) -> Self {
        AppError::InvalidStatus(err.0)
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
