//! HTTP handlers for the Distribution Order Management backend

pub mod auth;
pub mod health;
pub mod orders;
pub mod products;
pub mod reporting;
pub mod users;

pub use auth::*;
pub use health::*;
pub use orders::*;
pub use products::*;
pub use reporting::*;
pub use users::*;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::users::{UserRow, UserService};
use crate::AppState;

/// Resolve the calling admin's account row, rejecting every other role.
pub(crate) async fn require_admin(state: &AppState, actor: &AuthUser) -> AppResult<UserRow> {
    if actor.rol != shared::models::user::Role::Admin {
        return Err(AppError::Forbidden("realizar esta acción".into()));
    }
    UserService::new(state.db.clone())
        .find_by_email(&actor.email)
        .await?
        .ok_or_else(|| AppError::NotFound("Administrador".into()))
}
