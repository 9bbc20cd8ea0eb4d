//! User administration service
//!
//! Admins create and manage the non-admin accounts: distributors (with
//! their price mode), production, billing and warehouse users.

use bcrypt::{hash, DEFAULT_COST};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{FromRow, PgPool};

use shared::models::user::{Role, User, UserStatus};
use shared::types::{PriceMode, WarehouseKey};
use shared::validation::{validate_email, validate_password, validate_phone};

use crate::error::{AppError, AppResult};

/// User administration service
#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

/// Account row as stored
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: String,
    pub nombre: String,
    pub correo_electronico: String,
    pub phone: Option<String>,
    pub pais: Option<String>,
    pub rol: String,
    pub estado: String,
    pub tipo_precio: Option<String>,
    pub cdi: Option<String>,
    pub unidades_individuales: bool,
    pub hashed_password: String,
    pub fecha_ultimo_acceso: Option<DateTime<Utc>>,
    pub admin_id: Option<String>,
}

pub const USER_COLUMNS: &str = "id, nombre, correo_electronico, phone, pais, rol, estado, \
     tipo_precio, cdi, unidades_individuales, hashed_password, fecha_ultimo_acceso, admin_id";

impl UserRow {
    pub fn rol(&self) -> AppResult<Role> {
        Role::parse(&self.rol)
            .ok_or_else(|| AppError::Internal(format!("unknown role in store: {}", self.rol)))
    }

    pub fn tipo_precio(&self) -> AppResult<Option<PriceMode>> {
        self.tipo_precio
            .as_deref()
            .map(|raw| PriceMode::parse(raw).map_err(AppError::from))
            .transpose()
    }

    pub fn cdi(&self) -> Option<WarehouseKey> {
        self.cdi.as_deref().map(WarehouseKey::new)
    }

    pub fn is_activo(&self) -> bool {
        self.estado == "Activo"
    }

    pub fn into_user(self) -> AppResult<User> {
        let rol = self.rol()?;
        let tipo_precio = self.tipo_precio()?;
        Ok(User {
            cdi: self.cdi(),
            id: self.id,
            nombre: self.nombre,
            correo_electronico: self.correo_electronico,
            phone: self.phone,
            pais: self.pais,
            rol,
            estado: if self.estado == "Activo" {
                UserStatus::Activo
            } else {
                UserStatus::Inactivo
            },
            tipo_precio,
            unidades_individuales: self.unidades_individuales,
            fecha_ultimo_acceso: self.fecha_ultimo_acceso,
            admin_id: self.admin_id,
        })
    }
}

/// Input for creating a user
#[derive(Debug, Deserialize)]
pub struct CreateUserInput {
    pub nombre: String,
    pub correo_electronico: String,
    pub password: String,
    pub rol: Role,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub pais: Option<String>,
    #[serde(default)]
    pub tipo_precio: Option<PriceMode>,
    #[serde(default)]
    pub cdi: Option<WarehouseKey>,
    #[serde(default)]
    pub unidades_individuales: bool,
}

/// Input for the open admin registration endpoint
#[derive(Debug, Deserialize)]
pub struct RegisterAdminInput {
    pub nombre: String,
    pub correo_electronico: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub pais: Option<String>,
}

/// Input for updating a user; absent fields are left unchanged
#[derive(Debug, Deserialize)]
pub struct UpdateUserInput {
    pub nombre: Option<String>,
    pub phone: Option<String>,
    pub pais: Option<String>,
    pub rol: Option<Role>,
    pub tipo_precio: Option<PriceMode>,
    pub cdi: Option<WarehouseKey>,
    pub unidades_individuales: Option<bool>,
    pub password: Option<String>,
}

impl UserService {
    /// Create a new UserService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Look up an account by email (login identity)
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE correo_electronico = $1",
            USER_COLUMNS
        ))
        .bind(email.to_lowercase())
        .fetch_optional(&self.db)
        .await?;

        Ok(row)
    }

    /// Register an administrator account (open endpoint, used to
    /// bootstrap the system).
    pub async fn register_admin(&self, input: RegisterAdminInput) -> AppResult<User> {
        let correo = input.correo_electronico.trim().to_lowercase();
        validate_email(&correo).map_err(|msg| validation("correo_electronico", msg))?;
        validate_password(&input.password).map_err(|msg| validation("password", msg))?;

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE correo_electronico = $1",
        )
        .bind(&correo)
        .fetch_one(&self.db)
        .await?;
        if existing > 0 {
            return Err(AppError::DuplicateEntry("correo_electronico".into()));
        }

        let hashed = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let id = self.next_user_id().await?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (
                id, nombre, correo_electronico, phone, pais, rol, estado,
                unidades_individuales, hashed_password, fecha_ultimo_acceso
            )
            VALUES ($1, $2, $3, $4, $5, 'Admin', 'Activo', FALSE, $6, NOW())
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&id)
        .bind(input.nombre.trim())
        .bind(&correo)
        .bind(&input.phone)
        .bind(&input.pais)
        .bind(&hashed)
        .fetch_one(&self.db)
        .await?;

        row.into_user()
    }

    /// Create a non-admin account. Only admins may call this.
    pub async fn create_user(&self, admin_id: &str, input: CreateUserInput) -> AppResult<User> {
        if input.rol == Role::Admin {
            return Err(AppError::Forbidden("crear otros administradores".into()));
        }

        let correo = input.correo_electronico.trim().to_lowercase();
        validate_email(&correo).map_err(|msg| validation("correo_electronico", msg))?;
        validate_password(&input.password).map_err(|msg| validation("password", msg))?;
        if let Some(phone) = input.phone.as_deref() {
            validate_phone(phone).map_err(|msg| validation("phone", msg))?;
        }
        User::validate_price_mode(input.rol, input.tipo_precio)
            .map_err(|msg| validation("tipo_precio", msg))?;

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE correo_electronico = $1",
        )
        .bind(&correo)
        .fetch_one(&self.db)
        .await?;
        if existing > 0 {
            return Err(AppError::DuplicateEntry("correo_electronico".into()));
        }

        let hashed = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let id = self.next_user_id().await?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (
                id, nombre, correo_electronico, phone, pais, rol, estado,
                tipo_precio, cdi, unidades_individuales, hashed_password,
                fecha_ultimo_acceso, admin_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'Activo', $7, $8, $9, $10, NOW(), $11)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&id)
        .bind(input.nombre.trim())
        .bind(&correo)
        .bind(&input.phone)
        .bind(&input.pais)
        .bind(input.rol.as_str())
        .bind(input.tipo_precio.map(|m| m.as_str()))
        .bind(input.cdi.as_ref().map(|w| w.as_str().to_string()))
        .bind(input.unidades_individuales)
        .bind(&hashed)
        .bind(admin_id)
        .fetch_one(&self.db)
        .await?;

        row.into_user()
    }

    /// List every non-admin account
    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE rol <> 'Admin' ORDER BY id",
            USER_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    /// Update an account. Role changes re-apply the price-mode rules.
    pub async fn update_user(&self, user_id: &str, input: UpdateUserInput) -> AppResult<User> {
        let existing = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Usuario".into()))?;

        let rol = input.rol.unwrap_or(existing.rol()?);
        if rol == Role::Admin {
            return Err(AppError::Forbidden("convertir usuarios en administradores".into()));
        }

        // A role change away from distributor drops the price mode.
        let tipo_precio = if rol.is_distribuidor() {
            input.tipo_precio.or(existing.tipo_precio()?)
        } else {
            None
        };
        User::validate_price_mode(rol, tipo_precio)
            .map_err(|msg| validation("tipo_precio", msg))?;

        let hashed = match input.password.as_deref() {
            Some(password) => {
                validate_password(password).map_err(|msg| validation("password", msg))?;
                hash(password, DEFAULT_COST)
                    .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?
            }
            None => existing.hashed_password.clone(),
        };

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users SET
                nombre = $2,
                phone = $3,
                pais = $4,
                rol = $5,
                tipo_precio = $6,
                cdi = $7,
                unidades_individuales = $8,
                hashed_password = $9
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(input.nombre.unwrap_or(existing.nombre))
        .bind(input.phone.or(existing.phone))
        .bind(input.pais.or(existing.pais))
        .bind(rol.as_str())
        .bind(tipo_precio.map(|m| m.as_str()))
        .bind(
            input
                .cdi
                .map(|w| w.as_str().to_string())
                .or(existing.cdi),
        )
        .bind(input.unidades_individuales.unwrap_or(existing.unidades_individuales))
        .bind(&hashed)
        .fetch_one(&self.db)
        .await?;

        row.into_user()
    }

    /// Flip an account between Activo and Inactivo
    pub async fn toggle_status(&self, user_id: &str) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET estado = CASE WHEN estado = 'Activo' THEN 'Inactivo' ELSE 'Activo' END
            WHERE id = $1 AND rol <> 'Admin'
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Usuario".into()))?;

        row.into_user()
    }

    /// Remove an account
    pub async fn delete_user(&self, user_id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1 AND rol <> 'Admin'")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Usuario".into()));
        }

        Ok(())
    }

    /// Next sequential account id ("U001", "U002", ...)
    async fn next_user_id(&self) -> AppResult<String> {
        let last = sqlx::query_scalar::<_, Option<String>>(
            "SELECT MAX(id) FROM users WHERE id LIKE 'U%'",
        )
        .fetch_one(&self.db)
        .await?;

        Ok(next_sequential_id("U", last.as_deref()))
    }
}

/// Compute the next id in a "<prefix><number>" sequence, tolerating ids
/// whose numeric tail fails to parse.
pub fn next_sequential_id(prefix: &str, last: Option<&str>) -> String {
    let next = last
        .and_then(|id| id.strip_prefix(prefix))
        .and_then(|tail| tail.parse::<u32>().ok())
        .unwrap_or(0)
        + 1;
    format!("{}{:03}", prefix, next)
}

fn validation(field: &str, message: &'static str) -> AppError {
    AppError::Validation {
        field: field.to_string(),
        message: message.to_string(),
        message_es: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_start_at_one() {
        assert_eq!(next_sequential_id("U", None), "U001");
        assert_eq!(next_sequential_id("P", None), "P001");
    }

    #[test]
    fn sequential_ids_increment() {
        assert_eq!(next_sequential_id("U", Some("U041")), "U042");
        assert_eq!(next_sequential_id("P", Some("P999")), "P1000");
    }

    #[test]
    fn malformed_last_id_restarts_the_sequence() {
        assert_eq!(next_sequential_id("U", Some("legacy")), "U001");
    }
}
