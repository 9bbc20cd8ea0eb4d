//! Authentication service for login and token management
//!
//! Accounts of every role share one login endpoint; the issued token
//! carries the email and role claims the rest of the system consumes.

use bcrypt::verify;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use sqlx::PgPool;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::Claims;
use crate::services::users::UserService;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
}

/// Response after a successful login. Besides the token it echoes the
/// account attributes the clients key their navigation on.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub rol: String,
    pub nombre: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pais: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cdi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo_precio: Option<String>,
    pub unidades_individuales: bool,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
        }
    }

    /// Authenticate with email and password
    pub async fn login(&self, email: &str, password: &str) -> AppResult<TokenResponse> {
        let users = UserService::new(self.db.clone());
        let user = users
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !user.is_activo() {
            return Err(AppError::Unauthorized {
                message: "Account is disabled".to_string(),
                message_es: "La cuenta está desactivada".to_string(),
            });
        }

        let valid = verify(password, &user.hashed_password)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        // Stamp last access
        sqlx::query("UPDATE users SET fecha_ultimo_acceso = NOW() WHERE id = $1")
            .bind(&user.id)
            .execute(&self.db)
            .await?;

        let access_token = self.generate_token(
            &user.correo_electronico,
            &user.rol,
            &user.nombre,
            user.pais.as_deref(),
        )?;

        Ok(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
            rol: user.rol,
            nombre: user.nombre,
            email: user.correo_electronico,
            pais: user.pais,
            cdi: user.cdi,
            tipo_precio: user.tipo_precio,
            unidades_individuales: user.unidades_individuales,
        })
    }

    /// Validate an access token and return its expiry
    pub fn validate_token(&self, token: &str) -> AppResult<i64> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        Ok(data.claims.exp)
    }

    /// Generate a signed access token
    fn generate_token(
        &self,
        email: &str,
        rol: &str,
        nombre: &str,
        pais: Option<&str>,
    ) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_token_expiry);

        let claims = Claims {
            sub: email.to_string(),
            rol: rol.to_string(),
            nombre: Some(nombre.to_string()),
            pais: pais.map(str::to_string),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }
}
