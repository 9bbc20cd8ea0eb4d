//! Dashboard reporting service
//!
//! Aggregate queries over the order history: general counters, the most
//! recent orders and the month's best-selling products. Warehouse actors
//! see only the price modes their location serves.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;

use shared::models::user::Role;
use shared::types::{PriceMode, WarehouseKey};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::users::UserService;

/// Dashboard reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
    config: Arc<Config>,
}

/// General statistics response
#[derive(Debug, Serialize)]
pub struct GeneralStats {
    pub pedidos_totales: i64,
    pub total_productos: i64,
    pub total_distribuidores: i64,
    pub ventas_mensuales: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cdi: Option<WarehouseKey>,
    pub fecha_consulta: DateTime<Utc>,
}

/// One row of the recent-orders widget
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct RecentOrder {
    pub id: String,
    pub fecha: DateTime<Utc>,
    pub estado: String,
    pub tipo_precio: String,
    pub distribuidor_nombre: String,
    pub total: Decimal,
}

/// One row of the popular-products widget
#[derive(Debug, Serialize)]
pub struct PopularProduct {
    pub id: String,
    pub nombre: String,
    pub categoria: String,
    pub precio: Decimal,
    pub vendidos: i64,
    pub num_pedidos: i64,
    pub stock_total: i64,
    pub activo: bool,
    pub imagen: String,
    pub en_produccion: bool,
}

impl ReportingService {
    /// Create a new ReportingService instance
    pub fn new(db: PgPool, config: Arc<Config>) -> Self {
        Self { db, config }
    }

    /// General dashboard counters. Only warehouse actors get a scoped
    /// view; everyone else sees global numbers.
    pub async fn general_stats(&self, actor: &AuthUser) -> AppResult<GeneralStats> {
        let scope = self.scope_for(actor).await?;
        let (modes, cdi) = match &scope {
            Some((modes, cdi)) => (Some(mode_strings(modes)), Some(cdi.clone())),
            None => (None, None),
        };

        let pedidos_totales = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM orders WHERE ($1::text[] IS NULL OR tipo_precio = ANY($1))",
        )
        .bind(&modes)
        .fetch_one(&self.db)
        .await?;

        let total_productos =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE activo = TRUE")
                .fetch_one(&self.db)
                .await?;

        let total_distribuidores = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE rol LIKE 'distribuidor%'",
        )
        .fetch_one(&self.db)
        .await?;

        let ventas_mensuales = sqlx::query_scalar::<_, Option<Decimal>>(
            r#"
            SELECT SUM((p->>'cantidad')::numeric * (p->>'precio')::numeric)
            FROM orders o, jsonb_array_elements(o.productos) p
            WHERE o.estado = 'facturado'
              AND o.fecha >= date_trunc('month', NOW())
              AND ($1::text[] IS NULL OR o.tipo_precio = ANY($1))
            "#,
        )
        .bind(&modes)
        .fetch_one(&self.db)
        .await?
        .unwrap_or(Decimal::ZERO);

        Ok(GeneralStats {
            pedidos_totales,
            total_productos,
            total_distribuidores,
            ventas_mensuales,
            cdi,
            fecha_consulta: Utc::now(),
        })
    }

    /// The five most recent orders visible to the actor.
    pub async fn recent_orders(&self, actor: &AuthUser) -> AppResult<Vec<RecentOrder>> {
        let scope = self.scope_for(actor).await?;
        let modes = scope.as_ref().map(|(modes, _)| mode_strings(modes));

        let rows = sqlx::query_as::<_, RecentOrder>(
            r#"
            SELECT id, fecha, estado, tipo_precio, distribuidor_nombre, total
            FROM orders
            WHERE ($1::text[] IS NULL OR tipo_precio = ANY($1))
            ORDER BY fecha DESC
            LIMIT 5
            "#,
        )
        .bind(&modes)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Top five products of the current month by invoiced quantity.
    /// Production actors only see products flagged as in production.
    pub async fn popular_products(&self, actor: &AuthUser) -> AppResult<Vec<PopularProduct>> {
        if actor.rol == Role::Facturacion {
            return Err(AppError::Forbidden("ver productos populares".into()));
        }

        let scope = self.scope_for(actor).await?;
        let modes = scope.as_ref().map(|(modes, _)| mode_strings(modes));

        let aggregated = sqlx::query_as::<_, (String, String, Decimal, i64, i64)>(
            r#"
            SELECT p->>'id' AS id,
                   MAX(p->>'nombre') AS nombre,
                   AVG((p->>'precio')::numeric) AS precio,
                   SUM((p->>'cantidad')::bigint)::bigint AS vendidos,
                   COUNT(*) AS num_pedidos
            FROM orders o, jsonb_array_elements(o.productos) p
            WHERE o.estado = 'facturado'
              AND o.fecha >= date_trunc('month', NOW())
              AND (p->>'cantidad')::bigint > 0
              AND ($1::text[] IS NULL OR o.tipo_precio = ANY($1))
            GROUP BY p->>'id'
            ORDER BY vendidos DESC
            LIMIT 5
            "#,
        )
        .bind(&modes)
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<String> = aggregated.iter().map(|r| r.0.clone()).collect();
        let details = sqlx::query_as::<_, (String, String, bool, String, bool, Option<i64>)>(
            r#"
            SELECT pr.id, pr.categoria, pr.activo, pr.imagen, pr.en_produccion,
                   (SELECT SUM(cantidad)::bigint FROM product_stock ps WHERE ps.product_id = pr.id)
            FROM products pr
            WHERE pr.id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        let mut products: Vec<PopularProduct> = aggregated
            .into_iter()
            .filter_map(|(id, nombre, precio, vendidos, num_pedidos)| {
                let detail = details.iter().find(|d| d.0 == id)?;
                Some(PopularProduct {
                    id,
                    nombre,
                    categoria: detail.1.clone(),
                    precio,
                    vendidos,
                    num_pedidos,
                    stock_total: detail.5.unwrap_or(0),
                    activo: detail.2,
                    imagen: detail.3.clone(),
                    en_produccion: detail.4,
                })
            })
            .collect();

        if actor.rol == Role::Produccion {
            products.retain(|p| p.en_produccion);
        }

        Ok(products)
    }

    /// Warehouse actors are scoped to the price modes their location
    /// serves; every other role sees everything.
    async fn scope_for(
        &self,
        actor: &AuthUser,
    ) -> AppResult<Option<(Vec<PriceMode>, WarehouseKey)>> {
        if actor.rol != Role::Bodega {
            return Ok(None);
        }

        let users = UserService::new(self.db.clone());
        let row = users
            .find_by_email(&actor.email)
            .await?
            .ok_or_else(|| AppError::NotFound("Bodega".into()))?;
        let cdi = row.cdi().ok_or_else(|| AppError::Validation {
            field: "cdi".into(),
            message: "Warehouse account has no location assigned".into(),
            message_es: "La bodega no tiene un CDI asignado".into(),
        })?;

        let modes = self.config.warehouses.price_modes_for(&cdi);
        if modes.is_empty() {
            return Err(AppError::Validation {
                field: "cdi".into(),
                message: format!("Unknown warehouse location '{}'", cdi),
                message_es: "CDI de bodega no válido".into(),
            });
        }

        Ok(Some((modes, cdi)))
    }
}

fn mode_strings(modes: &[PriceMode]) -> Vec<String> {
    modes.iter().map(|m| m.as_str().to_string()).collect()
}
