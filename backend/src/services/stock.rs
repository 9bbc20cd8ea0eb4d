//! Stock ledger service: the authoritative per-(product, warehouse) counts.
//!
//! Decrements go through a conditional UPDATE so two concurrent
//! reservations against the same counter serialize in the store and can
//! never drive it negative. Order transitions call these methods inside a
//! transaction; rolling the transaction back undoes every reservation of
//! a failed transition.

use sqlx::PgConnection;
use std::collections::BTreeMap;

use shared::models::order::Reservation;
use shared::stock::StockLevels;
use shared::types::WarehouseKey;

use crate::error::{AppError, AppResult};

/// Stock ledger operations. All methods take an explicit connection so
/// callers can compose them into a transaction with the order write.
pub struct StockService;

impl StockService {
    /// Current count for one product at one warehouse; absent rows read
    /// as zero.
    pub async fn get_stock(
        conn: &mut PgConnection,
        product_id: &str,
        bodega: &WarehouseKey,
    ) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT cantidad FROM product_stock WHERE product_id = $1 AND bodega = $2",
        )
        .bind(product_id)
        .bind(bodega.as_str())
        .fetch_optional(conn)
        .await?;

        Ok(count.unwrap_or(0))
    }

    /// All per-warehouse counts for one product.
    pub async fn levels(conn: &mut PgConnection, product_id: &str) -> AppResult<StockLevels> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT bodega, cantidad FROM product_stock WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_all(conn)
        .await?;

        let mut levels = StockLevels::new();
        for (bodega, cantidad) in rows {
            levels.set(WarehouseKey::new(bodega), cantidad);
        }
        Ok(levels)
    }

    /// Per-warehouse counts for a set of products.
    pub async fn levels_many(
        conn: &mut PgConnection,
        product_ids: &[String],
    ) -> AppResult<BTreeMap<String, StockLevels>> {
        let rows = sqlx::query_as::<_, (String, String, i64)>(
            "SELECT product_id, bodega, cantidad FROM product_stock WHERE product_id = ANY($1)",
        )
        .bind(product_ids)
        .fetch_all(conn)
        .await?;

        let mut out: BTreeMap<String, StockLevels> = BTreeMap::new();
        for (product_id, bodega, cantidad) in rows {
            out.entry(product_id)
                .or_default()
                .set(WarehouseKey::new(bodega), cantidad);
        }
        // Products with no stock rows still get an (empty) entry
        for id in product_ids {
            out.entry(id.clone()).or_default();
        }
        Ok(out)
    }

    /// Reserve `cantidad` units, returning the new count. Zero quantities
    /// are a no-op. Fails without mutating anything when the counter
    /// would go negative.
    pub async fn reserve(
        conn: &mut PgConnection,
        product_id: &str,
        bodega: &WarehouseKey,
        cantidad: u32,
    ) -> AppResult<i64> {
        if cantidad == 0 {
            return Self::get_stock(conn, product_id, bodega).await;
        }

        let updated = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE product_stock
            SET cantidad = cantidad - $3
            WHERE product_id = $1 AND bodega = $2 AND cantidad >= $3
            RETURNING cantidad
            "#,
        )
        .bind(product_id)
        .bind(bodega.as_str())
        .bind(i64::from(cantidad))
        .fetch_optional(&mut *conn)
        .await?;

        match updated {
            Some(remaining) => Ok(remaining),
            None => {
                let disponible = Self::get_stock(conn, product_id, bodega).await?;
                Err(AppError::InsufficientStock {
                    producto: product_id.to_string(),
                    disponible,
                    solicitado: cantidad,
                })
            }
        }
    }

    /// Apply a planned set of reservations. Any failure leaves the
    /// transaction poisoned for the caller to roll back.
    pub async fn apply(conn: &mut PgConnection, reservas: &[Reservation]) -> AppResult<()> {
        for reserva in reservas {
            Self::reserve(conn, &reserva.producto, &reserva.bodega, reserva.cantidad).await?;
        }
        Ok(())
    }

    /// Replace every stock row of a product with the given levels.
    pub async fn replace_levels(
        conn: &mut PgConnection,
        product_id: &str,
        levels: &StockLevels,
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM product_stock WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *conn)
            .await?;

        for (bodega, cantidad) in levels.iter() {
            sqlx::query(
                "INSERT INTO product_stock (product_id, bodega, cantidad) VALUES ($1, $2, $3)",
            )
            .bind(product_id)
            .bind(bodega.as_str())
            .bind(*cantidad)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }
}
