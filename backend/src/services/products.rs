//! Product catalog service
//!
//! Admin CRUD over the catalog plus the per-role product views:
//! distributors see one price (their mode) and the stock of their region's
//! warehouse; warehouse and admin accounts see the full picture.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use shared::models::product::{PriceSet, Product};
use shared::stock::StockLevels;
use shared::types::{PriceMode, WarehouseKey};

use crate::error::{AppError, AppResult};
use crate::services::stock::StockService;
use crate::services::users::next_sequential_id;

/// Stock level at or below which a product counts as low stock in the
/// inventory view.
const STOCK_BAJO_MAX: i64 = 50;

/// Product catalog service
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
    /// Canonical warehouse for legacy stock values with no split.
    primary_warehouse: WarehouseKey,
}

/// Product row as stored
#[derive(Debug, Clone, FromRow)]
struct ProductRow {
    id: String,
    admin_id: String,
    nombre: String,
    categoria: String,
    descripcion: String,
    imagen: String,
    precio_sin_iva: Decimal,
    precio_con_iva: Decimal,
    precio_internacional: Decimal,
    activo: bool,
    en_produccion: bool,
    creado_en: DateTime<Utc>,
    actualizado_en: DateTime<Utc>,
}

const PRODUCT_COLUMNS: &str = "id, admin_id, nombre, categoria, descripcion, imagen, \
     precio_sin_iva, precio_con_iva, precio_internacional, activo, en_produccion, \
     creado_en, actualizado_en";

impl ProductRow {
    fn into_product(self, stock: StockLevels) -> Product {
        Product {
            id: self.id,
            admin_id: self.admin_id,
            nombre: self.nombre,
            categoria: self.categoria,
            descripcion: self.descripcion,
            imagen: self.imagen,
            precios: PriceSet {
                sin_iva: self.precio_sin_iva,
                con_iva: self.precio_con_iva,
                internacional: self.precio_internacional,
            },
            stock,
            activo: self.activo,
            en_produccion: self.en_produccion,
            creado_en: self.creado_en,
            actualizado_en: self.actualizado_en,
        }
    }
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub nombre: String,
    pub categoria: String,
    #[serde(default)]
    pub descripcion: String,
    #[serde(default)]
    pub imagen: String,
    pub precio_sin_iva: Decimal,
    pub precio_con_iva: Decimal,
    pub precio_internacional: Decimal,
    /// Legacy-tolerant stock field: integer, numeric string, or a
    /// per-warehouse map of either.
    #[serde(default)]
    pub stock: serde_json::Value,
    #[serde(default)]
    pub en_produccion: bool,
}

/// Input for updating a product; absent fields are left unchanged
#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub nombre: Option<String>,
    pub categoria: Option<String>,
    pub descripcion: Option<String>,
    pub imagen: Option<String>,
    pub precio_sin_iva: Option<Decimal>,
    pub precio_con_iva: Option<Decimal>,
    pub precio_internacional: Option<Decimal>,
    pub stock: Option<serde_json::Value>,
    pub activo: Option<bool>,
    pub en_produccion: Option<bool>,
}

/// One row of the distributor-facing catalog
#[derive(Debug, Serialize)]
pub struct CatalogItem {
    pub id: String,
    pub nombre: String,
    pub categoria: String,
    pub descripcion: String,
    pub imagen: String,
    pub stock: i64,
    pub precio: Decimal,
    pub tipo_precio: PriceMode,
}

/// One row of the inventory view
#[derive(Debug, Serialize)]
pub struct InventoryItem {
    pub id: String,
    pub nombre: String,
    pub categoria: String,
    pub precios: PriceSet,
    pub stock: StockLevels,
    pub stock_total: i64,
    pub estado: &'static str,
}

/// Classify a stock count for the inventory dashboard.
pub fn stock_estado(total: i64) -> &'static str {
    if total == 0 {
        "Sin Stock"
    } else if total <= STOCK_BAJO_MAX {
        "Stock Bajo"
    } else {
        "Normal"
    }
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool, primary_warehouse: WarehouseKey) -> Self {
        Self {
            db,
            primary_warehouse,
        }
    }

    /// Create a product with a sequential id scoped to the owning admin
    pub async fn create_product(
        &self,
        admin_id: &str,
        input: CreateProductInput,
    ) -> AppResult<Product> {
        let precios = PriceSet {
            sin_iva: input.precio_sin_iva,
            con_iva: input.precio_con_iva,
            internacional: input.precio_internacional,
        };
        precios.validate().map_err(|msg| AppError::Validation {
            field: "precios".into(),
            message: msg.to_string(),
            message_es: msg.to_string(),
        })?;

        let levels = StockLevels::from_raw(&input.stock, &self.primary_warehouse);

        let mut tx = self.db.begin().await?;

        let last = sqlx::query_scalar::<_, Option<String>>(
            "SELECT MAX(id) FROM products WHERE admin_id = $1 AND id LIKE 'P%'",
        )
        .bind(admin_id)
        .fetch_one(&mut *tx)
        .await?;
        let id = next_sequential_id("P", last.as_deref());

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            INSERT INTO products (
                id, admin_id, nombre, categoria, descripcion, imagen,
                precio_sin_iva, precio_con_iva, precio_internacional,
                activo, en_produccion
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, TRUE, $10)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(&id)
        .bind(admin_id)
        .bind(input.nombre.trim())
        .bind(input.categoria.trim())
        .bind(&input.descripcion)
        .bind(&input.imagen)
        .bind(input.precio_sin_iva)
        .bind(input.precio_con_iva)
        .bind(input.precio_internacional)
        .bind(input.en_produccion)
        .fetch_one(&mut *tx)
        .await?;

        StockService::replace_levels(&mut tx, &id, &levels).await?;

        tx.commit().await?;

        Ok(row.into_product(levels))
    }

    /// List an admin's products with their stock
    pub async fn list_products(&self, admin_id: &str) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE admin_id = $1 ORDER BY id",
            PRODUCT_COLUMNS
        ))
        .bind(admin_id)
        .fetch_all(&self.db)
        .await?;

        self.attach_stock(rows).await
    }

    /// Get one product with its stock
    pub async fn get_product(&self, product_id: &str) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Producto {}", product_id)))?;

        let mut conn = self.db.acquire().await?;
        let levels = StockService::levels(&mut conn, product_id).await?;
        Ok(row.into_product(levels))
    }

    /// The catalog a distributor sees: active products with stock at the
    /// warehouse serving their region, priced for their mode.
    pub async fn catalog_for_distributor(
        &self,
        tipo_precio: PriceMode,
        bodega: &WarehouseKey,
    ) -> AppResult<Vec<CatalogItem>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE activo = TRUE ORDER BY id",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        let products = self.attach_stock(rows).await?;

        Ok(products
            .into_iter()
            .filter_map(|p| {
                let stock = p.stock.available(bodega);
                if stock <= 0 {
                    return None;
                }
                Some(CatalogItem {
                    precio: p.precios.display_for(tipo_precio),
                    id: p.id,
                    nombre: p.nombre,
                    categoria: p.categoria,
                    descripcion: p.descripcion,
                    imagen: p.imagen,
                    stock,
                    tipo_precio,
                })
            })
            .collect())
    }

    /// Every active product with stock, regardless of owner. Backs the
    /// full catalog view for non-distributor roles.
    pub async fn list_active(&self) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE activo = TRUE ORDER BY id",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        self.attach_stock(rows).await
    }

    /// Update a product; a provided stock field replaces every stock row
    pub async fn update_product(
        &self,
        product_id: &str,
        input: UpdateProductInput,
    ) -> AppResult<Product> {
        let existing = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Producto {}", product_id)))?;

        let precios = PriceSet {
            sin_iva: input.precio_sin_iva.unwrap_or(existing.precio_sin_iva),
            con_iva: input.precio_con_iva.unwrap_or(existing.precio_con_iva),
            internacional: input
                .precio_internacional
                .unwrap_or(existing.precio_internacional),
        };
        precios.validate().map_err(|msg| AppError::Validation {
            field: "precios".into(),
            message: msg.to_string(),
            message_es: msg.to_string(),
        })?;

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE products SET
                nombre = $2,
                categoria = $3,
                descripcion = $4,
                imagen = $5,
                precio_sin_iva = $6,
                precio_con_iva = $7,
                precio_internacional = $8,
                activo = $9,
                en_produccion = $10,
                actualizado_en = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .bind(input.nombre.unwrap_or(existing.nombre))
        .bind(input.categoria.unwrap_or(existing.categoria))
        .bind(input.descripcion.unwrap_or(existing.descripcion))
        .bind(input.imagen.unwrap_or(existing.imagen))
        .bind(precios.sin_iva)
        .bind(precios.con_iva)
        .bind(precios.internacional)
        .bind(input.activo.unwrap_or(existing.activo))
        .bind(input.en_produccion.unwrap_or(existing.en_produccion))
        .fetch_one(&mut *tx)
        .await?;

        let levels = match input.stock {
            Some(raw) => {
                let levels = StockLevels::from_raw(&raw, &self.primary_warehouse);
                StockService::replace_levels(&mut tx, product_id, &levels).await?;
                levels
            }
            None => StockService::levels(&mut tx, product_id).await?,
        };

        tx.commit().await?;

        Ok(row.into_product(levels))
    }

    /// Soft-delete: deactivate instead of removing, so historical order
    /// lines keep a valid product reference.
    pub async fn deactivate_product(&self, product_id: &str) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE products SET activo = FALSE, actualizado_en = NOW() WHERE id = $1",
        )
        .bind(product_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Producto {}", product_id)));
        }

        Ok(())
    }

    /// Inventory dashboard: active products with stock broken out per
    /// warehouse (or narrowed to one warehouse for bodega actors) and a
    /// low/no-stock classification.
    pub async fn inventory(&self, scope: Option<&WarehouseKey>) -> AppResult<Vec<InventoryItem>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE activo = TRUE ORDER BY id",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        let products = self.attach_stock(rows).await?;

        Ok(products
            .into_iter()
            .map(|p| {
                let (stock, total) = match scope {
                    Some(bodega) => {
                        let count = p.stock.available(bodega);
                        let mut narrowed = StockLevels::new();
                        narrowed.set(bodega.clone(), count);
                        (narrowed, count)
                    }
                    None => {
                        let total = p.stock.total();
                        (p.stock, total)
                    }
                };
                InventoryItem {
                    id: p.id,
                    nombre: p.nombre,
                    categoria: p.categoria,
                    precios: p.precios,
                    stock,
                    stock_total: total,
                    estado: stock_estado(total),
                }
            })
            .collect())
    }

    async fn attach_stock(&self, rows: Vec<ProductRow>) -> AppResult<Vec<Product>> {
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let mut conn = self.db.acquire().await?;
        let mut levels = StockService::levels_many(&mut conn, &ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let stock = levels.remove(&row.id).unwrap_or_default();
                row.into_product(stock)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_classification_thresholds() {
        assert_eq!(stock_estado(0), "Sin Stock");
        assert_eq!(stock_estado(1), "Stock Bajo");
        assert_eq!(stock_estado(50), "Stock Bajo");
        assert_eq!(stock_estado(51), "Normal");
    }
}
