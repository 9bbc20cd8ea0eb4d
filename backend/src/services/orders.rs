//! Order lifecycle service
//!
//! Drives the two order transitions: a distributor creating an order
//! (stock reserved at the warehouse serving their tax region) and a
//! warehouse processing it into a dispatch order with final quantities.
//! Each transition runs inside one transaction, so a failed line rolls
//! back every reservation made before it; nothing partial ever persists.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::BTreeMap;
use std::sync::Arc;

use shared::models::order::{
    apply_processing, build_order, DistributorInfo, NewOrderInput, Order, OrderKind, OrderLine,
    OrderStatus, ProcessRequest, ProcessingInfo, ProductSnapshot,
};
use shared::types::{PriceMode, WarehouseKey};
use shared::validation::{parse_line_request, validate_direccion};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::notifications::Notifier;
use crate::services::stock::StockService;
use crate::services::users::{UserRow, UserService};

/// Order lifecycle service
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
    config: Arc<Config>,
    notifier: Notifier,
}

/// Raw order payload as submitted by distributor clients. Line items are
/// kept as JSON values so legacy string-typed quantities and prices can
/// be coerced at this boundary.
#[derive(Debug, Deserialize)]
pub struct CreateOrderPayload {
    pub direccion: Option<String>,
    #[serde(default)]
    pub notas: Option<String>,
    pub productos: Option<Vec<serde_json::Value>>,
}

/// Order row as stored
#[derive(Debug, Clone, FromRow)]
struct OrderRow {
    id: String,
    kind: String,
    distribuidor_id: String,
    distribuidor_nombre: String,
    distribuidor_phone: String,
    productos: serde_json::Value,
    direccion: String,
    notas: String,
    fecha: DateTime<Utc>,
    estado: String,
    tipo_precio: String,
    subtotal: Decimal,
    iva: Decimal,
    total: Decimal,
    procesado_por: Option<String>,
    bodega_procesadora: Option<String>,
    fecha_procesado: Option<DateTime<Utc>>,
    notas_procesamiento: Option<String>,
}

const ORDER_COLUMNS: &str = "id, kind, distribuidor_id, distribuidor_nombre, distribuidor_phone, \
     productos, direccion, notas, fecha, estado, tipo_precio, subtotal, iva, total, \
     procesado_por, bodega_procesadora, fecha_procesado, notas_procesamiento";

impl OrderRow {
    fn into_order(self) -> AppResult<Order> {
        let kind = OrderKind::parse(&self.kind)
            .ok_or_else(|| AppError::Internal(format!("unknown order kind: {}", self.kind)))?;
        let estado = OrderStatus::parse(&self.estado)
            .ok_or_else(|| AppError::Internal(format!("unknown order status: {}", self.estado)))?;
        let tipo_precio = PriceMode::parse(&self.tipo_precio)?;
        let productos: Vec<OrderLine> = serde_json::from_value(self.productos)
            .map_err(|e| AppError::Internal(format!("malformed stored order lines: {}", e)))?;

        let procesamiento = match (self.procesado_por, self.bodega_procesadora, self.fecha_procesado)
        {
            (Some(procesado_por), Some(bodega), Some(fecha_procesado)) => Some(ProcessingInfo {
                procesado_por,
                bodega_procesadora: WarehouseKey::new(bodega),
                fecha_procesado,
                notas_procesamiento: self.notas_procesamiento,
            }),
            _ => None,
        };

        Ok(Order {
            id: self.id,
            kind,
            distribuidor_id: self.distribuidor_id,
            distribuidor_nombre: self.distribuidor_nombre,
            distribuidor_phone: self.distribuidor_phone,
            productos,
            direccion: self.direccion,
            notas: self.notas,
            fecha: self.fecha,
            estado,
            subtotal: self.subtotal,
            iva: self.iva,
            total: self.total,
            tipo_precio,
            procesamiento,
        })
    }
}

impl OrderService {
    /// Create a new OrderService instance
    pub fn new(db: PgPool, config: Arc<Config>) -> Self {
        let notifier = Notifier::new(&config.mail);
        Self {
            db,
            config,
            notifier,
        }
    }

    /// Create an order on behalf of the authenticated distributor.
    ///
    /// The distributor identity (and with it the price mode and the
    /// fulfillment warehouse) is resolved from the caller's credentials,
    /// never from the request body.
    pub async fn create_order(
        &self,
        actor: &AuthUser,
        kind: OrderKind,
        payload: CreateOrderPayload,
    ) -> AppResult<Order> {
        if !actor.is_distribuidor() {
            return Err(AppError::Forbidden("crear órdenes de compra".into()));
        }

        let users = UserService::new(self.db.clone());
        let distribuidor_row = users
            .find_by_email(&actor.email)
            .await?
            .ok_or_else(|| AppError::NotFound("Distribuidor".into()))?;

        let tipo_precio = distribuidor_row.tipo_precio()?.ok_or_else(|| {
            AppError::Validation {
                field: "tipo_precio".into(),
                message: "Distributor has no price mode configured".into(),
                message_es: "El distribuidor no tiene configurado un tipo de precio".into(),
            }
        })?;

        let input = Self::validate_payload(payload)?;
        let distribuidor = DistributorInfo {
            id: distribuidor_row.id.clone(),
            nombre: distribuidor_row.nombre.clone(),
            phone: distribuidor_row
                .phone
                .clone()
                .unwrap_or_else(|| "No registrado".to_string()),
            tipo_precio,
        };

        let bodega = self.config.warehouses.for_price_mode(tipo_precio).clone();
        let fecha = Utc::now();
        let id = kind.new_id(fecha);

        let mut tx = self.db.begin().await?;

        let ids: Vec<String> = input.lineas.iter().map(|l| l.id.clone()).collect();
        let mut catalog = Self::load_catalog(&mut tx, &ids).await?;

        let draft = build_order(id, kind, fecha, &distribuidor, &input, &mut catalog, &bodega)?;

        // Re-apply the plan against the authoritative counters; a
        // concurrent order can still lose the race here, failing the
        // transaction as a whole.
        StockService::apply(&mut tx, &draft.reservas).await?;
        Self::insert_order(&mut tx, &draft.order).await?;

        tx.commit().await?;

        tracing::info!(
            "Orden {} creada por {} ({} líneas, total {})",
            draft.order.id,
            actor.email,
            draft.order.productos.len(),
            draft.order.total
        );

        self.notifier
            .notify_order_created(&draft.order, &actor.email, &bodega)
            .await;

        Ok(draft.order)
    }

    /// Process a purchase order: the warehouse actor commits final
    /// quantities, stock moves at their own warehouse, totals are
    /// recomputed from the dispatched lines, and the order is stamped.
    pub async fn process_order(
        &self,
        actor: &AuthUser,
        order_id: &str,
        request: ProcessRequest,
    ) -> AppResult<Order> {
        if actor.rol != shared::models::user::Role::Bodega {
            return Err(AppError::Forbidden("procesar órdenes".into()));
        }

        let users = UserService::new(self.db.clone());
        let bodega_row = users
            .find_by_email(&actor.email)
            .await?
            .ok_or_else(|| AppError::NotFound("Bodega".into()))?;
        let bodega = bodega_row.cdi().ok_or_else(|| AppError::Validation {
            field: "cdi".into(),
            message: "Warehouse account has no location assigned".into(),
            message_es: "La bodega no tiene un CDI asignado".into(),
        })?;

        let mut tx = self.db.begin().await?;

        let order = Self::fetch_order(&mut tx, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Orden".into()))?;

        if order.estado != OrderStatus::OrdenCompraCreada {
            return Err(AppError::Validation {
                field: "estado".into(),
                message: format!("Order is already in state '{}'", order.estado.as_str()),
                message_es: format!("La orden ya está en estado '{}'", order.estado.as_str()),
            });
        }

        let ids: Vec<String> = request
            .productos
            .iter()
            .filter(|l| l.cantidad_final > 0)
            .map(|l| l.id.clone())
            .collect();
        let mut stock = StockService::levels_many(&mut tx, &ids).await?;

        let draft = apply_processing(&order, &request, &mut stock, &bodega, &actor.email, Utc::now())?;

        StockService::apply(&mut tx, &draft.reservas).await?;
        Self::update_processed_order(&mut tx, &draft.order).await?;

        tx.commit().await?;

        tracing::info!(
            "Orden {} procesada por {} desde {}",
            draft.order.id,
            actor.email,
            bodega
        );

        // The distributor snapshot has no email; look the account up for
        // the confirmation mail. Region routing follows the order's mode.
        let distributor_email = self
            .distributor_email(&draft.order.distribuidor_id)
            .await
            .unwrap_or_default();
        let region = self
            .config
            .warehouses
            .for_price_mode(draft.order.tipo_precio);
        self.notifier
            .notify_order_processed(&draft.order, &distributor_email, region)
            .await;

        Ok(draft.order)
    }

    /// Explicit status flip for dispatched orders: invoiced / in transit.
    pub async fn set_status(
        &self,
        actor: &AuthUser,
        order_id: &str,
        nuevo_estado: &str,
    ) -> AppResult<Order> {
        if !actor.rol.can_set_order_status() {
            return Err(AppError::Forbidden("cambiar estados de pedidos".into()));
        }

        let estado = OrderStatus::parse_settable(nuevo_estado)?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE orders SET estado = $2 WHERE id = $1 RETURNING {}",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .bind(estado.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Pedido".into()))?;

        row.into_order()
    }

    /// Role-scoped order listing, newest first.
    ///
    /// Distributors see their own orders; warehouse actors see the
    /// price modes their location serves (with the export view re-mapped
    /// to tax-exempt prices); admin, production and billing see all.
    pub async fn list_orders(
        &self,
        actor: &AuthUser,
        kind: Option<OrderKind>,
    ) -> AppResult<Vec<Order>> {
        use shared::models::user::Role;

        let rows = match actor.rol {
            Role::DistribuidorNacional | Role::DistribuidorInternacional => {
                let users = UserService::new(self.db.clone());
                let row = users
                    .find_by_email(&actor.email)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Distribuidor".into()))?;
                sqlx::query_as::<_, OrderRow>(&format!(
                    "SELECT {} FROM orders WHERE distribuidor_id = $1 ORDER BY fecha DESC",
                    ORDER_COLUMNS
                ))
                .bind(&row.id)
                .fetch_all(&self.db)
                .await?
            }
            Role::Bodega => {
                let modes = self.bodega_price_modes(&actor.email).await?;
                let mode_strs: Vec<String> =
                    modes.iter().map(|m| m.as_str().to_string()).collect();
                sqlx::query_as::<_, OrderRow>(&format!(
                    "SELECT {} FROM orders WHERE tipo_precio = ANY($1) ORDER BY fecha DESC",
                    ORDER_COLUMNS
                ))
                .bind(&mode_strs)
                .fetch_all(&self.db)
                .await?
            }
            Role::Admin | Role::Produccion | Role::Facturacion => {
                sqlx::query_as::<_, OrderRow>(&format!(
                    "SELECT {} FROM orders ORDER BY fecha DESC",
                    ORDER_COLUMNS
                ))
                .fetch_all(&self.db)
                .await?
            }
        };

        let mut orders = rows
            .into_iter()
            .map(OrderRow::into_order)
            .collect::<AppResult<Vec<_>>>()?;

        if let Some(kind) = kind {
            orders.retain(|o| o.kind == kind);
        }

        if actor.rol == Role::Bodega && self.is_export_bodega(&actor.email).await? {
            orders.iter_mut().for_each(remap_tax_exempt_view);
        }

        Ok(orders)
    }

    /// Fetch one order with per-role access control.
    pub async fn get_order(&self, actor: &AuthUser, order_id: &str) -> AppResult<Order> {
        use shared::models::user::Role;

        let mut conn = self.db.acquire().await?;
        let mut order = Self::fetch_order(&mut conn, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Pedido".into()))?;

        match actor.rol {
            Role::Admin | Role::Produccion | Role::Facturacion => {}
            Role::DistribuidorNacional | Role::DistribuidorInternacional => {
                let users = UserService::new(self.db.clone());
                let row = users
                    .find_by_email(&actor.email)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Distribuidor".into()))?;
                if order.distribuidor_id != row.id {
                    return Err(AppError::Forbidden("ver pedidos de otros distribuidores".into()));
                }
            }
            Role::Bodega => {
                let modes = self.bodega_price_modes(&actor.email).await?;
                if !modes.contains(&order.tipo_precio) {
                    return Err(AppError::Forbidden("ver pedidos de otra región".into()));
                }
                if self.is_export_bodega(&actor.email).await? {
                    remap_tax_exempt_view(&mut order);
                }
            }
        }

        Ok(order)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn validate_payload(payload: CreateOrderPayload) -> AppResult<NewOrderInput> {
        let direccion = payload.direccion.unwrap_or_default();
        validate_direccion(&direccion).map_err(|msg| AppError::Validation {
            field: "direccion".into(),
            message: "The order must include a shipping address".into(),
            message_es: msg.to_string(),
        })?;

        let productos = payload.productos.ok_or_else(|| AppError::Validation {
            field: "productos".into(),
            message: "The order must contain a product list".into(),
            message_es: "La orden debe contener una lista de productos".into(),
        })?;

        let lineas = productos
            .iter()
            .map(parse_line_request)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|msg| AppError::Validation {
                field: "productos".into(),
                message: "Each product needs 'id', 'cantidad' and 'precio'".into(),
                message_es: msg.to_string(),
            })?;

        Ok(NewOrderInput {
            direccion,
            notas: payload.notas.unwrap_or_default(),
            lineas,
        })
    }

    async fn load_catalog(
        conn: &mut PgConnection,
        ids: &[String],
    ) -> AppResult<BTreeMap<String, ProductSnapshot>> {
        let names = sqlx::query_as::<_, (String, String)>(
            "SELECT id, nombre FROM products WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&mut *conn)
        .await?;

        let mut stock = StockService::levels_many(conn, ids).await?;

        Ok(names
            .into_iter()
            .map(|(id, nombre)| {
                let levels = stock.remove(&id).unwrap_or_default();
                (
                    id,
                    ProductSnapshot {
                        nombre,
                        stock: levels,
                    },
                )
            })
            .collect())
    }

    async fn fetch_order(conn: &mut PgConnection, order_id: &str) -> AppResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE id = $1",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(conn)
        .await?;

        row.map(OrderRow::into_order).transpose()
    }

    async fn insert_order(conn: &mut PgConnection, order: &Order) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, kind, distribuidor_id, distribuidor_nombre, distribuidor_phone,
                productos, direccion, notas, fecha, estado, tipo_precio,
                subtotal, iva, total
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(&order.id)
        .bind(order.kind.as_str())
        .bind(&order.distribuidor_id)
        .bind(&order.distribuidor_nombre)
        .bind(&order.distribuidor_phone)
        .bind(serde_json::to_value(&order.productos).map_err(|e| AppError::Internal(e.to_string()))?)
        .bind(&order.direccion)
        .bind(&order.notas)
        .bind(order.fecha)
        .bind(order.estado.as_str())
        .bind(order.tipo_precio.as_str())
        .bind(order.subtotal)
        .bind(order.iva)
        .bind(order.total)
        .execute(conn)
        .await?;

        Ok(())
    }

    async fn update_processed_order(conn: &mut PgConnection, order: &Order) -> AppResult<()> {
        let info = order
            .procesamiento
            .as_ref()
            .ok_or_else(|| AppError::Internal("processed order without stamp".into()))?;

        sqlx::query(
            r#"
            UPDATE orders SET
                productos = $2,
                estado = $3,
                subtotal = $4,
                iva = $5,
                total = $6,
                procesado_por = $7,
                bodega_procesadora = $8,
                fecha_procesado = $9,
                notas_procesamiento = $10
            WHERE id = $1
            "#,
        )
        .bind(&order.id)
        .bind(serde_json::to_value(&order.productos).map_err(|e| AppError::Internal(e.to_string()))?)
        .bind(order.estado.as_str())
        .bind(order.subtotal)
        .bind(order.iva)
        .bind(order.total)
        .bind(&info.procesado_por)
        .bind(info.bodega_procesadora.as_str())
        .bind(info.fecha_procesado)
        .bind(&info.notas_procesamiento)
        .execute(conn)
        .await?;

        Ok(())
    }

    async fn bodega_price_modes(&self, email: &str) -> AppResult<Vec<PriceMode>> {
        let cdi = self.bodega_cdi(email).await?;
        let modes = self.config.warehouses.price_modes_for(&cdi);
        if modes.is_empty() {
            return Err(AppError::Validation {
                field: "cdi".into(),
                message: format!("Unknown warehouse location '{}'", cdi),
                message_es: "CDI de bodega no válido".into(),
            });
        }
        Ok(modes)
    }

    async fn is_export_bodega(&self, email: &str) -> AppResult<bool> {
        let cdi = self.bodega_cdi(email).await?;
        Ok(cdi == self.config.warehouses.export)
    }

    async fn bodega_cdi(&self, email: &str) -> AppResult<WarehouseKey> {
        let users = UserService::new(self.db.clone());
        let row: UserRow = users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound("Bodega".into()))?;
        row.cdi().ok_or_else(|| AppError::Validation {
            field: "cdi".into(),
            message: "Warehouse account has no location assigned".into(),
            message_es: "La bodega no tiene un CDI asignado".into(),
        })
    }

    async fn distributor_email(&self, distribuidor_id: &str) -> Option<String> {
        sqlx::query_scalar::<_, String>("SELECT correo_electronico FROM users WHERE id = $1")
            .bind(distribuidor_id)
            .fetch_optional(&self.db)
            .await
            .ok()
            .flatten()
    }
}

/// The export warehouse operates tax-free: its order views show the
/// tax-exempt price on every line, with totals recomputed to match.
fn remap_tax_exempt_view(order: &mut Order) {
    for line in &mut order.productos {
        line.precio = line.precio_sin_iva;
        line.iva_unitario = Decimal::ZERO;
        line.total = line.precio * Decimal::from(line.cantidad);
    }
    let totals = order.totals_from_lines();
    order.subtotal = totals.subtotal;
    order.iva = totals.iva;
    order.total = totals.total;
}
