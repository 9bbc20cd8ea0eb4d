//! Orders: purchase orders placed by distributors and the dispatch orders
//! warehouses turn them into.
//!
//! The original system kept a purchase order and its processed counterpart
//! as two documents linked only by a shared id, with the status duplicated
//! in both. Here both halves live in a single record: the processing stamp
//! is an optional sub-record, serialized flat so the wire shape of a
//! processed order stays unchanged.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::pricing::{quote_unit, Totals, UnitQuote};
use crate::stock::StockLevels;
use crate::types::{PriceMode, WarehouseKey};

/// Order kind, explicit instead of the historical "OC-"/"PED-" id-prefix
/// discrimination.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderKind {
    /// Purchase order awaiting warehouse fulfillment.
    #[serde(rename = "orden_compra")]
    OrdenCompra,
    /// Direct order, dispatched without the purchase-order step.
    #[serde(rename = "pedido")]
    Pedido,
}

impl OrderKind {
    pub fn id_prefix(&self) -> &'static str {
        match self {
            OrderKind::OrdenCompra => "OC",
            OrderKind::Pedido => "PED",
        }
    }

    /// Time-based order id, e.g. `OC-20250316142255`.
    pub fn new_id(&self, at: DateTime<Utc>) -> String {
        format!("{}-{}", self.id_prefix(), at.format("%Y%m%d%H%M%S"))
    }

    pub fn initial_status(&self) -> OrderStatus {
        match self {
            OrderKind::OrdenCompra => OrderStatus::OrdenCompraCreada,
            OrderKind::Pedido => OrderStatus::Procesando,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::OrdenCompra => "orden_compra",
            OrderKind::Pedido => "pedido",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "orden_compra" => Some(OrderKind::OrdenCompra),
            "pedido" => Some(OrderKind::Pedido),
            _ => None,
        }
    }
}

/// Order lifecycle states. Wire strings are the exact historical values,
/// capitalization quirks included.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderStatus {
    #[serde(rename = "Orden de compra creada")]
    OrdenCompraCreada,
    #[serde(rename = "Procesando")]
    Procesando,
    #[serde(rename = "Pedido creado")]
    PedidoCreado,
    #[serde(rename = "facturado")]
    Facturado,
    #[serde(rename = "en camino")]
    EnCamino,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::OrdenCompraCreada => "Orden de compra creada",
            OrderStatus::Procesando => "Procesando",
            OrderStatus::PedidoCreado => "Pedido creado",
            OrderStatus::Facturado => "facturado",
            OrderStatus::EnCamino => "en camino",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Orden de compra creada" => Some(OrderStatus::OrdenCompraCreada),
            "Procesando" => Some(OrderStatus::Procesando),
            "Pedido creado" => Some(OrderStatus::PedidoCreado),
            "facturado" => Some(OrderStatus::Facturado),
            "en camino" => Some(OrderStatus::EnCamino),
            _ => None,
        }
    }

    /// Parse a status-set request. Only `facturado` and `en camino` can be
    /// assigned through the explicit status operation; anything else is an
    /// invalid status.
    pub fn parse_settable(value: &str) -> Result<Self, InvalidStatus> {
        match value {
            "facturado" => Ok(OrderStatus::Facturado),
            "en camino" => Ok(OrderStatus::EnCamino),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

/// Error for status values outside the settable set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid status: {0}")]
pub struct InvalidStatus(pub String);

/// One product line within an order.
///
/// `cantidad` is the requested quantity until processing, after which it
/// holds the dispatched quantity and `cantidad_solicitada` preserves the
/// original request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderLine {
    pub id: String,
    pub nombre: String,
    pub cantidad: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cantidad_solicitada: Option<u32>,
    pub precio: Decimal,
    pub precio_sin_iva: Decimal,
    pub iva_unitario: Decimal,
    pub total: Decimal,
}

/// Audit stamp recorded when a warehouse processes an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessingInfo {
    pub procesado_por: String,
    pub bodega_procesadora: WarehouseKey,
    pub fecha_procesado: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notas_procesamiento: Option<String>,
}

/// An order record. The distributor snapshot is denormalized at creation
/// time and never follows later edits to the distributor account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub kind: OrderKind,
    pub distribuidor_id: String,
    pub distribuidor_nombre: String,
    pub distribuidor_phone: String,
    pub productos: Vec<OrderLine>,
    pub direccion: String,
    #[serde(default)]
    pub notas: String,
    pub fecha: DateTime<Utc>,
    pub estado: OrderStatus,
    pub subtotal: Decimal,
    pub iva: Decimal,
    pub total: Decimal,
    pub tipo_precio: PriceMode,
    #[serde(flatten)]
    pub procesamiento: Option<ProcessingInfo>,
}

impl Order {
    /// Recompute totals from the stored lines. Used to verify that the
    /// persisted aggregates reproduce from the persisted line items.
    pub fn totals_from_lines(&self) -> Totals {
        let mut totals = Totals::default();
        for line in &self.productos {
            let quote = UnitQuote {
                precio: line.precio,
                precio_sin_iva: line.precio_sin_iva,
                iva_unitario: line.iva_unitario,
            };
            totals.add_line(&quote, line.cantidad);
        }
        totals
    }
}

// ============================================================================
// Order creation (aggregator)
// ============================================================================

/// Distributor identity resolved from the authenticated caller, never from
/// the request body.
#[derive(Debug, Clone)]
pub struct DistributorInfo {
    pub id: String,
    pub nombre: String,
    pub phone: String,
    pub tipo_precio: PriceMode,
}

/// A requested line after boundary validation/coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRequest {
    pub id: String,
    pub cantidad: u32,
    /// Tax-exempt base unit price supplied by the caller.
    pub precio: Decimal,
}

/// New order input after boundary validation.
#[derive(Debug, Clone)]
pub struct NewOrderInput {
    pub direccion: String,
    pub notas: String,
    pub lineas: Vec<LineRequest>,
}

/// The catalog data the aggregator needs for one product.
#[derive(Debug, Clone)]
pub struct ProductSnapshot {
    pub nombre: String,
    pub stock: StockLevels,
}

/// A stock decrement the caller must apply to the authoritative store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub producto: String,
    pub bodega: WarehouseKey,
    pub cantidad: u32,
    /// Stock remaining at the warehouse once the reservation applies.
    pub restante: i64,
}

/// A fully built order plus the reservations that back it. Nothing has
/// been persisted yet: if planning fails, no stock has moved.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub order: Order,
    pub reservas: Vec<Reservation>,
}

/// Failures while building or processing an order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderBuildError {
    #[error("producto {0} no encontrado")]
    ProductoNoEncontrado(String),
    #[error("stock insuficiente para {producto}: disponible {disponible}, solicitado {solicitado}")]
    StockInsuficiente {
        producto: String,
        disponible: i64,
        solicitado: u32,
    },
}

/// Build a new order from validated line requests.
///
/// Lines are priced and reserved in the listed order against `bodega`
/// (the warehouse implied by the distributor's tax region). The whole
/// build aborts on the first missing product or short line, leaving the
/// catalog plan discarded; no partial orders.
pub fn build_order(
    id: String,
    kind: OrderKind,
    fecha: DateTime<Utc>,
    distribuidor: &DistributorInfo,
    input: &NewOrderInput,
    catalog: &mut BTreeMap<String, ProductSnapshot>,
    bodega: &WarehouseKey,
) -> Result<OrderDraft, OrderBuildError> {
    let mut productos = Vec::with_capacity(input.lineas.len());
    let mut reservas = Vec::with_capacity(input.lineas.len());
    let mut totals = Totals::default();

    for linea in &input.lineas {
        let snapshot = catalog
            .get_mut(&linea.id)
            .ok_or_else(|| OrderBuildError::ProductoNoEncontrado(linea.id.clone()))?;

        let restante = snapshot.stock.reserve(bodega, linea.cantidad).map_err(|e| {
            OrderBuildError::StockInsuficiente {
                producto: linea.id.clone(),
                disponible: e.disponible,
                solicitado: e.solicitado,
            }
        })?;

        let quote = quote_unit(linea.precio, distribuidor.tipo_precio);
        totals.add_line(&quote, linea.cantidad);

        productos.push(OrderLine {
            id: linea.id.clone(),
            nombre: snapshot.nombre.clone(),
            cantidad: linea.cantidad,
            cantidad_solicitada: None,
            precio: quote.precio,
            precio_sin_iva: quote.precio_sin_iva,
            iva_unitario: quote.iva_unitario,
            total: quote.line_total(linea.cantidad),
        });
        reservas.push(Reservation {
            producto: linea.id.clone(),
            bodega: bodega.clone(),
            cantidad: linea.cantidad,
            restante,
        });
    }

    let order = Order {
        id,
        kind,
        distribuidor_id: distribuidor.id.clone(),
        distribuidor_nombre: distribuidor.nombre.clone(),
        distribuidor_phone: distribuidor.phone.clone(),
        productos,
        direccion: input.direccion.clone(),
        notas: input.notas.clone(),
        fecha,
        estado: kind.initial_status(),
        subtotal: totals.subtotal,
        iva: totals.iva,
        total: totals.total,
        tipo_precio: distribuidor.tipo_precio,
        procesamiento: None,
    };

    Ok(OrderDraft { order, reservas })
}

// ============================================================================
// Order processing (warehouse fulfillment)
// ============================================================================

/// One line of a warehouse processing request.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessLineRequest {
    pub id: String,
    pub cantidad_final: u32,
    /// Optional replacement tax-exempt base price; re-quoted through the
    /// calculator so the line stays consistent with the order's mode.
    #[serde(default)]
    pub precio: Option<Decimal>,
}

/// Warehouse processing request.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessRequest {
    pub productos: Vec<ProcessLineRequest>,
    #[serde(default)]
    pub notas: Option<String>,
}

/// Apply a warehouse's final quantities to `order`.
///
/// Request lines with no matching original line are skipped silently.
/// Zero-quantity lines stay on the order informationally (total 0, no
/// reservation, no totals contribution). Any short line fails the whole
/// transition. `stock` holds current levels per product id at the
/// processing warehouse's location.
pub fn apply_processing(
    order: &Order,
    request: &ProcessRequest,
    stock: &mut BTreeMap<String, StockLevels>,
    bodega: &WarehouseKey,
    procesado_por: &str,
    fecha: DateTime<Utc>,
) -> Result<OrderDraft, OrderBuildError> {
    let mut productos = Vec::with_capacity(request.productos.len());
    let mut reservas = Vec::new();
    let mut totals = Totals::default();

    for linea in &request.productos {
        let Some(original) = order.productos.iter().find(|p| p.id == linea.id) else {
            continue;
        };

        let quote = match linea.precio {
            Some(base) => quote_unit(base, order.tipo_precio),
            None => UnitQuote {
                precio: original.precio,
                precio_sin_iva: original.precio_sin_iva,
                iva_unitario: original.iva_unitario,
            },
        };

        if linea.cantidad_final > 0 {
            let levels = stock
                .get_mut(&linea.id)
                .ok_or_else(|| OrderBuildError::ProductoNoEncontrado(linea.id.clone()))?;
            let restante = levels.reserve(bodega, linea.cantidad_final).map_err(|e| {
                OrderBuildError::StockInsuficiente {
                    producto: linea.id.clone(),
                    disponible: e.disponible,
                    solicitado: e.solicitado,
                }
            })?;
            reservas.push(Reservation {
                producto: linea.id.clone(),
                bodega: bodega.clone(),
                cantidad: linea.cantidad_final,
                restante,
            });
            totals.add_line(&quote, linea.cantidad_final);
        }

        productos.push(OrderLine {
            id: original.id.clone(),
            nombre: original.nombre.clone(),
            cantidad: linea.cantidad_final,
            cantidad_solicitada: Some(original.cantidad),
            precio: quote.precio,
            precio_sin_iva: quote.precio_sin_iva,
            iva_unitario: quote.iva_unitario,
            total: if linea.cantidad_final > 0 {
                quote.line_total(linea.cantidad_final)
            } else {
                Decimal::ZERO
            },
        });
    }

    let mut processed = order.clone();
    processed.productos = productos;
    processed.estado = OrderStatus::PedidoCreado;
    processed.subtotal = totals.subtotal;
    processed.iva = totals.iva;
    processed.total = totals.total;
    processed.procesamiento = Some(ProcessingInfo {
        procesado_por: procesado_por.to_string(),
        bodega_procesadora: bodega.clone(),
        fecha_procesado: fecha,
        notas_procesamiento: request.notas.clone(),
    });

    Ok(OrderDraft {
        order: processed,
        reservas,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn order_ids_carry_the_kind_prefix() {
        let at = DateTime::parse_from_rfc3339("2025-03-16T14:22:55Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(OrderKind::OrdenCompra.new_id(at), "OC-20250316142255");
        assert_eq!(OrderKind::Pedido.new_id(at), "PED-20250316142255");
    }

    #[test]
    fn settable_statuses_are_restricted() {
        assert_eq!(
            OrderStatus::parse_settable("facturado"),
            Ok(OrderStatus::Facturado)
        );
        assert_eq!(
            OrderStatus::parse_settable("en camino"),
            Ok(OrderStatus::EnCamino)
        );
        assert!(OrderStatus::parse_settable("Pedido creado").is_err());
        assert!(OrderStatus::parse_settable("cancelado").is_err());
    }

    #[test]
    fn status_wire_strings_match_historical_values() {
        assert_eq!(
            serde_json::to_value(OrderStatus::OrdenCompraCreada).unwrap(),
            json!("Orden de compra creada")
        );
        assert_eq!(
            serde_json::to_value(OrderStatus::EnCamino).unwrap(),
            json!("en camino")
        );
    }

    #[test]
    fn processed_order_serializes_processing_stamp_flat() {
        let order = Order {
            id: "OC-20250316142255".into(),
            kind: OrderKind::OrdenCompra,
            distribuidor_id: "d1".into(),
            distribuidor_nombre: "Distribuciones del Norte".into(),
            distribuidor_phone: "3000000000".into(),
            productos: vec![],
            direccion: "Calle 1 # 2-3".into(),
            notas: String::new(),
            fecha: Utc::now(),
            estado: OrderStatus::PedidoCreado,
            subtotal: Decimal::ZERO,
            iva: Decimal::ZERO,
            total: Decimal::ZERO,
            tipo_precio: PriceMode::SinIva,
            procesamiento: Some(ProcessingInfo {
                procesado_por: "bodega@example.com".into(),
                bodega_procesadora: WarehouseKey::new("medellin"),
                fecha_procesado: Utc::now(),
                notas_procesamiento: None,
            }),
        };
        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["procesado_por"], json!("bodega@example.com"));
        assert_eq!(value["bodega_procesadora"], json!("medellin"));
        assert!(value.get("procesamiento").is_none());
    }
}
