//! Order lifecycle tests
//!
//! Exercises the pure create/process transitions end to end:
//! - Creation prices, totals and stock reservations
//! - Whole-order abort on any short or missing line
//! - Warehouse processing with final quantities, zero-quantity lines and
//!   price overrides
//! - Totals reconciliation between stored aggregates and stored lines

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use std::collections::BTreeMap;

use shared::models::order::{
    apply_processing, build_order, DistributorInfo, LineRequest, NewOrderInput, Order,
    OrderBuildError, OrderKind, OrderStatus, ProcessLineRequest, ProcessRequest, ProductSnapshot,
};
use shared::stock::StockLevels;
use shared::types::{PriceMode, WarehouseKey};

fn bodega() -> WarehouseKey {
    WarehouseKey::new("medellin")
}

fn fecha() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-03-16T14:22:55Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn distribuidor(mode: PriceMode) -> DistributorInfo {
    DistributorInfo {
        id: "U004".to_string(),
        nombre: "Distribuciones del Norte".to_string(),
        phone: "3001234567".to_string(),
        tipo_precio: mode,
    }
}

fn snapshot(nombre: &str, stock: i64) -> ProductSnapshot {
    let mut levels = StockLevels::new();
    levels.set(bodega(), stock);
    ProductSnapshot {
        nombre: nombre.to_string(),
        stock: levels,
    }
}

fn catalog_with(entries: &[(&str, &str, i64)]) -> BTreeMap<String, ProductSnapshot> {
    entries
        .iter()
        .map(|(id, nombre, stock)| (id.to_string(), snapshot(nombre, *stock)))
        .collect()
}

fn input(lineas: Vec<LineRequest>) -> NewOrderInput {
    NewOrderInput {
        direccion: "Calle 10 # 43-12, Medellín".to_string(),
        notas: String::new(),
        lineas,
    }
}

fn linea(id: &str, cantidad: u32, precio: Decimal) -> LineRequest {
    LineRequest {
        id: id.to_string(),
        cantidad,
        precio,
    }
}

fn create_order(
    mode: PriceMode,
    catalog: &mut BTreeMap<String, ProductSnapshot>,
    lineas: Vec<LineRequest>,
) -> Result<(Order, Vec<shared::models::order::Reservation>), OrderBuildError> {
    let dist = distribuidor(mode);
    let id = OrderKind::OrdenCompra.new_id(fecha());
    build_order(
        id,
        OrderKind::OrdenCompra,
        fecha(),
        &dist,
        &input(lineas),
        catalog,
        &bodega(),
    )
    .map(|draft| (draft.order, draft.reservas))
}

// ============================================================================
// Creation
// ============================================================================

/// Stock 10, order 4 units at base 1000 under con_iva: unit tax 190,
/// unit price 1190, line total 4760, subtotal 4000, tax 760, total 4760,
/// 6 units left.
#[test]
fn purchase_order_prices_and_reserves() {
    let mut catalog = catalog_with(&[("P001", "Crema de Peinar", 10)]);
    let (order, reservas) = create_order(
        PriceMode::ConIva,
        &mut catalog,
        vec![linea("P001", 4, dec!(1000))],
    )
    .unwrap();

    assert_eq!(order.estado, OrderStatus::OrdenCompraCreada);
    assert!(order.id.starts_with("OC-"));
    assert_eq!(order.tipo_precio, PriceMode::ConIva);

    let line = &order.productos[0];
    assert_eq!(line.nombre, "Crema de Peinar");
    assert_eq!(line.iva_unitario, dec!(190.00));
    assert_eq!(line.precio, dec!(1190.00));
    assert_eq!(line.precio_sin_iva, dec!(1000));
    assert_eq!(line.total, dec!(4760.00));

    assert_eq!(order.subtotal, dec!(4000));
    assert_eq!(order.iva, dec!(760.00));
    assert_eq!(order.total, dec!(4760.00));

    assert_eq!(reservas.len(), 1);
    assert_eq!(reservas[0].cantidad, 4);
    assert_eq!(reservas[0].restante, 6);
    assert_eq!(catalog["P001"].stock.available(&bodega()), 6);
}

/// Ordering 11 with 10 available fails and reports both quantities.
#[test]
fn short_line_aborts_the_whole_order() {
    let mut catalog = catalog_with(&[("P001", "Crema de Peinar", 10)]);
    let err = create_order(
        PriceMode::ConIva,
        &mut catalog,
        vec![linea("P001", 11, dec!(1000))],
    )
    .unwrap_err();

    assert_eq!(
        err,
        OrderBuildError::StockInsuficiente {
            producto: "P001".to_string(),
            disponible: 10,
            solicitado: 11,
        }
    );
    assert_eq!(catalog["P001"].stock.available(&bodega()), 10);
}

#[test]
fn unknown_product_aborts_the_whole_order() {
    let mut catalog = catalog_with(&[("P001", "Crema de Peinar", 10)]);
    let err = create_order(
        PriceMode::ConIva,
        &mut catalog,
        vec![
            linea("P001", 2, dec!(1000)),
            linea("P999", 1, dec!(500)),
        ],
    )
    .unwrap_err();

    assert_eq!(err, OrderBuildError::ProductoNoEncontrado("P999".to_string()));
}

/// International orders carry no tax and the same per-line identities.
#[test]
fn international_order_is_tax_exempt() {
    let mut catalog = catalog_with(&[("P002", "Aceite Capilar", 20)]);
    let (order, _) = create_order(
        PriceMode::SinIvaInternacional,
        &mut catalog,
        vec![linea("P002", 3, dec!(500))],
    )
    .unwrap();

    let line = &order.productos[0];
    assert_eq!(line.iva_unitario, Decimal::ZERO);
    assert_eq!(line.precio, dec!(500));
    assert_eq!(line.total, dec!(1500));
    assert_eq!(order.subtotal, dec!(1500));
    assert_eq!(order.iva, Decimal::ZERO);
    assert_eq!(order.total, dec!(1500));
}

/// Reservations are applied in the listed line order.
#[test]
fn reservations_follow_line_order() {
    let mut catalog = catalog_with(&[("P001", "Crema", 5), ("P002", "Aceite", 5)]);
    let (_, reservas) = create_order(
        PriceMode::SinIva,
        &mut catalog,
        vec![linea("P002", 1, dec!(100)), linea("P001", 2, dec!(100))],
    )
    .unwrap();

    let ids: Vec<&str> = reservas.iter().map(|r| r.producto.as_str()).collect();
    assert_eq!(ids, vec!["P002", "P001"]);
}

/// The stored aggregates always reproduce from the stored lines.
#[test]
fn created_order_totals_round_trip() {
    let mut catalog = catalog_with(&[("P001", "Crema", 50), ("P002", "Aceite", 50)]);
    let (order, _) = create_order(
        PriceMode::ConIva,
        &mut catalog,
        vec![
            linea("P001", 7, dec!(129.99)),
            linea("P002", 3, dec!(85.50)),
        ],
    )
    .unwrap();

    let recomputed = order.totals_from_lines();
    assert_eq!(recomputed.subtotal, order.subtotal);
    assert_eq!(recomputed.iva, order.iva);
    assert_eq!(recomputed.total, order.total);
}

// ============================================================================
// Processing
// ============================================================================

fn created_order() -> Order {
    let mut catalog = catalog_with(&[("P001", "Crema", 50), ("P002", "Aceite", 50)]);
    create_order(
        PriceMode::ConIva,
        &mut catalog,
        vec![
            linea("P001", 6, dec!(1000)),
            linea("P002", 2, dec!(400)),
        ],
    )
    .unwrap()
    .0
}

fn warehouse_stock(entries: &[(&str, i64)]) -> BTreeMap<String, StockLevels> {
    entries
        .iter()
        .map(|(id, count)| {
            let mut levels = StockLevels::new();
            levels.set(bodega(), *count);
            (id.to_string(), levels)
        })
        .collect()
}

fn process_lines(lineas: Vec<ProcessLineRequest>) -> ProcessRequest {
    ProcessRequest {
        productos: lineas,
        notas: Some("entrega coordinada con transportadora".to_string()),
    }
}

fn final_qty(id: &str, cantidad_final: u32) -> ProcessLineRequest {
    ProcessLineRequest {
        id: id.to_string(),
        cantidad_final,
        precio: None,
    }
}

/// A zero-final-quantity line stays on the order informationally but
/// contributes nothing to totals and reserves nothing.
#[test]
fn zero_quantity_line_is_informational() {
    let order = created_order();
    let mut stock = warehouse_stock(&[("P001", 10), ("P002", 10)]);

    let draft = apply_processing(
        &order,
        &process_lines(vec![final_qty("P001", 4), final_qty("P002", 0)]),
        &mut stock,
        &bodega(),
        "bodega@example.com",
        fecha(),
    )
    .unwrap();

    let processed = &draft.order;
    assert_eq!(processed.estado, OrderStatus::PedidoCreado);
    assert_eq!(processed.productos.len(), 2);

    let skipped = &processed.productos[1];
    assert_eq!(skipped.cantidad, 0);
    assert_eq!(skipped.cantidad_solicitada, Some(2));
    assert_eq!(skipped.total, Decimal::ZERO);

    // Only line 1 in totals: 4 x (1000 + 190)
    assert_eq!(processed.subtotal, dec!(4000));
    assert_eq!(processed.iva, dec!(760.00));
    assert_eq!(processed.total, dec!(4760.00));

    // Only line 1 reserved
    assert_eq!(draft.reservas.len(), 1);
    assert_eq!(draft.reservas[0].producto, "P001");
    assert_eq!(stock["P001"].available(&bodega()), 6);
    assert_eq!(stock["P002"].available(&bodega()), 10);
}

/// A final quantity above warehouse stock fails the whole transition;
/// the original order is untouched.
#[test]
fn processing_fails_whole_on_short_stock() {
    let order = created_order();
    let mut stock = warehouse_stock(&[("P001", 3), ("P002", 10)]);

    let err = apply_processing(
        &order,
        &process_lines(vec![final_qty("P001", 4), final_qty("P002", 2)]),
        &mut stock,
        &bodega(),
        "bodega@example.com",
        fecha(),
    )
    .unwrap_err();

    assert_eq!(
        err,
        OrderBuildError::StockInsuficiente {
            producto: "P001".to_string(),
            disponible: 3,
            solicitado: 4,
        }
    );
    assert_eq!(order.estado, OrderStatus::OrdenCompraCreada);
}

/// Request lines naming products outside the original order are skipped
/// silently.
#[test]
fn unknown_request_lines_are_skipped() {
    let order = created_order();
    let mut stock = warehouse_stock(&[("P001", 10)]);

    let draft = apply_processing(
        &order,
        &process_lines(vec![final_qty("P001", 6), final_qty("P777", 5)]),
        &mut stock,
        &bodega(),
        "bodega@example.com",
        fecha(),
    )
    .unwrap();

    assert_eq!(draft.order.productos.len(), 1);
    assert_eq!(draft.order.productos[0].id, "P001");
}

/// A price override re-quotes the line under the order's mode so the
/// identities keep holding.
#[test]
fn price_override_requotes_under_order_mode() {
    let order = created_order();
    let mut stock = warehouse_stock(&[("P001", 10), ("P002", 10)]);

    let draft = apply_processing(
        &order,
        &process_lines(vec![
            ProcessLineRequest {
                id: "P001".to_string(),
                cantidad_final: 2,
                precio: Some(dec!(900)),
            },
            final_qty("P002", 0),
        ]),
        &mut stock,
        &bodega(),
        "bodega@example.com",
        fecha(),
    )
    .unwrap();

    let line = &draft.order.productos[0];
    assert_eq!(line.precio_sin_iva, dec!(900));
    assert_eq!(line.iva_unitario, dec!(171.00));
    assert_eq!(line.precio, dec!(1071.00));
    assert_eq!(line.total, dec!(2142.00));

    let recomputed = draft.order.totals_from_lines();
    assert_eq!(recomputed.total, draft.order.total);
}

/// Processing stamps the audit fields.
#[test]
fn processing_stamps_audit_fields() {
    let order = created_order();
    let mut stock = warehouse_stock(&[("P001", 10), ("P002", 10)]);

    let draft = apply_processing(
        &order,
        &process_lines(vec![final_qty("P001", 1), final_qty("P002", 1)]),
        &mut stock,
        &bodega(),
        "bodega@example.com",
        fecha(),
    )
    .unwrap();

    let stamp = draft.order.procesamiento.as_ref().unwrap();
    assert_eq!(stamp.procesado_por, "bodega@example.com");
    assert_eq!(stamp.bodega_procesadora, bodega());
    assert_eq!(stamp.fecha_procesado, fecha());
    assert_eq!(
        stamp.notas_procesamiento.as_deref(),
        Some("entrega coordinada con transportadora")
    );
}

/// The processed order keeps the wire shape of the original documents:
/// Spanish field names, flattened processing stamp, historical status
/// strings.
#[test]
fn processed_order_wire_shape() {
    let order = created_order();
    let mut stock = warehouse_stock(&[("P001", 10), ("P002", 10)]);

    let draft = apply_processing(
        &order,
        &process_lines(vec![final_qty("P001", 4), final_qty("P002", 2)]),
        &mut stock,
        &bodega(),
        "bodega@example.com",
        fecha(),
    )
    .unwrap();

    let value = serde_json::to_value(&draft.order).unwrap();
    assert_eq!(value["estado"], json!("Pedido creado"));
    assert_eq!(value["tipo_precio"], json!("con_iva"));
    assert_eq!(value["bodega_procesadora"], json!("medellin"));
    assert_eq!(value["productos"][0]["cantidad_solicitada"], json!(6));
    assert_eq!(value["productos"][0]["iva_unitario"], json!("190.00"));

    // Unprocessed orders serialize without the processing columns
    let created = serde_json::to_value(&created_order()).unwrap();
    assert!(created.get("procesado_por").is_none());
    assert!(created.get("cantidad_solicitada").is_none());
}
