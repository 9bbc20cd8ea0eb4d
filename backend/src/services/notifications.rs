//! Order notification service
//!
//! Renders the order emails and delivers them through a transactional
//! mail HTTP API. Delivery is strictly best-effort: a persisted order is
//! never rolled back because a mail failed; failures are logged and the
//! request proceeds.

use serde::{Deserialize, Serialize};

use rust_decimal::Decimal;
use shared::models::order::{Order, OrderKind};
use shared::types::WarehouseKey;

use crate::config::MailConfig;

/// Transactional mail API client
#[derive(Clone)]
pub struct MailerClient {
    api_endpoint: String,
    api_key: String,
    from_address: String,
    http_client: reqwest::Client,
}

/// Mail send request body
#[derive(Debug, Serialize)]
struct SendMailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Mail API error response
#[derive(Debug, Deserialize)]
struct MailApiResponse {
    #[serde(default)]
    message: Option<String>,
}

impl MailerClient {
    pub fn new(api_endpoint: String, api_key: String, from_address: String) -> Self {
        Self {
            api_endpoint,
            api_key,
            from_address,
            http_client: reqwest::Client::new(),
        }
    }

    /// Send one HTML mail.
    pub async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), String> {
        let request = SendMailRequest {
            from: &self.from_address,
            to,
            subject,
            html,
        };

        let response = self
            .http_client
            .post(&self.api_endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Failed to reach mail API: {}", e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let error: MailApiResponse = response
                .json()
                .await
                .unwrap_or(MailApiResponse {
                    message: Some("Unknown error".to_string()),
                });
            Err(error.message.unwrap_or_else(|| "Unknown error".to_string()))
        }
    }
}

/// Order notification dispatcher
#[derive(Clone)]
pub struct Notifier {
    client: Option<MailerClient>,
    config: MailConfig,
}

impl Notifier {
    /// Create a notifier from the mail configuration. An empty endpoint
    /// disables outbound mail (useful in development).
    pub fn new(config: &MailConfig) -> Self {
        let client = if config.api_endpoint.is_empty() {
            None
        } else {
            Some(MailerClient::new(
                config.api_endpoint.clone(),
                config.api_key.clone(),
                config.from_address.clone(),
            ))
        };
        Self {
            client,
            config: config.clone(),
        }
    }

    /// Notify all parties that an order was created: operations, the
    /// fulfillment center serving the order's region, and the distributor.
    pub async fn notify_order_created(
        &self,
        order: &Order,
        distributor_email: &str,
        region_warehouse: &WarehouseKey,
    ) {
        let (asunto_admin, asunto_dist) = match order.kind {
            OrderKind::OrdenCompra => (
                format!(
                    "Nueva Orden de Compra: {} - {}",
                    order.id, order.distribuidor_nombre
                ),
                format!("Confirmación de Orden de Compra: {}", order.id),
            ),
            OrderKind::Pedido => (
                format!("Nuevo Pedido: {} - {}", order.id, order.distribuidor_nombre),
                format!("Confirmación de Pedido: {}", order.id),
            ),
        };

        let mensaje_admin = render_order_email(order, Audience::Operaciones);
        let mensaje_distribuidor = render_order_email(order, Audience::Distribuidor);

        self.send_best_effort(&self.config.operations_address, &asunto_admin, &mensaje_admin)
            .await;

        if let Some(cdi_address) = self.config.address_for_warehouse(region_warehouse) {
            self.send_best_effort(cdi_address, &asunto_admin, &mensaje_admin)
                .await;
        }

        self.send_best_effort(distributor_email, &asunto_dist, &mensaje_distribuidor)
            .await;
    }

    /// Notify all parties that a warehouse processed an order.
    pub async fn notify_order_processed(
        &self,
        order: &Order,
        distributor_email: &str,
        region_warehouse: &WarehouseKey,
    ) {
        let asunto_admin = format!("Nuevo Pedido: {} - {}", order.id, order.distribuidor_nombre);
        let asunto_dist = format!("Confirmación de Pedido: {}", order.id);

        let mensaje_admin = render_order_email(order, Audience::Operaciones);
        let mensaje_distribuidor = render_order_email(order, Audience::Distribuidor);

        self.send_best_effort(&self.config.operations_address, &asunto_admin, &mensaje_admin)
            .await;

        if let Some(cdi_address) = self.config.address_for_warehouse(region_warehouse) {
            self.send_best_effort(cdi_address, &asunto_admin, &mensaje_admin)
                .await;
        }

        self.send_best_effort(distributor_email, &asunto_dist, &mensaje_distribuidor)
            .await;
    }

    async fn send_best_effort(&self, to: &str, subject: &str, html: &str) {
        let Some(client) = &self.client else {
            tracing::debug!("Mail disabled, skipping '{}' to {}", subject, to);
            return;
        };
        if let Err(e) = client.send(to, subject, html).await {
            tracing::warn!("Failed to send '{}' to {}: {}", subject, to, e);
        } else {
            tracing::info!("Mail sent to {}: {}", to, subject);
        }
    }
}

// ============================================================================
// Email rendering
// ============================================================================

/// Who an order email is addressed to; controls the heading copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Operaciones,
    Distribuidor,
}

const ESTILO_CORREO: &str = r#"
<style>
    body { font-family: 'Arial', sans-serif; line-height: 1.6; color: #333; }
    .container { max-width: 600px; margin: 0 auto; padding: 20px; }
    .header { background-color: #f8f1e9; padding: 20px; text-align: center; border-radius: 5px 5px 0 0; }
    .content { padding: 20px; background-color: #fff; border: 1px solid #e0e0e0; border-top: none; }
    .footer { text-align: center; padding: 20px; font-size: 12px; color: #777; }
    .product-table { width: 100%; border-collapse: collapse; margin: 15px 0; }
    .product-table th { background-color: #f8f1e9; text-align: left; padding: 10px; }
    .product-table td { padding: 10px; border-bottom: 1px solid #e0e0e0; }
    .totals { margin-top: 20px; padding: 15px; background-color: #f9f9f9; border-radius: 5px; }
    .totals-row { display: flex; justify-content: space-between; margin-bottom: 8px; }
    .total-final { font-weight: bold; font-size: 1.1em; border-top: 1px solid #ddd; padding-top: 10px; }
    .status { display: inline-block; padding: 5px 10px; background-color: #e3f2fd; color: #1976d2; border-radius: 3px; }
</style>
"#;

/// Format a money amount with thousands separators, no decimals, as the
/// historical emails did ("$4,760").
pub fn format_money(value: Decimal) -> String {
    let rounded = value.round_dp(0).normalize().to_string();
    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rounded.as_str()),
    };
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{}${}", sign, grouped)
}

/// Product table section. Processed orders show requested vs dispatched
/// quantities; unprocessed orders show a single quantity column.
fn productos_html(order: &Order) -> String {
    let procesado = order.procesamiento.is_some();
    let mut html = String::from("<table class=\"product-table\">\n<thead>\n<tr>\n<th>Producto</th>\n");
    if procesado {
        html.push_str("<th>Solicitado</th>\n<th>Despachado</th>\n");
    } else {
        html.push_str("<th>Cantidad</th>\n");
    }
    html.push_str("<th>Precio Unitario</th>\n<th>Total</th>\n</tr>\n</thead>\n<tbody>\n");

    for p in &order.productos {
        html.push_str("<tr>\n");
        html.push_str(&format!("<td>{} (ID: {})</td>\n", p.nombre, p.id));
        if procesado {
            html.push_str(&format!(
                "<td>{}</td>\n<td>{}</td>\n",
                p.cantidad_solicitada.unwrap_or(p.cantidad),
                p.cantidad
            ));
        } else {
            html.push_str(&format!("<td>{}</td>\n", p.cantidad));
        }
        html.push_str(&format!(
            "<td>{}</td>\n<td>{}</td>\n</tr>\n",
            format_money(p.precio),
            format_money(p.total)
        ));
        if order.tipo_precio.applies_iva() {
            let columnas = if procesado { 5 } else { 4 };
            html.push_str(&format!(
                "<tr style=\"color: #666; font-size: 0.9em;\"><td colspan=\"{}\">(IVA incluido: {} x {} = {})</td></tr>\n",
                columnas,
                format_money(p.iva_unitario),
                p.cantidad,
                format_money(p.iva_unitario * Decimal::from(p.cantidad)),
            ));
        }
    }

    html.push_str("</tbody>\n</table>\n");
    html
}

/// Totals section.
fn totales_html(order: &Order) -> String {
    let iva_row = if order.tipo_precio.applies_iva() {
        format!(
            "<div class=\"totals-row\"><span>IVA (19%):</span><span>{}</span></div>",
            format_money(order.iva)
        )
    } else {
        String::new()
    };
    format!(
        r#"<div class="totals">
    <div class="totals-row"><span>Subtotal:</span><span>{}</span></div>
    {}
    <div class="totals-row total-final"><span>Total:</span><span>{}</span></div>
</div>"#,
        format_money(order.subtotal),
        iva_row,
        format_money(order.total)
    )
}

/// Render a full order email.
pub fn render_order_email(order: &Order, audience: Audience) -> String {
    let titulo = match (audience, order.procesamiento.is_some()) {
        (Audience::Operaciones, false) => "Nueva Orden de Compra Recibida",
        (Audience::Operaciones, true) => "Nuevo Pedido Recibido",
        (Audience::Distribuidor, false) => "¡Gracias por tu orden de compra!",
        (Audience::Distribuidor, true) => "¡Gracias por tu pedido!",
    };

    let notas_procesamiento = order
        .procesamiento
        .as_ref()
        .and_then(|p| p.notas_procesamiento.as_deref())
        .filter(|n| !n.is_empty())
        .map(|n| format!("<p><strong>Notas del procesamiento:</strong> {}</p>", n))
        .unwrap_or_default();

    let notas = if order.notas.is_empty() {
        "Ninguna"
    } else {
        &order.notas
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>{titulo} {id}</title>
    {estilo}
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>{titulo}</h1>
        </div>
        <div class="content">
            <p><strong>Número de Orden:</strong> {id}</p>
            <p><strong>Fecha y Hora:</strong> {fecha}</p>
            <p><strong>Estado:</strong> <span class="status">{estado}</span></p>
            <h3>Información del Distribuidor</h3>
            <p><strong>Nombre:</strong> {distribuidor}</p>
            <p><strong>Teléfono:</strong> {telefono}</p>
            <h3>Detalles de Entrega</h3>
            <p><strong>Dirección:</strong> {direccion}</p>
            <p><strong>Notas:</strong> {notas}</p>
            {notas_procesamiento}
            <h3>Productos</h3>
            {productos}
            {totales}
        </div>
        <div class="footer">
            <p>Este es un correo automático, por favor no responder.</p>
        </div>
    </div>
</body>
</html>"#,
        titulo = titulo,
        id = order.id,
        estilo = ESTILO_CORREO,
        fecha = order.fecha.format("%d/%m/%Y %H:%M"),
        estado = order.estado.as_str(),
        distribuidor = order.distribuidor_nombre,
        telefono = order.distribuidor_phone,
        direccion = order.direccion,
        notas = notas,
        notas_procesamiento = notas_procesamiento,
        productos = productos_html(order),
        totales = totales_html(order),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use shared::models::order::{OrderLine, OrderStatus, ProcessingInfo};
    use shared::types::PriceMode;

    fn sample_order(procesado: bool) -> Order {
        Order {
            id: "OC-20250316142255".into(),
            kind: OrderKind::OrdenCompra,
            distribuidor_id: "U004".into(),
            distribuidor_nombre: "Distribuciones del Norte".into(),
            distribuidor_phone: "3001234567".into(),
            productos: vec![OrderLine {
                id: "P001".into(),
                nombre: "Crema de Peinar".into(),
                cantidad: 4,
                cantidad_solicitada: procesado.then_some(6),
                precio: dec!(1190),
                precio_sin_iva: dec!(1000),
                iva_unitario: dec!(190),
                total: dec!(4760),
            }],
            direccion: "Calle 10 # 43-12".into(),
            notas: String::new(),
            fecha: Utc::now(),
            estado: if procesado {
                OrderStatus::PedidoCreado
            } else {
                OrderStatus::OrdenCompraCreada
            },
            subtotal: dec!(4000),
            iva: dec!(760),
            total: dec!(4760),
            tipo_precio: PriceMode::ConIva,
            procesamiento: procesado.then(|| ProcessingInfo {
                procesado_por: "bodega@example.com".into(),
                bodega_procesadora: WarehouseKey::new("medellin"),
                fecha_procesado: Utc::now(),
                notas_procesamiento: Some("entrega parcial".into()),
            }),
        }
    }

    #[test]
    fn formats_money_with_thousands_separators() {
        assert_eq!(format_money(dec!(4760)), "$4,760");
        assert_eq!(format_money(dec!(1234567.49)), "$1,234,567");
        assert_eq!(format_money(dec!(0)), "$0");
        assert_eq!(format_money(dec!(-1500)), "-$1,500");
    }

    #[test]
    fn created_order_email_shows_one_quantity_column() {
        let html = render_order_email(&sample_order(false), Audience::Operaciones);
        assert!(html.contains("Nueva Orden de Compra Recibida"));
        assert!(html.contains("<th>Cantidad</th>"));
        assert!(!html.contains("<th>Despachado</th>"));
        assert!(html.contains("$4,760"));
    }

    #[test]
    fn processed_order_email_shows_requested_and_dispatched() {
        let html = render_order_email(&sample_order(true), Audience::Distribuidor);
        assert!(html.contains("¡Gracias por tu pedido!"));
        assert!(html.contains("<th>Solicitado</th>"));
        assert!(html.contains("<th>Despachado</th>"));
        assert!(html.contains("entrega parcial"));
    }

    #[test]
    fn iva_breakdown_only_for_tax_inclusive_orders() {
        let mut order = sample_order(false);
        let html = render_order_email(&order, Audience::Operaciones);
        assert!(html.contains("IVA (19%)"));

        order.tipo_precio = PriceMode::SinIva;
        let html = render_order_email(&order, Audience::Operaciones);
        assert!(!html.contains("IVA (19%)"));
    }
}
