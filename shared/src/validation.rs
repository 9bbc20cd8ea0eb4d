//! Validation utilities for the Distribution Order Management platform
//!
//! Boundary coercion for the loosely-typed payloads legacy clients send,
//! plus the account-level checks shared by user management and auth.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::models::order::LineRequest;

// ============================================================================
// Order payload coercion
// ============================================================================

/// Coerce a JSON value into an integer quantity. Accepts numbers and
/// numeric strings; anything else is malformed.
fn coerce_cantidad(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f as u64))
            .and_then(|v| u32::try_from(v).ok()),
        serde_json::Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

/// Coerce a JSON value into a decimal price. Accepts numbers and numeric
/// strings.
fn coerce_precio(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        serde_json::Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// Validate and coerce one raw order line. Each line must carry `id`,
/// `cantidad` and `precio`; quantities coerce to integers and prices to
/// decimals, mirroring what historical clients actually send.
pub fn parse_line_request(value: &serde_json::Value) -> Result<LineRequest, &'static str> {
    let obj = value.as_object().ok_or("cada producto debe ser un objeto")?;

    let id = obj
        .get("id")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or("cada producto debe tener 'id'")?;

    let cantidad = obj
        .get("cantidad")
        .and_then(coerce_cantidad)
        .ok_or("cada producto debe tener 'cantidad'")?;

    let precio = obj
        .get("precio")
        .and_then(coerce_precio)
        .filter(|p| *p >= Decimal::ZERO)
        .ok_or("cada producto debe tener 'precio'")?;

    Ok(LineRequest {
        id: id.trim().to_string(),
        cantidad,
        precio,
    })
}

/// Shipping address is required on every order.
pub fn validate_direccion(direccion: &str) -> Result<(), &'static str> {
    if direccion.trim().is_empty() {
        return Err("la orden debe incluir una dirección");
    }
    Ok(())
}

// ============================================================================
// Account validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

/// Validate Colombian phone number format
/// Accepts: 3001234567, 300-123-4567, +573001234567
pub fn validate_phone(phone: &str) -> Result<(), &'static str> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    // Colombian mobile: 10 digits starting with 3
    if digits.len() == 10 && digits.starts_with('3') {
        return Ok(());
    }
    // With country code: 12 digits starting with 57
    if digits.len() == 12 && digits.starts_with("57") {
        return Ok(());
    }
    // Landline with area code: 8 digits
    if digits.len() == 8 {
        return Ok(());
    }

    Err("Invalid Colombian phone number format")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn parses_a_well_formed_line() {
        let line = parse_line_request(&json!({"id": "P001", "cantidad": 4, "precio": 1000})).unwrap();
        assert_eq!(line.id, "P001");
        assert_eq!(line.cantidad, 4);
        assert_eq!(line.precio, dec!(1000));
    }

    #[test]
    fn coerces_string_typed_fields() {
        let line =
            parse_line_request(&json!({"id": "P002", "cantidad": "12", "precio": "99.90"})).unwrap();
        assert_eq!(line.cantidad, 12);
        assert_eq!(line.precio, dec!(99.90));
    }

    #[test]
    fn rejects_missing_fields() {
        assert!(parse_line_request(&json!({"cantidad": 1, "precio": 10})).is_err());
        assert!(parse_line_request(&json!({"id": "P001", "precio": 10})).is_err());
        assert!(parse_line_request(&json!({"id": "P001", "cantidad": 1})).is_err());
        assert!(parse_line_request(&json!("P001")).is_err());
    }

    #[test]
    fn rejects_negative_prices() {
        assert!(parse_line_request(&json!({"id": "P001", "cantidad": 1, "precio": -5})).is_err());
    }

    #[test]
    fn direccion_must_be_present() {
        assert!(validate_direccion("Calle 10 # 43-12, Medellín").is_ok());
        assert!(validate_direccion("   ").is_err());
    }

    #[test]
    fn validates_colombian_phones() {
        assert!(validate_phone("3001234567").is_ok());
        assert!(validate_phone("+57 300 123 4567").is_ok());
        assert!(validate_phone("12345").is_err());
    }

    #[test]
    fn validates_emails_and_passwords() {
        assert!(validate_email("ventas@example.com").is_ok());
        assert!(validate_email("nope").is_err());
        assert!(validate_password("secreta123").is_ok());
        assert!(validate_password("corta").is_err());
    }
}
