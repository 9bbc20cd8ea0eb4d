//! Per-warehouse stock levels and legacy stock normalization.
//!
//! Historical product documents store stock three ways: a flat integer, a
//! numeric string, or a per-warehouse map whose values may themselves be
//! strings. Everything is normalized here, at the ledger's read boundary,
//! into non-negative integers per warehouse; the ambiguity never travels
//! further into the system.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::WarehouseKey;

/// Parse a single legacy stock value. Missing or non-numeric values count
/// as zero; fractional counts are truncated.
fn parse_stock(value: &serde_json::Value) -> i64 {
    let parsed = match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        serde_json::Value::String(s) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    };
    parsed.max(0)
}

/// Normalize a raw stock field into per-warehouse counts.
///
/// A flat value (no per-warehouse split) is attributed entirely to the
/// configured primary warehouse; every other warehouse reads as zero.
pub fn normalize_stock(
    raw: &serde_json::Value,
    primary: &WarehouseKey,
) -> BTreeMap<WarehouseKey, i64> {
    match raw {
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(key, value)| (WarehouseKey::new(key.as_str()), parse_stock(value)))
            .collect(),
        serde_json::Value::Null => BTreeMap::new(),
        flat => {
            let mut out = BTreeMap::new();
            out.insert(primary.clone(), parse_stock(flat));
            out
        }
    }
}

/// A reservation that could not be satisfied. The offending product id is
/// attached by the caller, which knows which line it was planning.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("insufficient stock: available {disponible}, requested {solicitado}")]
pub struct StockShortage {
    pub disponible: i64,
    pub solicitado: u32,
}

/// In-memory per-warehouse stock counters.
///
/// Used to plan a whole order's reservations before anything is written:
/// if any line fails, the plan is discarded and no stock has moved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockLevels(BTreeMap<WarehouseKey, i64>);

impl StockLevels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a legacy raw stock field.
    pub fn from_raw(raw: &serde_json::Value, primary: &WarehouseKey) -> Self {
        Self(normalize_stock(raw, primary))
    }

    pub fn set(&mut self, warehouse: WarehouseKey, quantity: i64) {
        self.0.insert(warehouse, quantity.max(0));
    }

    /// Current count at `warehouse`; unknown warehouses hold zero.
    pub fn available(&self, warehouse: &WarehouseKey) -> i64 {
        self.0.get(warehouse).copied().unwrap_or(0)
    }

    /// Reserve `cantidad` units at `warehouse`, returning the new count.
    ///
    /// A zero-quantity reservation is a no-op that neither fails nor
    /// mutates anything (lines the warehouse chooses not to dispatch).
    /// A reservation that would drive the count negative fails and leaves
    /// the count unchanged.
    pub fn reserve(
        &mut self,
        warehouse: &WarehouseKey,
        cantidad: u32,
    ) -> Result<i64, StockShortage> {
        let disponible = self.available(warehouse);
        if cantidad == 0 {
            return Ok(disponible);
        }
        if i64::from(cantidad) > disponible {
            return Err(StockShortage {
                disponible,
                solicitado: cantidad,
            });
        }
        let remaining = disponible - i64::from(cantidad);
        self.0.insert(warehouse.clone(), remaining);
        Ok(remaining)
    }

    /// Return previously reserved units (compensation path).
    pub fn restore(&mut self, warehouse: &WarehouseKey, cantidad: u32) {
        let current = self.available(warehouse);
        self.0.insert(warehouse.clone(), current + i64::from(cantidad));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&WarehouseKey, &i64)> {
        self.0.iter()
    }

    /// Total units across all warehouses.
    pub fn total(&self) -> i64 {
        self.0.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wh(key: &str) -> WarehouseKey {
        WarehouseKey::new(key)
    }

    #[test]
    fn flat_integer_lands_on_primary_warehouse() {
        let levels = StockLevels::from_raw(&json!(25), &wh("medellin"));
        assert_eq!(levels.available(&wh("medellin")), 25);
        assert_eq!(levels.available(&wh("guarne")), 0);
    }

    #[test]
    fn string_counts_are_parsed() {
        let levels = StockLevels::from_raw(&json!({"medellin": "12", "guarne": 3}), &wh("medellin"));
        assert_eq!(levels.available(&wh("medellin")), 12);
        assert_eq!(levels.available(&wh("guarne")), 3);
    }

    #[test]
    fn garbage_and_missing_values_normalize_to_zero() {
        let levels = StockLevels::from_raw(&json!({"medellin": "n/a", "guarne": null}), &wh("medellin"));
        assert_eq!(levels.available(&wh("medellin")), 0);
        assert_eq!(levels.available(&wh("guarne")), 0);

        let levels = StockLevels::from_raw(&serde_json::Value::Null, &wh("medellin"));
        assert_eq!(levels.available(&wh("medellin")), 0);
    }

    #[test]
    fn negative_legacy_values_clamp_to_zero() {
        let levels = StockLevels::from_raw(&json!(-4), &wh("medellin"));
        assert_eq!(levels.available(&wh("medellin")), 0);
    }

    #[test]
    fn reserve_decrements_and_returns_new_count() {
        let mut levels = StockLevels::from_raw(&json!({"medellin": 10}), &wh("medellin"));
        assert_eq!(levels.reserve(&wh("medellin"), 4), Ok(6));
        assert_eq!(levels.available(&wh("medellin")), 6);
    }

    #[test]
    fn over_reservation_fails_and_leaves_stock_unchanged() {
        let mut levels = StockLevels::from_raw(&json!({"medellin": 10}), &wh("medellin"));
        let err = levels.reserve(&wh("medellin"), 11).unwrap_err();
        assert_eq!(err.disponible, 10);
        assert_eq!(err.solicitado, 11);
        assert_eq!(levels.available(&wh("medellin")), 10);
    }

    #[test]
    fn zero_reservation_is_a_no_op() {
        let mut levels = StockLevels::from_raw(&json!({"guarne": 0}), &wh("medellin"));
        assert_eq!(levels.reserve(&wh("guarne"), 0), Ok(0));
        assert_eq!(levels.reserve(&wh("nunca-visto"), 0), Ok(0));
    }

    #[test]
    fn restore_compensates_a_reservation() {
        let mut levels = StockLevels::from_raw(&json!({"medellin": 5}), &wh("medellin"));
        levels.reserve(&wh("medellin"), 5).unwrap();
        levels.restore(&wh("medellin"), 5);
        assert_eq!(levels.available(&wh("medellin")), 5);
    }
}
