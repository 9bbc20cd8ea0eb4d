//! Common types used across the platform

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tax variant applied to a distributor's prices and, by extension, to
/// every order that distributor places. Fixed for the lifetime of an order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PriceMode {
    /// Domestic price with 19% IVA added on top of the base price.
    #[serde(rename = "con_iva")]
    ConIva,
    /// Domestic tax-exempt price.
    #[serde(rename = "sin_iva")]
    SinIva,
    /// International (export) tax-exempt price.
    #[serde(rename = "sin_iva_internacional")]
    SinIvaInternacional,
}

impl PriceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceMode::ConIva => "con_iva",
            PriceMode::SinIva => "sin_iva",
            PriceMode::SinIvaInternacional => "sin_iva_internacional",
        }
    }

    /// Parse a wire string, rejecting anything outside the three modes.
    pub fn parse(value: &str) -> Result<Self, InvalidPriceMode> {
        match value {
            "con_iva" => Ok(PriceMode::ConIva),
            "sin_iva" => Ok(PriceMode::SinIva),
            "sin_iva_internacional" => Ok(PriceMode::SinIvaInternacional),
            other => Err(InvalidPriceMode(other.to_string())),
        }
    }

    /// Which warehouse region fulfills orders placed under this mode.
    /// International orders draw from the export warehouse, everything
    /// else from the domestic one.
    pub fn fulfillment_region(&self) -> FulfillmentRegion {
        match self {
            PriceMode::SinIvaInternacional => FulfillmentRegion::Export,
            _ => FulfillmentRegion::Domestic,
        }
    }

    /// Whether IVA applies under this mode.
    pub fn applies_iva(&self) -> bool {
        matches!(self, PriceMode::ConIva)
    }
}

impl fmt::Display for PriceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized price mode strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid price mode: {0}")]
pub struct InvalidPriceMode(pub String);

/// Fulfillment region resolved from a price mode. The concrete warehouse
/// key behind each region comes from configuration, not from code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FulfillmentRegion {
    Domestic,
    Export,
}

/// A fulfillment location key ("medellin", "guarne", ...). Open set:
/// new warehouses are configuration data, never new code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct WarehouseKey(String);

impl WarehouseKey {
    /// Warehouse keys are matched case-insensitively in the source data;
    /// normalize once on construction.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WarehouseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WarehouseKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_mode_round_trips_wire_strings() {
        for raw in ["con_iva", "sin_iva", "sin_iva_internacional"] {
            assert_eq!(PriceMode::parse(raw).unwrap().as_str(), raw);
        }
    }

    #[test]
    fn unknown_price_mode_is_rejected() {
        assert!(PriceMode::parse("iva_reducido").is_err());
        assert!(PriceMode::parse("").is_err());
    }

    #[test]
    fn international_mode_maps_to_export_region() {
        assert_eq!(
            PriceMode::SinIvaInternacional.fulfillment_region(),
            FulfillmentRegion::Export
        );
        assert_eq!(PriceMode::ConIva.fulfillment_region(), FulfillmentRegion::Domestic);
        assert_eq!(PriceMode::SinIva.fulfillment_region(), FulfillmentRegion::Domestic);
    }

    #[test]
    fn warehouse_keys_normalize_case() {
        assert_eq!(WarehouseKey::new("Medellin"), WarehouseKey::new("medellin"));
        assert_eq!(WarehouseKey::new(" GUARNE "), WarehouseKey::new("guarne"));
    }
}
