//! Product catalog models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::stock::StockLevels;
use crate::types::PriceMode;

/// The three list prices a product carries, one per tax variant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceSet {
    pub sin_iva: Decimal,
    pub con_iva: Decimal,
    pub internacional: Decimal,
}

impl PriceSet {
    /// Tax-exempt base price used by the price calculator under `mode`.
    pub fn base_for(&self, mode: PriceMode) -> Decimal {
        match mode {
            PriceMode::ConIva | PriceMode::SinIva => self.sin_iva,
            PriceMode::SinIvaInternacional => self.internacional,
        }
    }

    /// Catalog display price for a distributor buying under `mode`.
    pub fn display_for(&self, mode: PriceMode) -> Decimal {
        match mode {
            PriceMode::ConIva => self.con_iva,
            PriceMode::SinIva => self.sin_iva,
            PriceMode::SinIvaInternacional => self.internacional,
        }
    }

    /// All price set values must be non-negative.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.sin_iva < Decimal::ZERO
            || self.con_iva < Decimal::ZERO
            || self.internacional < Decimal::ZERO
        {
            return Err("los precios no pueden ser negativos");
        }
        Ok(())
    }
}

/// A catalog product with per-warehouse stock.
///
/// Products are never hard-deleted; `activo` gates visibility instead so
/// historical order lines keep a valid reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Human-assigned stable identifier ("P001", "P002", ...).
    pub id: String,
    pub admin_id: String,
    pub nombre: String,
    pub categoria: String,
    #[serde(default)]
    pub descripcion: String,
    #[serde(default)]
    pub imagen: String,
    pub precios: PriceSet,
    pub stock: StockLevels,
    pub activo: bool,
    #[serde(default)]
    pub en_produccion: bool,
    pub creado_en: DateTime<Utc>,
    pub actualizado_en: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn prices() -> PriceSet {
        PriceSet {
            sin_iva: dec!(1000),
            con_iva: dec!(1190),
            internacional: dec!(900),
        }
    }

    #[test]
    fn base_price_by_mode() {
        let p = prices();
        assert_eq!(p.base_for(PriceMode::ConIva), dec!(1000));
        assert_eq!(p.base_for(PriceMode::SinIva), dec!(1000));
        assert_eq!(p.base_for(PriceMode::SinIvaInternacional), dec!(900));
    }

    #[test]
    fn display_price_by_mode() {
        let p = prices();
        assert_eq!(p.display_for(PriceMode::ConIva), dec!(1190));
        assert_eq!(p.display_for(PriceMode::SinIvaInternacional), dec!(900));
    }

    #[test]
    fn negative_prices_are_rejected() {
        let mut p = prices();
        assert!(p.validate().is_ok());
        p.internacional = dec!(-1);
        assert!(p.validate().is_err());
    }
}
