//! Tax-variant price calculator.
//!
//! All money is `rust_decimal::Decimal` rounded to 2 decimal places at the
//! *unit* level. Rounding per unit before multiplying by quantity keeps
//! large orders free of cent drift and makes the stored totals reproducible
//! from the stored line items.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::PriceMode;

/// IVA rate applied under [`PriceMode::ConIva`].
pub const IVA_RATE: Decimal = dec!(0.19);

/// Monetary rounding: 2 decimal places, half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Per-unit price triple produced by the calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitQuote {
    /// Effective unit price (tax included when the mode carries IVA).
    pub precio: Decimal,
    /// Tax-exempt base unit price, exactly as supplied by the caller.
    pub precio_sin_iva: Decimal,
    /// Unit tax, zero for the exempt modes.
    pub iva_unitario: Decimal,
}

/// Quote a single unit of product at `base` (tax-exempt) under `mode`.
pub fn quote_unit(base: Decimal, mode: PriceMode) -> UnitQuote {
    match mode {
        PriceMode::ConIva => {
            let iva_unitario = round_money(base * IVA_RATE);
            UnitQuote {
                precio: round_money(base + iva_unitario),
                precio_sin_iva: base,
                iva_unitario,
            }
        }
        PriceMode::SinIva | PriceMode::SinIvaInternacional => UnitQuote {
            precio: base,
            precio_sin_iva: base,
            iva_unitario: Decimal::ZERO,
        },
    }
}

impl UnitQuote {
    /// Line total for `cantidad` units at this quote.
    pub fn line_total(&self, cantidad: u32) -> Decimal {
        self.precio * Decimal::from(cantidad)
    }

    /// Tax contributed to the order by `cantidad` units.
    pub fn line_iva(&self, cantidad: u32) -> Decimal {
        round_money(self.iva_unitario * Decimal::from(cantidad))
    }
}

/// Order-level totals accumulated line by line.
///
/// Invariant: `total == subtotal + iva` and, because unit prices are
/// rounded before multiplication, `total == Σ line totals`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub iva: Decimal,
    pub total: Decimal,
}

impl Totals {
    /// Accumulate one line of `cantidad` units at `quote`.
    pub fn add_line(&mut self, quote: &UnitQuote, cantidad: u32) {
        self.subtotal += quote.precio_sin_iva * Decimal::from(cantidad);
        self.iva += quote.line_iva(cantidad);
        self.total = self.subtotal + self.iva;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn con_iva_quote_adds_19_percent_per_unit() {
        let q = quote_unit(dec!(1000), PriceMode::ConIva);
        assert_eq!(q.iva_unitario, dec!(190.00));
        assert_eq!(q.precio, dec!(1190.00));
        assert_eq!(q.precio_sin_iva, dec!(1000));
    }

    #[test]
    fn exempt_modes_carry_no_tax() {
        for mode in [PriceMode::SinIva, PriceMode::SinIvaInternacional] {
            let q = quote_unit(dec!(500), mode);
            assert_eq!(q.iva_unitario, Decimal::ZERO);
            assert_eq!(q.precio, dec!(500));
            assert_eq!(q.line_total(3), dec!(1500));
        }
    }

    #[test]
    fn unit_rounding_happens_before_quantity() {
        // 19% of 33.33 is 6.3327; rounded per unit to 6.33 the line tax for
        // 100 units is exactly 633.00, not 633.27.
        let q = quote_unit(dec!(33.33), PriceMode::ConIva);
        assert_eq!(q.iva_unitario, dec!(6.33));
        assert_eq!(q.line_iva(100), dec!(633.00));
    }

    #[test]
    fn totals_reconcile_for_a_mixed_order() {
        let mut totals = Totals::default();
        let q1 = quote_unit(dec!(1000), PriceMode::ConIva);
        let q2 = quote_unit(dec!(250.50), PriceMode::ConIva);
        totals.add_line(&q1, 4);
        totals.add_line(&q2, 2);

        assert_eq!(totals.subtotal, dec!(4501.00));
        assert_eq!(totals.iva, dec!(855.20));
        assert_eq!(totals.total, totals.subtotal + totals.iva);
        assert_eq!(totals.total, q1.line_total(4) + q2.line_total(2));
    }

    #[test]
    fn quoting_is_deterministic() {
        let a = quote_unit(dec!(123.45), PriceMode::ConIva);
        let b = quote_unit(dec!(123.45), PriceMode::ConIva);
        assert_eq!(a, b);
    }

    #[test]
    fn scenario_four_units_at_1000_con_iva() {
        let q = quote_unit(dec!(1000), PriceMode::ConIva);
        let mut totals = Totals::default();
        totals.add_line(&q, 4);

        assert_eq!(q.line_total(4), dec!(4760.00));
        assert_eq!(totals.subtotal, dec!(4000));
        assert_eq!(totals.iva, dec!(760.00));
        assert_eq!(totals.total, dec!(4760.00));
    }
}
