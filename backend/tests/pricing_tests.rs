//! Price calculator tests
//!
//! Covers the tax-variant unit quoting rules:
//! - 19% IVA applied per unit, rounded to 2 decimals before quantities
//! - Exempt modes carry zero tax
//! - Order totals reconcile: subtotal + iva == total == Σ line totals

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::str::FromStr;

use shared::pricing::{quote_unit, round_money, Totals, IVA_RATE};
use shared::types::PriceMode;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[test]
fn iva_rate_is_19_percent() {
    assert_eq!(IVA_RATE, dec("0.19"));
}

/// Four units at base 1000 under con_iva: unit tax 190, effective unit
/// price 1190, line total 4760, subtotal 4000, tax 760, total 4760.
#[test]
fn tax_inclusive_order_of_four_units() {
    let quote = quote_unit(dec("1000"), PriceMode::ConIva);
    assert_eq!(quote.iva_unitario, dec("190.00"));
    assert_eq!(quote.precio, dec("1190.00"));
    assert_eq!(quote.line_total(4), dec("4760.00"));

    let mut totals = Totals::default();
    totals.add_line(&quote, 4);
    assert_eq!(totals.subtotal, dec("4000"));
    assert_eq!(totals.iva, dec("760.00"));
    assert_eq!(totals.total, dec("4760.00"));
}

/// International mode at base 500, quantity 3: no tax, line total 1500.
#[test]
fn international_order_carries_no_tax() {
    let quote = quote_unit(dec("500"), PriceMode::SinIvaInternacional);
    assert_eq!(quote.iva_unitario, Decimal::ZERO);
    assert_eq!(quote.precio, dec("500"));
    assert_eq!(quote.line_total(3), dec("1500"));

    let mut totals = Totals::default();
    totals.add_line(&quote, 3);
    assert_eq!(totals.subtotal, dec("1500"));
    assert_eq!(totals.iva, Decimal::ZERO);
    assert_eq!(totals.total, dec("1500"));
}

#[test]
fn domestic_exempt_matches_international_math() {
    let a = quote_unit(dec("742.17"), PriceMode::SinIva);
    let b = quote_unit(dec("742.17"), PriceMode::SinIvaInternacional);
    assert_eq!(a, b);
}

/// Rounding happens at the unit level, so a large order amplifies the
/// rounded unit tax exactly, with no cent drift.
#[test]
fn no_cent_drift_on_large_orders() {
    let quote = quote_unit(dec("33.33"), PriceMode::ConIva);
    assert_eq!(quote.iva_unitario, dec("6.33"));

    let mut totals = Totals::default();
    totals.add_line(&quote, 10_000);
    assert_eq!(totals.iva, dec("63300.00"));
    assert_eq!(totals.total, totals.subtotal + totals.iva);
    assert_eq!(totals.total, quote.line_total(10_000));
}

#[test]
fn round_money_is_half_away_from_zero() {
    assert_eq!(round_money(dec("1.005")), dec("1.01"));
    assert_eq!(round_money(dec("1.004")), dec("1.00"));
    assert_eq!(round_money(dec("-1.005")), dec("-1.01"));
}

// ============================================================================
// Property Tests
// ============================================================================

fn money_strategy() -> impl Strategy<Value = Decimal> {
    // Base prices from 0.01 to 10,000,000.00 with cent precision
    (1i64..=1_000_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn mode_strategy() -> impl Strategy<Value = PriceMode> {
    prop_oneof![
        Just(PriceMode::ConIva),
        Just(PriceMode::SinIva),
        Just(PriceMode::SinIvaInternacional),
    ]
}

proptest! {
    /// The calculator is a pure function: same input, same output.
    #[test]
    fn quoting_is_deterministic(base in money_strategy(), mode in mode_strategy()) {
        prop_assert_eq!(quote_unit(base, mode), quote_unit(base, mode));
    }

    /// The effective price always decomposes into base plus unit tax.
    #[test]
    fn effective_price_decomposes(base in money_strategy(), mode in mode_strategy()) {
        let quote = quote_unit(base, mode);
        prop_assert_eq!(quote.precio, round_money(quote.precio_sin_iva + quote.iva_unitario));
        prop_assert!(quote.iva_unitario >= Decimal::ZERO);
    }

    /// Order totals reconcile to the cent for arbitrary multi-line orders.
    #[test]
    fn totals_reconcile(
        lines in prop::collection::vec((money_strategy(), 1u32..500, mode_strategy()), 1..20)
    ) {
        let mut totals = Totals::default();
        let mut line_sum = Decimal::ZERO;
        for (base, cantidad, mode) in &lines {
            let quote = quote_unit(*base, *mode);
            totals.add_line(&quote, *cantidad);
            line_sum += quote.line_total(*cantidad);
        }
        prop_assert_eq!(totals.total, totals.subtotal + totals.iva);
        prop_assert_eq!(totals.total, line_sum);
    }

    /// Exempt modes never produce tax; the inclusive mode always does for
    /// a positive base.
    #[test]
    fn tax_follows_the_mode(base in money_strategy()) {
        prop_assert_eq!(quote_unit(base, PriceMode::SinIva).iva_unitario, Decimal::ZERO);
        prop_assert_eq!(
            quote_unit(base, PriceMode::SinIvaInternacional).iva_unitario,
            Decimal::ZERO
        );
        if base >= dec!(0.03) {
            prop_assert!(quote_unit(base, PriceMode::ConIva).iva_unitario > Decimal::ZERO);
        }
    }
}
