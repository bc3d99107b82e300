//! Invoice line aggregation: subtotal, discount, tax, grand total.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fiscalerp_core::{
    CurrencyCode, FiscalError, FiscalResult, ProductId, ValueObject, money,
};
use fiscalerp_fiscal::{TaxClassCode, TaxRuleTable};

/// One invoice line as entered by the caller. Immutable once the invoice is
/// composed; validated by the aggregator, not on entry, so a draft can hold
/// work-in-progress values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub product_id: ProductId,
    pub description: String,
    /// Positive, at most 3 decimal places.
    pub quantity: Decimal,
    /// Non-negative unit price in the invoice currency.
    pub unit_price: Decimal,
    /// Percentage in [0, 100].
    pub discount_pct: Decimal,
    pub tax_class: TaxClassCode,
}

impl InvoiceLine {
    fn validate(&self) -> FiscalResult<()> {
        if self.quantity <= Decimal::ZERO || !money::fits_quantity_scale(self.quantity) {
            return Err(FiscalError::InvalidLineQuantity(format!(
                "quantity must be positive with at most 3 decimals, got {}",
                self.quantity
            )));
        }
        if self.unit_price < Decimal::ZERO {
            return Err(FiscalError::validation(format!(
                "unit price cannot be negative, got {}",
                self.unit_price
            )));
        }
        if self.discount_pct < Decimal::ZERO || self.discount_pct > Decimal::ONE_HUNDRED {
            return Err(FiscalError::InvalidDiscount(format!(
                "discount percentage must lie in [0, 100], got {}",
                self.discount_pct
            )));
        }
        Ok(())
    }
}

/// Derived invoice totals. Recomputed while the invoice is a draft, frozen
/// once composed. The identity `grand_total = subtotal − total_discount +
/// total_tax` holds exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub total_discount: Decimal,
    pub total_tax: Decimal,
    pub grand_total: Decimal,
    pub currency: CurrencyCode,
    /// Exchange rate to the base currency (DOP); 1 for base-currency
    /// invoices.
    pub exchange_rate: Decimal,
}

impl InvoiceTotals {
    /// Grand total converted to the base currency.
    pub fn grand_total_in_base(&self) -> Decimal {
        money::round_money(self.grand_total * self.exchange_rate)
    }
}

impl ValueObject for InvoiceTotals {}

/// Aggregate line items under the given tax table.
///
/// Per line: `subtotal = quantity × unit_price`, `discount = subtotal ×
/// pct/100`, `tax = (subtotal − discount) × rate`. Each line's figures are
/// rounded to 2 decimals before summation: the printed fiscal document shows
/// rounded lines, and the totals must equal the sum of the printed lines.
pub fn compute_totals(
    lines: &[InvoiceLine],
    taxes: &TaxRuleTable,
    currency: CurrencyCode,
    exchange_rate: Decimal,
) -> FiscalResult<InvoiceTotals> {
    if lines.is_empty() {
        return Err(FiscalError::EmptyLineSet);
    }
    if exchange_rate <= Decimal::ZERO {
        return Err(FiscalError::validation(format!(
            "exchange rate must be positive, got {exchange_rate}"
        )));
    }

    let mut subtotal = Decimal::ZERO;
    let mut total_discount = Decimal::ZERO;
    let mut total_tax = Decimal::ZERO;

    for line in lines {
        line.validate()?;
        let rate = taxes.rate_of(&line.tax_class)?;

        let line_subtotal = money::round_money(line.quantity * line.unit_price);
        let line_discount =
            money::round_money(line_subtotal * line.discount_pct / Decimal::ONE_HUNDRED);
        let line_taxable = line_subtotal - line_discount;
        let line_tax = money::round_money(line_taxable * rate);

        subtotal += line_subtotal;
        total_discount += line_discount;
        total_tax += line_tax;
    }

    Ok(InvoiceTotals {
        subtotal,
        total_discount,
        total_tax,
        grand_total: subtotal - total_discount + total_tax,
        currency,
        exchange_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn table() -> TaxRuleTable {
        TaxRuleTable::dominican_defaults()
    }

    fn class(s: &str) -> TaxClassCode {
        TaxClassCode::new(s).unwrap()
    }

    fn line(qty: Decimal, price: Decimal, discount: Decimal, tax: &str) -> InvoiceLine {
        InvoiceLine {
            product_id: ProductId::new(),
            description: "item".into(),
            quantity: qty,
            unit_price: price,
            discount_pct: discount,
            tax_class: class(tax),
        }
    }

    #[test]
    fn single_line_with_discount_and_itbis() {
        let totals = compute_totals(
            &[line(dec!(2), dec!(100), dec!(10), "itbis-18")],
            &table(),
            CurrencyCode::dop(),
            Decimal::ONE,
        )
        .unwrap();

        assert_eq!(totals.subtotal, dec!(200.00));
        assert_eq!(totals.total_discount, dec!(20.00));
        assert_eq!(totals.total_tax, dec!(32.40));
        assert_eq!(totals.grand_total, dec!(212.40));
    }

    #[test]
    fn multi_line_mixed_tax_classes() {
        let totals = compute_totals(
            &[
                line(dec!(1), dec!(1000), dec!(0), "itbis-18"),
                line(dec!(3), dec!(50), dec!(0), "zero-rate"),
            ],
            &table(),
            CurrencyCode::dop(),
            Decimal::ONE,
        )
        .unwrap();

        assert_eq!(totals.subtotal, dec!(1150.00));
        assert_eq!(totals.total_discount, dec!(0.00));
        assert_eq!(totals.total_tax, dec!(180.00));
        assert_eq!(totals.grand_total, dec!(1330.00));
    }

    #[test]
    fn line_figures_are_rounded_before_summation() {
        // 3 × 0.335 = 1.005 → printed as 1.01; tax 18% of 1.01 = 0.1818 → 0.18.
        let totals = compute_totals(
            &[line(dec!(3), dec!(0.335), dec!(0), "itbis-18")],
            &table(),
            CurrencyCode::dop(),
            Decimal::ONE,
        )
        .unwrap();
        assert_eq!(totals.subtotal, dec!(1.01));
        assert_eq!(totals.total_tax, dec!(0.18));
        assert_eq!(totals.grand_total, dec!(1.19));
    }

    #[test]
    fn fractional_quantity_to_three_decimals() {
        let totals = compute_totals(
            &[line(dec!(1.250), dec!(80), dec!(0), "exempt")],
            &table(),
            CurrencyCode::dop(),
            Decimal::ONE,
        )
        .unwrap();
        assert_eq!(totals.subtotal, dec!(100.00));
        assert_eq!(totals.total_tax, dec!(0.00));
    }

    #[test]
    fn empty_line_set_is_rejected() {
        let err = compute_totals(&[], &table(), CurrencyCode::dop(), Decimal::ONE).unwrap_err();
        assert_eq!(err, FiscalError::EmptyLineSet);
    }

    #[test]
    fn invalid_quantity_and_discount_are_rejected() {
        let err = compute_totals(
            &[line(dec!(0), dec!(10), dec!(0), "itbis-18")],
            &table(),
            CurrencyCode::dop(),
            Decimal::ONE,
        )
        .unwrap_err();
        assert!(matches!(err, FiscalError::InvalidLineQuantity(_)));

        let err = compute_totals(
            &[line(dec!(1.2345), dec!(10), dec!(0), "itbis-18")],
            &table(),
            CurrencyCode::dop(),
            Decimal::ONE,
        )
        .unwrap_err();
        assert!(matches!(err, FiscalError::InvalidLineQuantity(_)));

        let err = compute_totals(
            &[line(dec!(1), dec!(10), dec!(101), "itbis-18")],
            &table(),
            CurrencyCode::dop(),
            Decimal::ONE,
        )
        .unwrap_err();
        assert!(matches!(err, FiscalError::InvalidDiscount(_)));
    }

    #[test]
    fn unknown_tax_class_surfaces_from_lookup() {
        let err = compute_totals(
            &[line(dec!(1), dec!(10), dec!(0), "itbis-30")],
            &table(),
            CurrencyCode::dop(),
            Decimal::ONE,
        )
        .unwrap_err();
        assert_eq!(err, FiscalError::UnknownTaxClass("itbis-30".into()));
    }

    #[test]
    fn foreign_currency_converts_to_base() {
        let totals = compute_totals(
            &[line(dec!(1), dec!(100), dec!(0), "exempt")],
            &table(),
            "USD".parse().unwrap(),
            dec!(58.50),
        )
        .unwrap();
        assert_eq!(totals.grand_total, dec!(100.00));
        assert_eq!(totals.grand_total_in_base(), dec!(5850.00));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: the totals identity holds and every aggregate is
        /// non-negative for any set of valid lines.
        #[test]
        fn totals_identity_holds(
            qtys in prop::collection::vec(1u32..10_000, 1..8),
            prices in prop::collection::vec(0u32..1_000_000, 8),
            discounts in prop::collection::vec(0u32..=100, 8),
        ) {
            let lines: Vec<InvoiceLine> = qtys
                .iter()
                .enumerate()
                .map(|(i, q)| {
                    let tax = if i % 2 == 0 { "itbis-18" } else { "zero-rate" };
                    line(
                        Decimal::new(i64::from(*q), 3),
                        Decimal::new(i64::from(prices[i]), 2),
                        Decimal::from(discounts[i]),
                        tax,
                    )
                })
                .collect();

            let totals =
                compute_totals(&lines, &table(), CurrencyCode::dop(), Decimal::ONE).unwrap();
            prop_assert_eq!(
                totals.grand_total,
                totals.subtotal - totals.total_discount + totals.total_tax
            );
            prop_assert!(totals.subtotal >= Decimal::ZERO);
            prop_assert!(totals.total_discount >= Decimal::ZERO);
            prop_assert!(totals.total_tax >= Decimal::ZERO);
            prop_assert!(totals.total_discount <= totals.subtotal);
        }
    }
}
