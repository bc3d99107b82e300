//! Persistence collaborator for fiscal reference data.

use fiscalerp_core::FiscalResult;

use crate::document_type::{DocumentTypeRegistry, DocumentTypeRule};
use crate::tax::{TaxClass, TaxRuleTable};

/// Black-box source of the reference tables.
///
/// Loaded once at process start; the tables themselves are immutable after
/// [`load_reference_data`] validates them.
pub trait ReferenceDataStore: Send + Sync {
    fn load_tax_classes(&self) -> FiscalResult<Vec<TaxClass>>;
    fn load_document_type_rules(&self) -> FiscalResult<Vec<DocumentTypeRule>>;
}

/// Build the validated tables from a store. Fails fast on duplicate codes,
/// out-of-range rates, or rules referencing unknown tax classes.
pub fn load_reference_data(
    store: &dyn ReferenceDataStore,
) -> FiscalResult<(TaxRuleTable, DocumentTypeRegistry)> {
    let taxes = TaxRuleTable::load(store.load_tax_classes()?)?;
    let registry = DocumentTypeRegistry::load(store.load_document_type_rules()?, &taxes)?;
    Ok((taxes, registry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_type::DocumentTypeCode;
    use crate::tax::TaxClassCode;
    use rust_decimal_macros::dec;

    struct FixtureStore;

    impl ReferenceDataStore for FixtureStore {
        fn load_tax_classes(&self) -> FiscalResult<Vec<TaxClass>> {
            Ok(vec![
                TaxClass::new(TaxClassCode::new("itbis-18")?, "ITBIS 18%", dec!(0.18))?,
                TaxClass::new(TaxClassCode::new("exempt")?, "Exento", dec!(0))?,
            ])
        }

        fn load_document_type_rules(&self) -> FiscalResult<Vec<DocumentTypeRule>> {
            Ok(vec![DocumentTypeRule {
                code: DocumentTypeCode::new("B02")?,
                label: "Consumo Final".into(),
                allowed_tax_classes: [
                    TaxClassCode::new("itbis-18")?,
                    TaxClassCode::new("exempt")?,
                ]
                .into_iter()
                .collect(),
                requires_taxpayer_id: false,
            }])
        }
    }

    #[test]
    fn loads_and_validates_both_tables() {
        let (taxes, registry) = load_reference_data(&FixtureStore).unwrap();
        assert_eq!(
            taxes.rate_of(&TaxClassCode::new("itbis-18").unwrap()).unwrap(),
            dec!(0.18)
        );
        assert!(
            !registry
                .requires_taxpayer_id(&DocumentTypeCode::new("B02").unwrap())
                .unwrap()
        );
    }

    #[test]
    fn rule_referencing_missing_class_fails_at_load() {
        struct BrokenStore;
        impl ReferenceDataStore for BrokenStore {
            fn load_tax_classes(&self) -> FiscalResult<Vec<TaxClass>> {
                Ok(vec![])
            }
            fn load_document_type_rules(&self) -> FiscalResult<Vec<DocumentTypeRule>> {
                Ok(vec![DocumentTypeRule {
                    code: DocumentTypeCode::new("B01")?,
                    label: "Crédito Fiscal".into(),
                    allowed_tax_classes: [TaxClassCode::new("itbis-18")?].into_iter().collect(),
                    requires_taxpayer_id: true,
                }])
            }
        }

        let err = load_reference_data(&BrokenStore).unwrap_err();
        assert_eq!(
            err,
            fiscalerp_core::FiscalError::UnknownTaxClass("itbis-18".into())
        );
    }
}
