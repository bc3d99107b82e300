//! NCF type registry: fiscal document types and their legal constraints.
//!
//! Each fiscal document type (crédito fiscal, consumo final, ...) may only
//! carry a specific set of tax classes, and some types are restricted to
//! customers with a registered taxpayer id. Rules are immutable reference
//! data created at process start.

use core::str::FromStr;
use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use fiscalerp_core::{FiscalError, FiscalResult};

use crate::tax::{TaxClassCode, TaxRuleTable};

/// NCF document type code: an uppercase series letter plus two digits
/// (`B01`, `B02`, `B14`, `B15`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentTypeCode(String);

impl DocumentTypeCode {
    pub fn new(code: impl Into<String>) -> FiscalResult<Self> {
        let code = code.into();
        let mut chars = code.chars();
        let well_formed = code.len() == 3
            && chars.next().is_some_and(|c| c.is_ascii_uppercase())
            && chars.all(|c| c.is_ascii_digit());
        if !well_formed {
            return Err(FiscalError::validation(format!(
                "document type code must be a letter plus two digits, got '{code}'"
            )));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for DocumentTypeCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DocumentTypeCode {
    type Err = FiscalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Rule set for one fiscal document type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTypeRule {
    pub code: DocumentTypeCode,
    pub label: String,
    pub allowed_tax_classes: BTreeSet<TaxClassCode>,
    /// True for types restricted to registered businesses (RNC holders).
    pub requires_taxpayer_id: bool,
}

/// Immutable registry of document type rules.
///
/// Lookups against unregistered codes fail with `UnknownDocumentType`; an
/// unrecognized code is never reinterpreted as a different legal document
/// type.
#[derive(Debug, Clone)]
pub struct DocumentTypeRegistry {
    rules: HashMap<DocumentTypeCode, DocumentTypeRule>,
}

impl DocumentTypeRegistry {
    /// Validate and index the rules. Fails on duplicate codes and on
    /// references to tax classes absent from the rule table.
    pub fn load(rules: Vec<DocumentTypeRule>, taxes: &TaxRuleTable) -> FiscalResult<Self> {
        let mut map = HashMap::with_capacity(rules.len());
        for rule in rules {
            for class in &rule.allowed_tax_classes {
                if !taxes.contains(class) {
                    return Err(FiscalError::UnknownTaxClass(class.to_string()));
                }
            }
            if rule.allowed_tax_classes.is_empty() {
                return Err(FiscalError::validation(format!(
                    "document type {} allows no tax classes",
                    rule.code
                )));
            }
            if map.insert(rule.code.clone(), rule.clone()).is_some() {
                return Err(FiscalError::validation(format!(
                    "duplicate document type code {}",
                    rule.code
                )));
            }
        }
        Ok(Self { rules: map })
    }

    /// The standard Dominican NCF types.
    pub fn dominican_defaults(taxes: &TaxRuleTable) -> FiscalResult<Self> {
        let all: BTreeSet<TaxClassCode> = ["itbis-18", "itbis-16", "zero-rate", "exempt"]
            .into_iter()
            .map(TaxClassCode::new)
            .collect::<FiscalResult<_>>()?;
        let untaxed: BTreeSet<TaxClassCode> = ["zero-rate", "exempt"]
            .into_iter()
            .map(TaxClassCode::new)
            .collect::<FiscalResult<_>>()?;

        let rules = vec![
            DocumentTypeRule {
                code: DocumentTypeCode::new("B01")?,
                label: "Crédito Fiscal".into(),
                allowed_tax_classes: all.clone(),
                requires_taxpayer_id: true,
            },
            DocumentTypeRule {
                code: DocumentTypeCode::new("B02")?,
                label: "Consumo Final".into(),
                allowed_tax_classes: all.clone(),
                requires_taxpayer_id: false,
            },
            DocumentTypeRule {
                code: DocumentTypeCode::new("B14")?,
                label: "Régimen Especial".into(),
                allowed_tax_classes: untaxed,
                requires_taxpayer_id: true,
            },
            DocumentTypeRule {
                code: DocumentTypeCode::new("B15")?,
                label: "Gubernamental".into(),
                allowed_tax_classes: all,
                requires_taxpayer_id: true,
            },
        ];
        Self::load(rules, taxes)
    }

    pub fn get(&self, code: &DocumentTypeCode) -> FiscalResult<&DocumentTypeRule> {
        self.rules
            .get(code)
            .ok_or_else(|| FiscalError::UnknownDocumentType(code.to_string()))
    }

    /// Whether `tax_class` may legally appear on a document of type `code`.
    pub fn is_tax_class_allowed(
        &self,
        code: &DocumentTypeCode,
        tax_class: &TaxClassCode,
    ) -> FiscalResult<bool> {
        Ok(self.get(code)?.allowed_tax_classes.contains(tax_class))
    }

    /// Whether documents of type `code` are restricted to RNC holders.
    pub fn requires_taxpayer_id(&self, code: &DocumentTypeCode) -> FiscalResult<bool> {
        Ok(self.get(code)?.requires_taxpayer_id)
    }
}
