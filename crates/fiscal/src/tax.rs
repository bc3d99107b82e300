//! Tax rule table: tax-class code → rate lookup.

use core::str::FromStr;
use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fiscalerp_core::{FiscalError, FiscalResult, ValueObject};

/// Tax class identifier, e.g. `itbis-18`, `zero-rate`, `exempt`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxClassCode(String);

impl TaxClassCode {
    pub fn new(code: impl Into<String>) -> FiscalResult<Self> {
        let code = code.into();
        let valid = !code.is_empty()
            && code
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid {
            return Err(FiscalError::validation(format!(
                "tax class code must be lowercase kebab-case, got '{code}'"
            )));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for TaxClassCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TaxClassCode {
    type Err = FiscalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// One tax class: code, display label, rate as a fraction in [0, 1].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxClass {
    pub code: TaxClassCode,
    pub label: String,
    pub rate: Decimal,
}

impl TaxClass {
    pub fn new(
        code: TaxClassCode,
        label: impl Into<String>,
        rate: Decimal,
    ) -> FiscalResult<Self> {
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(FiscalError::validation(format!(
                "tax rate for {code} must lie in [0, 1], got {rate}"
            )));
        }
        Ok(Self {
            code,
            label: label.into(),
            rate,
        })
    }
}

impl ValueObject for TaxClass {}

/// Read-only lookup from tax-class code to rate.
///
/// Built once at startup from reference data; rejects duplicates and
/// out-of-range rates at load time.
#[derive(Debug, Clone)]
pub struct TaxRuleTable {
    classes: HashMap<TaxClassCode, TaxClass>,
}

impl TaxRuleTable {
    pub fn load(classes: Vec<TaxClass>) -> FiscalResult<Self> {
        let mut map = HashMap::with_capacity(classes.len());
        for class in classes {
            if map.insert(class.code.clone(), class.clone()).is_some() {
                return Err(FiscalError::validation(format!(
                    "duplicate tax class code {}",
                    class.code
                )));
            }
        }
        Ok(Self { classes: map })
    }

    /// The standard Dominican tax classes: ITBIS at 18%, the reduced 16%
    /// rate, zero-rated exports and exempt goods.
    pub fn dominican_defaults() -> Self {
        let classes = [
            TaxClass {
                code: TaxClassCode("itbis-18".into()),
                label: "ITBIS 18%".into(),
                rate: Decimal::new(18, 2),
            },
            TaxClass {
                code: TaxClassCode("itbis-16".into()),
                label: "ITBIS reducido 16%".into(),
                rate: Decimal::new(16, 2),
            },
            TaxClass {
                code: TaxClassCode("zero-rate".into()),
                label: "Tasa cero".into(),
                rate: Decimal::ZERO,
            },
            TaxClass {
                code: TaxClassCode("exempt".into()),
                label: "Exento (E)".into(),
                rate: Decimal::ZERO,
            },
        ];
        // Codes above are distinct and rates well-formed by construction.
        Self {
            classes: classes
                .into_iter()
                .map(|c| (c.code.clone(), c))
                .collect(),
        }
    }

    /// Tax rate for a class; `UnknownTaxClass` if the code is unregistered.
    pub fn rate_of(&self, code: &TaxClassCode) -> FiscalResult<Decimal> {
        self.classes
            .get(code)
            .map(|c| c.rate)
            .ok_or_else(|| FiscalError::UnknownTaxClass(code.to_string()))
    }

    pub fn contains(&self, code: &TaxClassCode) -> bool {
        self.classes.contains_key(code)
    }

    pub fn get(&self, code: &TaxClassCode) -> Option<&TaxClass> {
        self.classes.get(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn code(s: &str) -> TaxClassCode {
        TaxClassCode::new(s).unwrap()
    }

    #[test]
    fn rate_of_returns_registered_rate() {
        let table = TaxRuleTable::dominican_defaults();
        assert_eq!(table.rate_of(&code("itbis-18")).unwrap(), dec!(0.18));
        assert_eq!(table.rate_of(&code("exempt")).unwrap(), dec!(0));
    }

    #[test]
    fn unknown_code_is_rejected_not_defaulted() {
        let table = TaxRuleTable::dominican_defaults();
        let err = table.rate_of(&code("itbis-30")).unwrap_err();
        assert_eq!(err, FiscalError::UnknownTaxClass("itbis-30".into()));
    }

    #[test]
    fn load_rejects_duplicate_codes() {
        let a = TaxClass::new(code("itbis-18"), "ITBIS", dec!(0.18)).unwrap();
        let b = TaxClass::new(code("itbis-18"), "ITBIS again", dec!(0.18)).unwrap();
        let err = TaxRuleTable::load(vec![a, b]).unwrap_err();
        assert!(matches!(err, FiscalError::Validation(_)));
    }

    #[test]
    fn rate_outside_unit_interval_is_rejected() {
        assert!(TaxClass::new(code("bad"), "bad", dec!(1.01)).is_err());
        assert!(TaxClass::new(code("bad"), "bad", dec!(-0.01)).is_err());
        assert!(TaxClass::new(code("edge"), "edge", dec!(1)).is_ok());
        assert!(TaxClass::new(code("edge"), "edge", dec!(0)).is_ok());
    }

    #[test]
    fn malformed_codes_fail_validation() {
        assert!(TaxClassCode::new("ITBIS").is_err());
        assert!(TaxClassCode::new("").is_err());
        assert!(TaxClassCode::new("itbis 18").is_err());
        assert!(TaxClassCode::new("itbis-18").is_ok());
    }
}
