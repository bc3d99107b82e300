//! Taxpayer id (RNC) and the external registry verification seam.

use core::str::FromStr;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use fiscalerp_core::{FiscalError, FiscalResult};

/// Dominican taxpayer id (RNC/cédula): 9 or 11 digits.
///
/// Only the shape is validated here; the external registry is authoritative
/// for whether the id is actually registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rnc(String);

impl Rnc {
    pub fn new(value: impl Into<String>) -> FiscalResult<Self> {
        let value = value.into();
        let digits = value.chars().all(|c| c.is_ascii_digit());
        if !digits || !(value.len() == 9 || value.len() == 11) {
            return Err(FiscalError::validation(format!(
                "RNC must be 9 or 11 digits, got '{value}'"
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Rnc {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Rnc {
    type Err = FiscalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// External registry verification collaborator (black box).
///
/// `verify` answers whether the id is registered with the tax authority.
/// When the registry cannot be reached, implementations must return
/// `EligibilityCheckUnavailable` so callers fail closed instead of assuming
/// eligibility.
pub trait TaxpayerRegistry: Send + Sync {
    fn verify(&self, rnc: &Rnc) -> FiscalResult<bool>;
}

/// Registry backed by a fixed set of known ids (tests, offline fixtures).
#[derive(Debug, Default)]
pub struct StaticTaxpayerRegistry {
    known: HashSet<Rnc>,
}

impl StaticTaxpayerRegistry {
    pub fn new(known: impl IntoIterator<Item = Rnc>) -> Self {
        Self {
            known: known.into_iter().collect(),
        }
    }
}

impl TaxpayerRegistry for StaticTaxpayerRegistry {
    fn verify(&self, rnc: &Rnc) -> FiscalResult<bool> {
        Ok(self.known.contains(rnc))
    }
}

/// Registry that is always unreachable. Models the degraded case where the
/// verification service is down.
#[derive(Debug, Default)]
pub struct UnavailableTaxpayerRegistry;

impl TaxpayerRegistry for UnavailableTaxpayerRegistry {
    fn verify(&self, _rnc: &Rnc) -> FiscalResult<bool> {
        Err(FiscalError::EligibilityCheckUnavailable(
            "taxpayer registry unreachable".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rnc_shape_is_validated() {
        assert!(Rnc::new("131793916").is_ok());
        assert!(Rnc::new("00113918205").is_ok());
        assert!(Rnc::new("12345").is_err());
        assert!(Rnc::new("13179391A").is_err());
    }

    #[test]
    fn static_registry_verifies_membership() {
        let known = Rnc::new("131793916").unwrap();
        let registry = StaticTaxpayerRegistry::new([known.clone()]);
        assert!(registry.verify(&known).unwrap());
        assert!(!registry.verify(&Rnc::new("101000001").unwrap()).unwrap());
    }

    #[test]
    fn unreachable_registry_fails_closed() {
        let registry = UnavailableTaxpayerRegistry;
        let err = registry.verify(&Rnc::new("131793916").unwrap()).unwrap_err();
        assert!(matches!(err, FiscalError::EligibilityCheckUnavailable(_)));
    }
}
