//! Customer entity.

use serde::{Deserialize, Serialize};

use fiscalerp_core::{CustomerId, Entity, FiscalError, FiscalResult};
use fiscalerp_fiscal::Rnc;

/// A customer as the invoicing core sees it: identity, display name, and an
/// optional registered taxpayer id. CRUD around customers lives elsewhere;
/// this type is the immutable reference an invoice holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    id: CustomerId,
    name: String,
    rnc: Option<Rnc>,
}

impl Customer {
    pub fn new(id: CustomerId, name: impl Into<String>, rnc: Option<Rnc>) -> FiscalResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(FiscalError::validation("customer name cannot be empty"));
        }
        Ok(Self { id, name, rnc })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rnc(&self) -> Option<&Rnc> {
        self.rnc.as_ref()
    }

    /// Whether this customer can receive document types restricted to
    /// registered businesses.
    pub fn has_taxpayer_id(&self) -> bool {
        self.rnc.is_some()
    }
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_rejects_empty_name() {
        let err = Customer::new(CustomerId::new(), "   ", None).unwrap_err();
        assert!(matches!(err, FiscalError::Validation(_)));
    }

    #[test]
    fn taxpayer_id_presence_is_observable() {
        let anonymous = Customer::new(CustomerId::new(), "Consumidor Final", None).unwrap();
        assert!(!anonymous.has_taxpayer_id());

        let business = Customer::new(
            CustomerId::new(),
            "Ferretería El Sol SRL",
            Some(Rnc::new("131793916").unwrap()),
        )
        .unwrap();
        assert!(business.has_taxpayer_id());
    }
}
