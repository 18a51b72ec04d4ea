//! Record kinds that rules can target.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AutoruleError;

/// The fixed set of record kinds a rule may be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetModel {
    /// Courier request
    CourierRequest,
    /// Business partner (customer, sender, receiver)
    Partner,
    /// Sales order
    SalesOrder,
    /// Customer invoice
    Invoice,
}

impl TargetModel {
    /// All selectable models, in display order.
    pub const ALL: [Self; 4] = [
        Self::CourierRequest,
        Self::Partner,
        Self::SalesOrder,
        Self::Invoice,
    ];

    /// Get display name.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::CourierRequest => "Courier Request",
            Self::Partner => "Partner",
            Self::SalesOrder => "Sale Order",
            Self::Invoice => "Invoice",
        }
    }

    /// Stable identifier, as stored in the database.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::CourierRequest => "courier_request",
            Self::Partner => "partner",
            Self::SalesOrder => "sales_order",
            Self::Invoice => "invoice",
        }
    }
}

impl fmt::Display for TargetModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for TargetModel {
    type Err = AutoruleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "courier_request" | "courier" => Ok(Self::CourierRequest),
            "partner" => Ok(Self::Partner),
            "sales_order" | "sale_order" | "order" => Ok(Self::SalesOrder),
            "invoice" => Ok(Self::Invoice),
            _ => Err(AutoruleError::Validation(format!(
                "Unknown model: {s} (expected one of courier-request, partner, sales-order, invoice)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_model_aliases() {
        assert_eq!("courier-request".parse::<TargetModel>().unwrap(), TargetModel::CourierRequest);
        assert_eq!("sale_order".parse::<TargetModel>().unwrap(), TargetModel::SalesOrder);
        assert_eq!("Invoice".parse::<TargetModel>().unwrap(), TargetModel::Invoice);
        assert!("stock.picking".parse::<TargetModel>().is_err());
    }

    #[test]
    fn test_key_round_trips_through_parse() {
        for model in TargetModel::ALL {
            assert_eq!(model.key().parse::<TargetModel>().unwrap(), model);
        }
    }
}
