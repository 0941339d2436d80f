//! Entity references
//!
//! Captures point at the entity they document by core-module name and id.
//! Known trade-compliance kinds get their own variant; anything else is kept
//! verbatim in `Other` so captures of newer modules still round-trip.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of business entity a capture documents
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum EntityKind {
    /// Customs entry
    Entry,
    CommercialInvoice,
    Product,
    Order,
    Shipment,
    /// Importer security filing
    SecurityFiling,
    Company,
    /// Any core module without a dedicated variant
    Other(String),
}

impl EntityKind {
    /// Core-module name as stored in `recordable_type` and `core_module`
    pub fn as_str(&self) -> &str {
        match self {
            EntityKind::Entry => "Entry",
            EntityKind::CommercialInvoice => "CommercialInvoice",
            EntityKind::Product => "Product",
            EntityKind::Order => "Order",
            EntityKind::Shipment => "Shipment",
            EntityKind::SecurityFiling => "SecurityFiling",
            EntityKind::Company => "Company",
            EntityKind::Other(name) => name,
        }
    }

    /// Parse a core-module name. Never fails: unknown names become `Other`.
    pub fn parse(name: &str) -> Self {
        match name {
            "Entry" => EntityKind::Entry,
            "CommercialInvoice" => EntityKind::CommercialInvoice,
            "Product" => EntityKind::Product,
            "Order" => EntityKind::Order,
            "Shipment" => EntityKind::Shipment,
            "SecurityFiling" => EntityKind::SecurityFiling,
            "Company" => EntityKind::Company,
            other => EntityKind::Other(other.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, EntityKind::Other(_))
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for EntityKind {
    fn from(s: String) -> Self {
        EntityKind::parse(&s)
    }
}

impl From<EntityKind> for String {
    fn from(kind: EntityKind) -> Self {
        kind.as_str().to_string()
    }
}

/// `(type, id)` identity of an entity in the relational store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: i64,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: i64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_kinds_round_trip() {
        for kind in [
            EntityKind::Entry,
            EntityKind::CommercialInvoice,
            EntityKind::Product,
            EntityKind::Order,
            EntityKind::Shipment,
            EntityKind::SecurityFiling,
            EntityKind::Company,
        ] {
            assert_eq!(EntityKind::parse(kind.as_str()), kind);
            assert!(kind.is_known());
        }
    }

    #[test]
    fn test_unknown_kind_is_preserved() {
        let kind = EntityKind::parse("BrokerInvoice");
        assert_eq!(kind, EntityKind::Other("BrokerInvoice".to_string()));
        assert_eq!(kind.as_str(), "BrokerInvoice");
        assert!(!kind.is_known());
    }

    #[test]
    fn test_entity_ref_display() {
        let entity = EntityRef::new(EntityKind::Order, 12);
        assert_eq!(entity.to_string(), "Order#12");
    }

    #[test]
    fn test_kind_serializes_as_module_name() {
        let json = serde_json::to_string(&EntityKind::Shipment).unwrap();
        assert_eq!(json, "\"Shipment\"");
        let back: EntityKind = serde_json::from_str("\"Widget\"").unwrap();
        assert_eq!(back, EntityKind::Other("Widget".to_string()));
    }
}
