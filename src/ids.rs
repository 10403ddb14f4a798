//! Identifiers
//!
//! Value types used to key deals and purchasables, including the per-deal
//! ledgers carried by purchasables.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a configured deal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DealId(String);

impl DealId {
    /// Create a deal identifier.
    pub fn new(identifier: impl AsRef<str>) -> Self {
        Self(identifier.as_ref().to_string())
    }

    /// Return the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DealId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DealId {
    fn from(identifier: &str) -> Self {
        Self::new(identifier)
    }
}

impl From<String> for DealId {
    fn from(identifier: String) -> Self {
        Self(identifier)
    }
}

/// Identifier of a purchasable (a product, variant or other cart line).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchasableId(String);

impl PurchasableId {
    /// Create a purchasable identifier.
    pub fn new(identifier: impl AsRef<str>) -> Self {
        Self(identifier.as_ref().to_string())
    }

    /// Return the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PurchasableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PurchasableId {
    fn from(identifier: &str) -> Self {
        Self::new(identifier)
    }
}

impl From<String> for PurchasableId {
    fn from(identifier: String) -> Self {
        Self(identifier)
    }
}

#[cfg(test)]
mod tests {
    use rustc_hash::FxHashMap;

    use super::*;

    #[test]
    fn deal_ids_compare_by_value() {
        let mut totals = FxHashMap::default();

        totals.insert(DealId::new("spend-50"), 10);

        assert_eq!(totals.get(&DealId::from("spend-50")), Some(&10));
        assert_eq!(DealId::from("a".to_string()), DealId::new("a"));
    }

    #[test]
    fn purchasable_id_displays_raw_identifier() {
        let id = PurchasableId::new("sku-123");

        assert_eq!(id.to_string(), "sku-123");
        assert_eq!(id.as_str(), "sku-123");
    }

    #[test]
    fn identifiers_deserialize_from_plain_strings() -> Result<(), serde_norway::Error> {
        let ids: Vec<PurchasableId> = serde_norway::from_str("[mug, tee]")?;

        assert_eq!(ids, vec![PurchasableId::new("mug"), PurchasableId::new("tee")]);

        Ok(())
    }
}
