//! Purchasable Conditions
//!
//! Conditions on specific purchasables being in the cart. A configured
//! identifier matches a line by its own identifier or its primary identifier,
//! so a product identifier covers all of its variants.

use smallvec::SmallVec;

use crate::{
    conditions::{Condition, ConditionKind, Met},
    config::{Config, ConfigError},
    context::DealContext,
    error::DealError,
    ids::PurchasableId,
    purchasables::{Purchasable, countable_quantity},
};

fn matches_any(purchasable: &dyn Purchasable, ids: &[PurchasableId]) -> bool {
    ids.iter().any(|id| purchasable.matches(id))
}

fn minimum_quantity(config: &Config) -> Result<u32, ConfigError> {
    nonzero_quantity(config.get("quantity")?)
}

fn nonzero_quantity(quantity: u32) -> Result<u32, ConfigError> {
    if quantity == 0 {
        return Err(ConfigError::Invalid {
            key: "quantity".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }

    Ok(quantity)
}

/// Met when a purchasable is in the cart.
#[derive(Debug, Clone)]
pub struct PurchasableCondition {
    purchasable: PurchasableId,
}

impl PurchasableCondition {
    /// Create for a purchasable or product identifier.
    pub fn new(purchasable: impl Into<PurchasableId>) -> Self {
        Self {
            purchasable: purchasable.into(),
        }
    }

    /// Create from config keys: `purchasable`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `purchasable` is missing or malformed.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            purchasable: config.get("purchasable")?,
        })
    }
}

impl Condition for PurchasableCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::Purchasable
    }

    fn met(&self, ctx: &DealContext<'_>) -> Result<Met, DealError> {
        let present = ctx
            .cart
            .purchasables()
            .into_iter()
            .any(|purchasable| purchasable.matches(&self.purchasable) && purchasable.quantity() > 0);

        Ok(Met::Bool(present))
    }

    fn description(&self) -> String {
        format!("Buy {}", self.purchasable)
    }
}

/// Met when any of the listed purchasables has at least a quantity in the cart.
#[derive(Debug, Clone)]
pub struct PurchasableHasQuantityInCartCondition {
    purchasables: SmallVec<[PurchasableId; 4]>,
    quantity: u32,
}

impl PurchasableHasQuantityInCartCondition {
    /// Create for a set of purchasables and a minimum quantity.
    pub fn new(purchasables: impl IntoIterator<Item = PurchasableId>, quantity: u32) -> Self {
        Self {
            purchasables: purchasables.into_iter().collect(),
            quantity,
        }
    }

    /// Create from config keys: `purchasables`, `quantity`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a key is missing or malformed, or `quantity` is zero.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let purchasables: Vec<PurchasableId> = config.get("purchasables")?;

        Ok(Self::new(purchasables, minimum_quantity(config)?))
    }
}

impl Condition for PurchasableHasQuantityInCartCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::PurchasableHasQuantityInCart
    }

    fn met(&self, ctx: &DealContext<'_>) -> Result<Met, DealError> {
        let met = ctx.cart.purchasables().into_iter().any(|purchasable| {
            matches_any(purchasable, &self.purchasables)
                && countable_quantity(purchasable, &ctx.pass) >= self.quantity
        });

        Ok(Met::Bool(met))
    }

    fn description(&self) -> String {
        format!("Buy {} of the same product", self.quantity)
    }
}

/// Counts how many times the listed purchasables reach a quantity together.
///
/// Returns `Count(floor(total / quantity))` over the countable units of every
/// matching line, so 7 units against a quantity of 3 meet the condition twice.
#[derive(Debug, Clone)]
pub struct QuantityOfPurchasablesInCartCondition {
    purchasables: SmallVec<[PurchasableId; 4]>,
    quantity: u32,
}

impl QuantityOfPurchasablesInCartCondition {
    /// Create for a set of purchasables and a group quantity.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `quantity` is zero.
    pub fn new(
        purchasables: impl IntoIterator<Item = PurchasableId>,
        quantity: u32,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            purchasables: purchasables.into_iter().collect(),
            quantity: nonzero_quantity(quantity)?,
        })
    }

    /// Create from config keys: `purchasables`, `quantity`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a key is missing or malformed, or `quantity` is zero.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let purchasables: Vec<PurchasableId> = config.get("purchasables")?;

        Ok(Self {
            purchasables: purchasables.into_iter().collect(),
            quantity: minimum_quantity(config)?,
        })
    }

    /// Total countable units of the matching lines.
    fn matching_quantity(&self, ctx: &DealContext<'_>) -> u32 {
        ctx.cart
            .purchasables()
            .into_iter()
            .filter(|purchasable| matches_any(*purchasable, &self.purchasables))
            .map(|purchasable| countable_quantity(purchasable, &ctx.pass))
            .fold(0_u32, u32::saturating_add)
    }
}

impl Condition for QuantityOfPurchasablesInCartCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::QuantityOfPurchasablesInCart
    }

    fn met(&self, ctx: &DealContext<'_>) -> Result<Met, DealError> {
        let total = self.matching_quantity(ctx);

        Ok(Met::Count(total.checked_div(self.quantity).unwrap_or(0)))
    }

    fn description(&self) -> String {
        format!("Buy {} items from the selection", self.quantity)
    }
}
