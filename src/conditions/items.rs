//! Items Condition

use crate::{
    conditions::{Condition, ConditionKind, Met},
    config::{Config, ConfigError},
    context::DealContext,
    error::DealError,
    purchasables::countable_quantity,
};

/// Met when the cart holds at least a number of items.
///
/// Items are counted as countable units, or as distinct purchasables when
/// `count_by_purchasable` is set.
#[derive(Debug, Clone, Copy)]
pub struct ItemsCondition {
    items: u32,
    count_by_purchasable: bool,
}

impl ItemsCondition {
    /// Create a condition requiring `items` charged units.
    pub fn new(items: u32) -> Self {
        Self {
            items,
            count_by_purchasable: false,
        }
    }

    /// Count distinct purchasables instead of units.
    #[must_use]
    pub fn by_purchasable(mut self) -> Self {
        self.count_by_purchasable = true;
        self
    }

    /// Create from config keys: `items`, `count_by_purchasable`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `items` is missing or either key is malformed.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            items: config.get("items")?,
            count_by_purchasable: config.get_opt("count_by_purchasable")?.unwrap_or(false),
        })
    }
}

impl Condition for ItemsCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::Items
    }

    fn met(&self, ctx: &DealContext<'_>) -> Result<Met, DealError> {
        let units = ctx
            .cart
            .purchasables()
            .into_iter()
            .map(|purchasable| countable_quantity(purchasable, &ctx.pass));

        let count = if self.count_by_purchasable {
            let lines = units.filter(|line| *line > 0).count();

            u32::try_from(lines).unwrap_or(u32::MAX)
        } else {
            units.fold(0_u32, u32::saturating_add)
        };

        Ok(Met::Bool(count >= self.items))
    }

    fn description(&self) -> String {
        if self.count_by_purchasable {
            format!("Buy {} different products", self.items)
        } else {
            format!("Buy {} items", self.items)
        }
    }
}
