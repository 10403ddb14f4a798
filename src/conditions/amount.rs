//! Amount Condition

use crate::{
    conditions::{Condition, ConditionKind, Met, countable_subtotal_minor},
    config::{Config, ConfigError, CurrencyAmounts},
    context::DealContext,
    error::DealError,
};

/// Met when the charged cart subtotal reaches a per-currency threshold.
///
/// Units made free by deals do not count towards the subtotal. With no
/// threshold configured for the active currency the condition is never met.
#[derive(Debug, Clone)]
pub struct AmountCondition {
    amounts: CurrencyAmounts,
}

impl AmountCondition {
    /// Create from per-currency thresholds.
    pub fn new(amounts: CurrencyAmounts) -> Self {
        Self { amounts }
    }

    /// Create from config keys: `amounts`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `amounts` is missing or malformed.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(config.currency_amounts("amounts")?))
    }
}

impl Condition for AmountCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::Amount
    }

    fn met(&self, ctx: &DealContext<'_>) -> Result<Met, DealError> {
        let currency = ctx.active_currency();

        let Some(threshold) = self.amounts.get(currency) else {
            return Ok(Met::Bool(false));
        };

        let subtotal = countable_subtotal_minor(ctx, currency)?;

        Ok(Met::Bool(subtotal >= threshold.to_minor_units()))
    }

    fn description(&self) -> String {
        "Spend a minimum amount".to_string()
    }
}
