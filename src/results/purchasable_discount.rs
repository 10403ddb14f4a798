//! Purchasable Discount Result

use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;
use tracing::debug;

use crate::{
    config::{Config, ConfigError},
    context::{DealContext, DealView, ledger_or_skip},
    discounts::{DiscountError, line_minor},
    error::DealError,
    ids::PurchasableId,
    purchasables::{countable_minor, countable_quantity},
    results::{DealResult, DiscountAmount, ResultKind, clear_discounts},
};

/// Discount on specific purchasables.
///
/// A fixed discount is taken off every charged unit of a matching line; a
/// percentage is taken off the line's charged total. Either way a line never
/// goes below zero, and what other deals already took off a line is not
/// discounted again.
#[derive(Debug, Clone)]
pub struct PurchasableDiscountResult {
    purchasables: SmallVec<[PurchasableId; 4]>,
    amount: DiscountAmount,
}

impl PurchasableDiscountResult {
    /// Create for a set of purchasable or product identifiers.
    pub fn new(purchasables: impl IntoIterator<Item = PurchasableId>, amount: DiscountAmount) -> Self {
        Self {
            purchasables: purchasables.into_iter().collect(),
            amount,
        }
    }

    /// Create from config keys: `purchasables`, and `discount_amounts` or
    /// `discount_percentage`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `purchasables` is missing, or unless exactly
    /// one discount key is present and valid.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let purchasables: Vec<PurchasableId> = config.get("purchasables")?;
        let amount = DiscountAmount::from_config(config, "discount_amounts", "discount_percentage")?;

        Ok(Self::new(purchasables, amount))
    }

    fn line_discount(
        &self,
        base: i64,
        charged_units: u32,
        currency: &'static Currency,
    ) -> Result<i64, DiscountError> {
        match &self.amount {
            DiscountAmount::Fixed(amounts) => {
                let per_unit = amounts.get(currency).map_or(0, |amount| amount.to_minor_units());

                Ok(line_minor(per_unit, charged_units)?.clamp(0, base.max(0)))
            }
            DiscountAmount::Percentage(_) => self.amount.off_minor(base, currency),
        }
    }
}

impl DealResult for PurchasableDiscountResult {
    fn kind(&self) -> ResultKind {
        ResultKind::PurchasableDiscount
    }

    fn process(
        &mut self,
        deal: &DealView<'_>,
        ctx: &mut DealContext<'_>,
    ) -> Result<Money<'static, Currency>, DealError> {
        let currency = ctx.active_currency();

        clear_discounts(deal.identifier, ctx);

        let pass = ctx.pass.for_deal(deal.identifier);
        let mut total = 0_i64;

        for purchasable in ctx.cart.purchasables_mut() {
            if !self.purchasables.iter().any(|id| purchasable.matches(id))
                || purchasable.unit_price().currency() != currency
            {
                continue;
            }

            let countable = countable_minor(&*purchasable, &pass)?;
            let units = countable_quantity(&*purchasable, &pass);

            let Some(ledger) = ledger_or_skip(purchasable, deal.identifier) else {
                continue;
            };

            let base = countable.saturating_sub(ledger.discount_seen_minor(&pass, currency));
            let discount = self.line_discount(base, units, currency)?;

            ledger.set_discount(deal.identifier, Money::from_minor(discount, currency));

            total = total.checked_add(discount).ok_or(DiscountError::Overflow)?;
        }

        debug!(deal = %deal.identifier, total, "purchasable discount applied");

        Ok(Money::from_minor(total, currency))
    }

    fn reset(&mut self, deal: &DealView<'_>, ctx: &mut DealContext<'_>) -> Result<(), DealError> {
        clear_discounts(deal.identifier, ctx);

        Ok(())
    }

    fn description(&self) -> String {
        match &self.amount {
            DiscountAmount::Fixed(_) => "A fixed amount off each selected item".to_string(),
            DiscountAmount::Percentage(_) => {
                format!("{} off selected items", self.amount.describe())
            }
        }
    }
}
