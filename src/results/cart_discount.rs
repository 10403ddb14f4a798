//! Cart Discount Result

use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::{
    config::{Config, ConfigError},
    context::{DealContext, DealView},
    discounts::allocate_minor,
    error::DealError,
    purchasables::countable_minor,
    results::{DealResult, DiscountAmount, ResultKind, clear_discounts},
};

/// Discount on the whole cart, spread across its lines.
///
/// The base is the countable total of every deal-capable line priced in the
/// active currency, less what deals that already ran took off when
/// `exclude_other_discounts` is set. Each line receives a share of the
/// discount proportional to its part of the base, and the shares always sum
/// to the discount.
#[derive(Debug, Clone)]
pub struct CartDiscountResult {
    amount: DiscountAmount,
    exclude_other_discounts: bool,
}

impl CartDiscountResult {
    /// Create with a discount amount, excluding other deals' discounts from the base.
    pub fn new(amount: DiscountAmount) -> Self {
        Self {
            amount,
            exclude_other_discounts: true,
        }
    }

    /// Set whether other deals' discounts are taken off the base first.
    #[must_use]
    pub fn exclude_other_discounts(mut self, exclude: bool) -> Self {
        self.exclude_other_discounts = exclude;
        self
    }

    /// Create from config keys: `cart_discount_amounts` or
    /// `cart_discount_percentage`, and `exclude_other_discounts`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` unless exactly one discount key is present and valid.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let amount =
            DiscountAmount::from_config(config, "cart_discount_amounts", "cart_discount_percentage")?;

        Ok(Self::new(amount).exclude_other_discounts(
            config.get_opt("exclude_other_discounts")?.unwrap_or(true),
        ))
    }

    fn line_bases(
        &self,
        deal: &DealView<'_>,
        ctx: &DealContext<'_>,
        currency: &'static Currency,
    ) -> Result<SmallVec<[i64; 8]>, DealError> {
        let mut bases = SmallVec::new();
        let pass = ctx.pass.for_deal(deal.identifier);

        for purchasable in ctx.cart.purchasables() {
            let Some(ledger) = purchasable.ledger() else {
                warn!(deal = %deal.identifier, purchasable = %purchasable.identifier(), "purchasable cannot take part in deals; skipped");
                bases.push(0);
                continue;
            };

            if purchasable.unit_price().currency() != currency {
                bases.push(0);
                continue;
            }

            let excluded = if self.exclude_other_discounts {
                ledger.discount_seen_minor(&pass, currency)
            } else {
                0
            };

            bases.push(countable_minor(purchasable, &pass)?.saturating_sub(excluded).max(0));
        }

        Ok(bases)
    }
}

impl DealResult for CartDiscountResult {
    fn kind(&self) -> ResultKind {
        ResultKind::CartDiscount
    }

    fn process(
        &mut self,
        deal: &DealView<'_>,
        ctx: &mut DealContext<'_>,
    ) -> Result<Money<'static, Currency>, DealError> {
        let currency = ctx.active_currency();

        clear_discounts(deal.identifier, ctx);

        let bases = self.line_bases(deal, ctx, currency)?;
        let base = bases.iter().fold(0_i64, |acc, base| acc.saturating_add(*base));
        let discount = self.amount.off_minor(base, currency)?;
        let shares = allocate_minor(discount, &bases)?;

        for (purchasable, share) in ctx.cart.purchasables_mut().into_iter().zip(shares) {
            if let Some(ledger) = purchasable.ledger_mut() {
                ledger.set_discount(deal.identifier, Money::from_minor(share, currency));
            }
        }

        debug!(deal = %deal.identifier, base, discount, "cart discount allocated");

        Ok(Money::from_minor(discount, currency))
    }

    fn reset(&mut self, deal: &DealView<'_>, ctx: &mut DealContext<'_>) -> Result<(), DealError> {
        clear_discounts(deal.identifier, ctx);

        Ok(())
    }

    fn description(&self) -> String {
        format!("{} off your order", self.amount.describe())
    }
}
