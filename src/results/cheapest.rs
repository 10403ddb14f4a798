//! Cheapest Purchasable Discount Result

use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::{
    config::{Config, ConfigError},
    context::{DealContext, DealView},
    discounts::{DiscountError, line_minor},
    error::DealError,
    ids::PurchasableId,
    purchasables::countable_quantity,
    results::{DealResult, ResultKind, clear_free_quantities},
};

#[derive(Debug)]
struct Candidate {
    id: PurchasableId,
    unit_minor: i64,
    available: u32,
    awarded: u32,
}

/// Makes the cheapest matching unit free, once per award.
///
/// Each award takes the cheapest unit still available among the matching
/// lines, ties going to the line that comes first in the cart. Gifted units
/// and units a deal that already ran made free are not available.
#[derive(Debug, Clone)]
pub struct CheapestPurchasableDiscountResult {
    purchasables: SmallVec<[PurchasableId; 4]>,
}

impl CheapestPurchasableDiscountResult {
    /// Create for a set of purchasable or product identifiers.
    pub fn new(purchasables: impl IntoIterator<Item = PurchasableId>) -> Self {
        Self {
            purchasables: purchasables.into_iter().collect(),
        }
    }

    /// Create from config keys: `purchasables`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `purchasables` is missing or malformed.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let purchasables: Vec<PurchasableId> = config.get("purchasables")?;

        Ok(Self::new(purchasables))
    }

    fn candidates(
        &self,
        deal: &DealView<'_>,
        ctx: &DealContext<'_>,
        currency: &'static Currency,
    ) -> SmallVec<[Candidate; 8]> {
        let mut candidates = SmallVec::new();
        let pass = ctx.pass.for_deal(deal.identifier);

        for purchasable in ctx.cart.purchasables() {
            if !self.purchasables.iter().any(|id| purchasable.matches(id))
                || purchasable.unit_price().currency() != currency
            {
                continue;
            }

            if purchasable.ledger().is_none() {
                warn!(deal = %deal.identifier, purchasable = %purchasable.identifier(), "purchasable cannot take part in deals; skipped");
                continue;
            }

            candidates.push(Candidate {
                id: purchasable.identifier().clone(),
                unit_minor: purchasable.unit_price().to_minor_units(),
                available: countable_quantity(purchasable, &pass),
                awarded: 0,
            });
        }

        candidates
    }
}

impl DealResult for CheapestPurchasableDiscountResult {
    fn kind(&self) -> ResultKind {
        ResultKind::CheapestPurchasableDiscount
    }

    fn process(
        &mut self,
        deal: &DealView<'_>,
        ctx: &mut DealContext<'_>,
    ) -> Result<Money<'static, Currency>, DealError> {
        let currency = ctx.active_currency();
        let mut candidates = self.candidates(deal, ctx, currency);

        for _ in 0..deal.conditions_met_count {
            let Some(cheapest) = candidates
                .iter_mut()
                .filter(|candidate| candidate.awarded < candidate.available)
                .min_by_key(|candidate| candidate.unit_minor)
            else {
                break;
            };

            cheapest.awarded += 1;
        }

        clear_free_quantities(deal.identifier, ctx);

        let mut total = 0_i64;

        for candidate in &candidates {
            if candidate.awarded == 0 {
                continue;
            }

            if let Some(ledger) = ctx
                .cart
                .purchasable_mut(&candidate.id)
                .and_then(|purchasable| purchasable.ledger_mut())
            {
                ledger.set_free_quantity(deal.identifier, candidate.awarded);
            }

            total = total
                .checked_add(line_minor(candidate.unit_minor, candidate.awarded)?)
                .ok_or(DiscountError::Overflow)?;

            debug!(deal = %deal.identifier, purchasable = %candidate.id, units = candidate.awarded, "cheapest units made free");
        }

        Ok(Money::from_minor(total, currency))
    }

    fn reset(&mut self, deal: &DealView<'_>, ctx: &mut DealContext<'_>) -> Result<(), DealError> {
        clear_free_quantities(deal.identifier, ctx);

        Ok(())
    }

    fn description(&self) -> String {
        "Cheapest item free".to_string()
    }
}
