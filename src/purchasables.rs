//! Purchasables
//!
//! Cart lines as seen by the deals engine, and the per-deal ledgers a
//! deal-capable purchasable carries.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use rusty_money::{Money, iso::Currency};

use crate::{
    context::DealPass,
    discounts::{DiscountError, line_minor},
    ids::{DealId, PurchasableId},
};

/// A line in the cart.
pub trait Purchasable: fmt::Debug {
    /// Identifier of this purchasable.
    fn identifier(&self) -> &PurchasableId;

    /// Product-level identifier shared by all variants of the same product.
    ///
    /// Defaults to [`identifier`](Purchasable::identifier).
    fn primary_identifier(&self) -> &PurchasableId {
        self.identifier()
    }

    /// Display name.
    fn name(&self) -> &str {
        self.identifier().as_str()
    }

    /// Quantity in the cart, free units included.
    fn quantity(&self) -> u32;

    /// Set the quantity in the cart.
    fn set_quantity(&mut self, quantity: u32);

    /// Price of a single unit.
    fn unit_price(&self) -> Money<'static, Currency>;

    /// Per-deal ledger, if this purchasable can take part in deals.
    fn ledger(&self) -> Option<&DealLedger> {
        None
    }

    /// Mutable per-deal ledger, if this purchasable can take part in deals.
    fn ledger_mut(&mut self) -> Option<&mut DealLedger> {
        None
    }

    /// Return whether this purchasable is `id`, either directly or by its primary identifier.
    fn matches(&self, id: &PurchasableId) -> bool {
        self.identifier() == id || self.primary_identifier() == id
    }
}

/// Free quantities and discounts granted to a purchasable, keyed by deal.
///
/// Entries are cumulative across deals. Each deal only ever rewrites its own
/// entry; the `*_seen` queries let a deal take into account only the entries
/// its [`DealPass`] sees.
///
/// Free units are either made free in place, out of units the customer
/// added, or gifted, meaning the deal added them to the line itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DealLedger {
    free_quantities: FxHashMap<DealId, u32>,
    gifts: FxHashSet<DealId>,
    discounts: FxHashMap<DealId, Money<'static, Currency>>,
}

impl DealLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Free units granted by `deal`.
    pub fn free_quantity(&self, deal: &DealId) -> u32 {
        self.free_quantities.get(deal).copied().unwrap_or_default()
    }

    /// Record the units `deal` made free in place. Zero clears the entry.
    pub fn set_free_quantity(&mut self, deal: &DealId, quantity: u32) {
        self.gifts.remove(deal);

        if quantity == 0 {
            self.free_quantities.remove(deal);
        } else {
            self.free_quantities.insert(deal.clone(), quantity);
        }
    }

    /// Record the units `deal` added to the line as a gift. Zero clears the entry.
    pub fn set_gifted_quantity(&mut self, deal: &DealId, quantity: u32) {
        self.set_free_quantity(deal, quantity);

        if quantity > 0 {
            self.gifts.insert(deal.clone());
        }
    }

    /// Units added as gifts by every deal.
    pub fn gifted_quantity(&self) -> u32 {
        self.gifts
            .iter()
            .map(|deal| self.free_quantity(deal))
            .fold(0_u32, u32::saturating_add)
    }

    /// Units made free in place by the deals `pass` sees.
    pub fn free_quantity_seen(&self, pass: &DealPass) -> u32 {
        self.free_quantities
            .iter()
            .filter(|(deal, _)| !self.gifts.contains(*deal) && pass.sees(deal))
            .map(|(_, quantity)| *quantity)
            .fold(0_u32, u32::saturating_add)
    }

    /// Free units granted by every deal.
    pub fn total_free_quantity(&self) -> u32 {
        self.free_quantities
            .values()
            .fold(0_u32, |acc, quantity| acc.saturating_add(*quantity))
    }

    /// Discount recorded by `deal`, if any.
    pub fn discount(&self, deal: &DealId) -> Option<Money<'static, Currency>> {
        self.discounts.get(deal).copied()
    }

    /// Record the discount allocated by `deal`. A zero amount clears the entry.
    pub fn set_discount(&mut self, deal: &DealId, discount: Money<'static, Currency>) {
        if discount.is_zero() {
            self.discounts.remove(deal);
        } else {
            self.discounts.insert(deal.clone(), discount);
        }
    }

    /// Clear everything `deal` recorded.
    pub fn clear(&mut self, deal: &DealId) {
        self.free_quantities.remove(deal);
        self.gifts.remove(deal);
        self.discounts.remove(deal);
    }

    /// Sum of discounts in `currency` recorded by the deals `pass` sees.
    ///
    /// Entries recorded in another currency are ignored.
    pub fn discount_seen_minor(&self, pass: &DealPass, currency: &'static Currency) -> i64 {
        self.discounts
            .iter()
            .filter(|(deal, money)| pass.sees(deal) && money.currency() == currency)
            .map(|(_, money)| money.to_minor_units())
            .fold(0_i64, i64::saturating_add)
    }

    /// Sum of discounts in `currency` recorded by every deal.
    pub fn total_discount_minor(&self, currency: &'static Currency) -> i64 {
        self.discounts
            .values()
            .filter(|money| money.currency() == currency)
            .map(Money::to_minor_units)
            .fold(0_i64, i64::saturating_add)
    }

    /// Return whether no deal has recorded anything.
    pub fn is_empty(&self) -> bool {
        self.free_quantities.is_empty() && self.discounts.is_empty()
    }
}

/// Units the customer pays for: quantity minus free units granted by deals.
pub fn charged_quantity(purchasable: &dyn Purchasable) -> u32 {
    let free = purchasable
        .ledger()
        .map(DealLedger::total_free_quantity)
        .unwrap_or_default();

    purchasable.quantity().saturating_sub(free)
}

/// Units a deal evaluated in `pass` counts towards conditions and discounts.
///
/// Gifted units never count. Units made free in place only drop out when
/// `pass` sees the deal that freed them.
pub fn countable_quantity(purchasable: &dyn Purchasable, pass: &DealPass) -> u32 {
    let quantity = purchasable.quantity();

    purchasable.ledger().map_or(quantity, |ledger| {
        quantity
            .saturating_sub(ledger.gifted_quantity())
            .saturating_sub(ledger.free_quantity_seen(pass))
    })
}

/// Line total for the countable units, in minor units.
///
/// # Errors
///
/// Returns `DiscountError::Overflow` if the line total overflows.
pub fn countable_minor(purchasable: &dyn Purchasable, pass: &DealPass) -> Result<i64, DiscountError> {
    line_minor(
        purchasable.unit_price().to_minor_units(),
        countable_quantity(purchasable, pass),
    )
}

/// Line total for the charged units, in minor units.
///
/// # Errors
///
/// Returns `DiscountError::Overflow` if the line total overflows.
pub fn charged_minor(purchasable: &dyn Purchasable) -> Result<i64, DiscountError> {
    line_minor(
        purchasable.unit_price().to_minor_units(),
        charged_quantity(purchasable),
    )
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::{GBP, USD};
    use testresult::TestResult;

    use super::*;

    #[derive(Debug)]
    struct Line {
        id: PurchasableId,
        quantity: u32,
        ledger: Option<DealLedger>,
    }

    impl Purchasable for Line {
        fn identifier(&self) -> &PurchasableId {
            &self.id
        }

        fn quantity(&self) -> u32 {
            self.quantity
        }

        fn set_quantity(&mut self, quantity: u32) {
            self.quantity = quantity;
        }

        fn unit_price(&self) -> Money<'static, Currency> {
            Money::from_minor(250, GBP)
        }

        fn ledger(&self) -> Option<&DealLedger> {
            self.ledger.as_ref()
        }

        fn ledger_mut(&mut self) -> Option<&mut DealLedger> {
            self.ledger.as_mut()
        }
    }

    #[test]
    fn ledger_free_quantities_are_cumulative() {
        let first = DealId::new("first");
        let second = DealId::new("second");
        let mut ledger = DealLedger::new();

        ledger.set_free_quantity(&first, 2);
        ledger.set_free_quantity(&second, 1);

        assert_eq!(ledger.total_free_quantity(), 3);
        assert_eq!(ledger.free_quantity_seen(&DealPass::default().for_deal(&first)), 1);

        ledger.set_free_quantity(&first, 0);

        assert_eq!(ledger.free_quantity(&first), 0);
        assert_eq!(ledger.total_free_quantity(), 1);
    }

    #[test]
    fn ledger_discount_seen_skips_own_deal_and_other_currencies() {
        let own = DealId::new("own");
        let other = DealId::new("other");
        let foreign = DealId::new("foreign");
        let mut ledger = DealLedger::new();

        ledger.set_discount(&own, Money::from_minor(100, GBP));
        ledger.set_discount(&other, Money::from_minor(40, GBP));
        ledger.set_discount(&foreign, Money::from_minor(999, USD));

        assert_eq!(ledger.discount_seen_minor(&DealPass::default().for_deal(&own), GBP), 40);
        assert_eq!(ledger.total_discount_minor(GBP), 140);
    }

    #[test]
    fn ledger_zero_discount_clears_entry() {
        let deal = DealId::new("deal");
        let mut ledger = DealLedger::new();

        ledger.set_discount(&deal, Money::from_minor(10, GBP));
        ledger.set_discount(&deal, Money::from_minor(0, GBP));

        assert!(ledger.discount(&deal).is_none());
        assert!(ledger.is_empty());
    }

    #[test]
    fn charged_quantity_excludes_free_units() -> TestResult {
        let mut ledger = DealLedger::new();
        ledger.set_free_quantity(&DealId::new("bogof"), 1);

        let line = Line {
            id: PurchasableId::new("mug"),
            quantity: 3,
            ledger: Some(ledger),
        };

        assert_eq!(charged_quantity(&line), 2);
        assert_eq!(charged_minor(&line)?, 500);

        Ok(())
    }

    #[test]
    fn countable_units_skip_gifts_and_unseen_deals() {
        let earlier = DealId::new("earlier");
        let later = DealId::new("later");
        let gift = DealId::new("gift");
        let mut ledger = DealLedger::new();
        ledger.set_free_quantity(&earlier, 1);
        ledger.set_free_quantity(&later, 1);
        ledger.set_gifted_quantity(&gift, 2);

        let line = Line {
            id: PurchasableId::new("mug"),
            quantity: 6,
            ledger: Some(ledger),
        };

        let mut pass = DealPass::batch();
        pass.applied(&earlier);

        assert_eq!(charged_quantity(&line), 2);
        assert_eq!(countable_quantity(&line, &pass), 3);
        assert_eq!(countable_quantity(&line, &DealPass::default()), 2);
        assert_eq!(countable_quantity(&line, &DealPass::default().for_deal(&later)), 3);
    }

    #[test]
    fn in_place_free_units_replace_a_gift_marker() {
        let deal = DealId::new("deal");
        let mut ledger = DealLedger::new();

        ledger.set_gifted_quantity(&deal, 2);

        assert_eq!(ledger.gifted_quantity(), 2);

        ledger.set_free_quantity(&deal, 1);

        assert_eq!(ledger.gifted_quantity(), 0);
        assert_eq!(ledger.free_quantity(&deal), 1);
    }

    #[test]
    fn plain_purchasables_are_fully_charged() -> TestResult {
        let line = Line {
            id: PurchasableId::new("mug"),
            quantity: 2,
            ledger: None,
        };

        assert_eq!(charged_minor(&line)?, 500);
        assert!(line.matches(&PurchasableId::new("mug")));

        Ok(())
    }
}
