//! Deal context
//!
//! The collaborators a condition or result consults while a deal is evaluated,
//! passed by reference on every call.

use std::fmt;

use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;
use tracing::warn;

use crate::{
    cart::PurchasableHolder,
    coupons::CouponHolder,
    ids::DealId,
    purchasables::{DealLedger, Purchasable},
    services::{Clock, CurrencyService, LocaleService, ShippingService},
};

/// Borrowed collaborators for a single evaluation pass.
pub struct DealContext<'a> {
    /// Cart being evaluated; results may mutate its lines.
    pub cart: &'a mut dyn PurchasableHolder,

    /// Active currency.
    pub currency: &'a dyn CurrencyService,

    /// Active locale.
    pub locale: &'a dyn LocaleService,

    /// Shipping cost.
    pub shipping: &'a dyn ShippingService,

    /// Coupons entered by the customer.
    pub coupons: &'a CouponHolder,

    /// Current time.
    pub clock: &'a dyn Clock,

    /// Other deals whose ledger entries the deal being evaluated sees.
    pub pass: DealPass,
}

impl fmt::Debug for DealContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DealContext")
            .field("cart", &self.cart)
            .field("currency", &self.currency.active_currency_code())
            .field("country", &self.locale.country_code())
            .field("coupons", &self.coupons.len())
            .field("pass", &self.pass)
            .finish_non_exhaustive()
    }
}

impl DealContext<'_> {
    /// Currency currently active.
    pub fn active_currency(&self) -> &'static Currency {
        self.currency.active_currency()
    }

    /// Zero in the active currency.
    pub fn zero(&self) -> Money<'static, Currency> {
        self.currency.zero_money()
    }
}

/// Which deals' ledger entries count while a deal is evaluated.
///
/// The evaluating deal never sees its own entries, since it is about to
/// rewrite them. Outside a batch every other deal's entries count. Inside a
/// batch only the deals that already ran in it do, so entries a
/// lower-priority deal left behind in the previous batch never feed back into
/// a higher-priority one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DealPass {
    current: Option<DealId>,
    applied: Option<SmallVec<[DealId; 8]>>,
}

impl DealPass {
    /// Start a batch in which no deal has run yet.
    pub fn batch() -> Self {
        Self {
            current: None,
            applied: Some(SmallVec::new()),
        }
    }

    /// The same pass, evaluated on behalf of `deal`.
    #[must_use]
    pub fn for_deal(&self, deal: &DealId) -> Self {
        Self {
            current: Some(deal.clone()),
            applied: self.applied.clone(),
        }
    }

    /// Evaluate on behalf of `deal` from now on.
    pub fn enter(&mut self, deal: &DealId) {
        self.current = Some(deal.clone());
    }

    /// Record that `deal` has run, so later deals in the batch see its entries.
    pub fn applied(&mut self, deal: &DealId) {
        if let Some(applied) = &mut self.applied {
            applied.push(deal.clone());
        }

        if self.current.as_ref() == Some(deal) {
            self.current = None;
        }
    }

    /// Deal being evaluated, if any.
    pub fn current(&self) -> Option<&DealId> {
        self.current.as_ref()
    }

    /// Return whether entries recorded by `deal` count.
    pub fn sees(&self, deal: &DealId) -> bool {
        self.current.as_ref() != Some(deal)
            && self
                .applied
                .as_ref()
                .is_none_or(|applied| applied.contains(deal))
    }
}

/// What a result is told about the deal it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct DealView<'a> {
    /// Deal identifier, used to key ledger entries.
    pub identifier: &'a DealId,

    /// How many times the deal's conditions are met.
    pub conditions_met_count: u32,
}

impl<'a> DealView<'a> {
    /// Create a view of a deal.
    pub fn new(identifier: &'a DealId, conditions_met_count: u32) -> Self {
        Self {
            identifier,
            conditions_met_count,
        }
    }
}

/// Return the purchasable's ledger, logging when it cannot take part in deals.
pub(crate) fn ledger_or_skip<'p>(
    purchasable: &'p mut dyn Purchasable,
    deal: &DealId,
) -> Option<&'p mut DealLedger> {
    let id = purchasable.identifier().clone();
    let ledger = purchasable.ledger_mut();

    if ledger.is_none() {
        warn!(deal = %deal, purchasable = %id, "purchasable cannot take part in deals; skipped");
    }

    ledger
}
