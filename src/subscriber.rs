//! Deals Subscriber
//!
//! Keeps every configured deal, recomputes them in priority order when the
//! cart or its surroundings change, and persists their bookkeeping.

use rusty_money::{Money, iso::Currency};
use slotmap::{SlotMap, new_key_type};
use tracing::{debug, info};

use crate::{
    config::{ConfigError, deals::DealsConfig},
    context::{DealContext, DealPass},
    coupons::CouponHolder,
    discounts::DiscountError,
    error::DealError,
    events::{Event, EventLog},
    handler::{DealHandler, DealState},
    ids::{DealId, PurchasableId},
    state::{StateStore, load_state, save_state},
};

new_key_type! {
    /// Deal Key
    pub struct DealKey;
}

const COUPONS_KEY: &str = "coupons";

/// Orchestrates recomputes across every registered deal.
///
/// Deals run by descending priority; equal priorities keep registration order,
/// so a higher-priority deal's ledger entries are in place before a
/// lower-priority deal that excludes other discounts computes its base.
#[derive(Debug)]
pub struct DealsSubscriber {
    deals: SlotMap<DealKey, DealHandler>,
    order: Vec<DealKey>,
    store: Box<dyn StateStore>,
    broadcasts: EventLog,
    recomputing: bool,
}

impl DealsSubscriber {
    /// Create a subscriber persisting to `store`.
    pub fn new(store: impl StateStore + 'static) -> Self {
        Self {
            deals: SlotMap::with_key(),
            order: Vec::new(),
            store: Box::new(store),
            broadcasts: EventLog::new(),
            recomputing: false,
        }
    }

    /// Build and register every deal in a configuration.
    ///
    /// # Errors
    ///
    /// Returns a `DealError` if a deal cannot be built, an identifier repeats,
    /// or persisted state cannot be decoded.
    pub fn from_config(
        config: &DealsConfig,
        store: impl StateStore + 'static,
    ) -> Result<Self, DealError> {
        let mut subscriber = Self::new(store);

        for handler in config.build()? {
            subscriber.register(handler)?;
        }

        Ok(subscriber)
    }

    /// Register a deal, restoring any state persisted for it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DuplicateDeal` if a deal with the same identifier
    /// is registered, or `StateError::Decode` if its persisted state is
    /// malformed.
    pub fn register(&mut self, mut handler: DealHandler) -> Result<DealKey, DealError> {
        if self.deal(handler.identifier()).is_some() {
            return Err(ConfigError::DuplicateDeal(handler.identifier().to_string()).into());
        }

        if let Some(state) = load_state::<DealState>(&*self.store, &handler.state_key())? {
            debug!(deal = %handler.identifier(), "restoring persisted deal state");

            handler.restore(&state);
        }

        let priority = handler.priority();
        let position = self
            .order
            .iter()
            .position(|key| {
                self.deals
                    .get(*key)
                    .is_some_and(|existing| existing.priority() < priority)
            })
            .unwrap_or(self.order.len());

        let key = self.deals.insert(handler);

        self.order.insert(position, key);

        Ok(key)
    }

    /// Get a deal by key.
    pub fn get(&self, key: DealKey) -> Option<&DealHandler> {
        self.deals.get(key)
    }

    /// Find a deal by identifier.
    pub fn deal(&self, identifier: &DealId) -> Option<&DealHandler> {
        self.deals
            .values()
            .find(|handler| handler.identifier() == identifier)
    }

    /// Deals in the order they are recomputed.
    pub fn deals(&self) -> impl Iterator<Item = &DealHandler> {
        self.order.iter().filter_map(|key| self.deals.get(*key))
    }

    /// Get the number of registered deals.
    pub fn len(&self) -> usize {
        self.deals.len()
    }

    /// Check if no deals are registered.
    pub fn is_empty(&self) -> bool {
        self.deals.is_empty()
    }

    /// The state store deals persist to.
    pub fn store(&self) -> &dyn StateStore {
        &*self.store
    }

    /// Give up the subscriber, keeping its state store.
    pub fn into_store(self) -> Box<dyn StateStore> {
        self.store
    }

    /// Remove and return the deal events broadcast since the last call.
    pub fn drain_broadcasts(&mut self) -> Vec<Event> {
        self.broadcasts.drain()
    }

    /// Return whether a recompute batch is running.
    pub fn is_recomputing(&self) -> bool {
        self.recomputing
    }

    /// React to an event.
    ///
    /// Cart, currency, locale and coupon events recompute every deal. A deal
    /// total update outside a recompute batch refreshes the cart total; inside
    /// a batch the cart total is refreshed once at the end instead.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while recomputing.
    pub fn on_event(&mut self, event: &Event, ctx: &mut DealContext<'_>) -> Result<(), DealError> {
        if event.triggers_recompute() {
            return self.recompute(ctx);
        }

        if matches!(event, Event::DealTotalUpdated { .. }) && !self.recomputing {
            ctx.cart.update_total();
        }

        Ok(())
    }

    /// Handle every event the cart raised since the last call.
    ///
    /// At most one recompute runs however many events were pending.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while recomputing.
    pub fn process_pending(&mut self, ctx: &mut DealContext<'_>) -> Result<(), DealError> {
        let pending = ctx.cart.take_events();

        if pending.iter().any(Event::triggers_recompute) {
            debug!(events = pending.len(), "pending cart events");

            self.recompute(ctx)?;
        }

        Ok(())
    }

    /// Recompute every deal in priority order, persist their state, then
    /// refresh the cart total once.
    ///
    /// A recompute requested while one is running is skipped.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a deal or the state store. Deals after
    /// the failing one are not recomputed.
    #[tracing::instrument(name = "deals.recompute", skip_all, fields(deals = self.order.len()))]
    pub fn recompute(&mut self, ctx: &mut DealContext<'_>) -> Result<(), DealError> {
        if self.recomputing {
            debug!("recompute already running; skipped");

            return Ok(());
        }

        self.recomputing = true;

        let outcome = self.recompute_batch(ctx);

        self.recomputing = false;

        outcome
    }

    fn recompute_batch(&mut self, ctx: &mut DealContext<'_>) -> Result<(), DealError> {
        ctx.pass = DealPass::batch();

        let outcome = self.recompute_each(ctx);

        ctx.pass = DealPass::default();

        outcome
    }

    fn recompute_each(&mut self, ctx: &mut DealContext<'_>) -> Result<(), DealError> {
        for key in &self.order {
            let Some(handler) = self.deals.get_mut(*key) else {
                continue;
            };

            handler.recompute(ctx, &mut self.broadcasts)?;
            ctx.pass.applied(handler.identifier());

            if let Some(state) = handler.state() {
                save_state(&mut *self.store, &handler.state_key(), &state)?;
            }
        }

        save_state(&mut *self.store, COUPONS_KEY, ctx.coupons)?;

        ctx.cart.update_total();

        info!(total = %ctx.cart.total(), "cart total updated");

        Ok(())
    }

    /// Sum of every deal's last total in `currency`.
    ///
    /// # Errors
    ///
    /// Returns `DiscountError::Overflow` if the sum does not fit.
    pub fn total_discount(
        &self,
        currency: &'static Currency,
    ) -> Result<Money<'static, Currency>, DealError> {
        let total = self
            .deals()
            .filter_map(DealHandler::total)
            .filter(|total| total.currency() == currency)
            .try_fold(0_i64, |acc, total| acc.checked_add(total.to_minor_units()))
            .ok_or(DiscountError::Overflow)?;

        Ok(Money::from_minor(total, currency))
    }

    /// Promotional message of every deal that has one for its current state,
    /// in recompute order.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a condition.
    pub fn messages(&self, ctx: &mut DealContext<'_>) -> Result<Vec<(DealId, String)>, DealError> {
        ctx.pass = DealPass::batch();

        let messages = self.collect_messages(ctx);

        ctx.pass = DealPass::default();

        messages
    }

    fn collect_messages(
        &self,
        ctx: &mut DealContext<'_>,
    ) -> Result<Vec<(DealId, String)>, DealError> {
        let mut messages = Vec::new();

        for handler in self.deals() {
            if let Some(message) = handler.message(ctx)? {
                messages.push((handler.identifier().clone(), message.to_string()));
            }

            ctx.pass.applied(handler.identifier());
        }

        Ok(messages)
    }

    /// Select a gift on a gift-choice deal and recompute.
    ///
    /// # Errors
    ///
    /// Returns `DealError::DealNotFound` for an unknown deal,
    /// `DealError::ChoiceUnsupported` if the deal offers no choice,
    /// `DealError::UnknownGift` if the gift is not on offer, or any error
    /// raised while recomputing.
    pub fn choose_gift(
        &mut self,
        deal: &DealId,
        gift: &PurchasableId,
        ctx: &mut DealContext<'_>,
    ) -> Result<(), DealError> {
        let handler = self
            .deals
            .values_mut()
            .find(|handler| handler.identifier() == deal)
            .ok_or_else(|| DealError::DealNotFound(deal.clone()))?;

        handler.choose(gift)?;

        info!(deal = %deal, gift = %gift, "gift chosen");

        self.recompute(ctx)
    }

    /// Coupons persisted by the last recompute, if any.
    ///
    /// # Errors
    ///
    /// Returns `StateError::Decode` if the persisted coupons are malformed.
    pub fn saved_coupons(&self) -> Result<Option<CouponHolder>, DealError> {
        Ok(load_state(&*self.store, COUPONS_KEY)?)
    }
}
