//! Cart
//!
//! The purchasable holder interface consumed by the deals engine and an
//! in-memory implementation of it.

use std::fmt;

use rusty_money::{Money, iso::Currency};
use thiserror::Error;
use tracing::warn;

use crate::{
    events::{Event, EventSwitch},
    ids::PurchasableId,
    purchasables::{DealLedger, Purchasable, charged_minor},
};

/// Errors related to cart mutation.
#[derive(Debug, Error)]
pub enum CartError {
    /// A purchasable was not found in the cart.
    #[error("Purchasable {0} not found")]
    PurchasableNotFound(PurchasableId),
}

/// Holder of purchasables (a cart, an order, a quote...).
pub trait PurchasableHolder: fmt::Debug {
    /// Currency the holder's totals are expressed in.
    fn currency(&self) -> &'static Currency;

    /// Purchasables in insertion order.
    fn purchasables(&self) -> Vec<&dyn Purchasable>;

    /// Mutable purchasables in insertion order.
    fn purchasables_mut(&mut self) -> Vec<&mut dyn Purchasable>;

    /// Look up a purchasable by its identifier.
    fn purchasable(&self, id: &PurchasableId) -> Option<&dyn Purchasable>;

    /// Look up a purchasable by its identifier, mutably.
    fn purchasable_mut(&mut self, id: &PurchasableId) -> Option<&mut dyn Purchasable>;

    /// Purchasables sharing a primary identifier.
    fn purchasables_by_primary_identifier(&self, id: &PurchasableId) -> Vec<&dyn Purchasable> {
        self.purchasables()
            .into_iter()
            .filter(|purchasable| purchasable.primary_identifier() == id)
            .collect()
    }

    /// Add `quantity` units of a purchasable, merging with an existing line of the same identifier.
    fn add_purchasable(&mut self, purchasable: Box<dyn Purchasable>, quantity: u32);

    /// Set the quantity of an existing purchasable. Zero removes it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::PurchasableNotFound` if no such purchasable is in the holder.
    fn set_purchasable(&mut self, id: &PurchasableId, quantity: u32) -> Result<(), CartError>;

    /// Remove a purchasable, returning it if it was present.
    fn remove_purchasable(&mut self, id: &PurchasableId) -> Option<Box<dyn Purchasable>>;

    /// Total as of the last [`update_total`](PurchasableHolder::update_total).
    fn total(&self) -> Money<'static, Currency>;

    /// Recompute the total from the current lines and their ledgers.
    fn update_total(&mut self);

    /// Event dispatch switch for this holder.
    fn events(&self) -> &EventSwitch;

    /// Remove and return the events raised since the last call.
    fn take_events(&mut self) -> Vec<Event>;
}

/// A deal-capable cart line.
#[derive(Debug, Clone, PartialEq)]
pub struct CartItem {
    identifier: PurchasableId,
    primary_identifier: PurchasableId,
    name: String,
    price: Money<'static, Currency>,
    quantity: u32,
    ledger: Option<DealLedger>,
}

impl CartItem {
    /// Create a deal-capable line with a unit price and quantity zero.
    pub fn new(identifier: impl Into<PurchasableId>, price: Money<'static, Currency>) -> Self {
        let identifier = identifier.into();

        Self {
            primary_identifier: identifier.clone(),
            name: identifier.to_string(),
            identifier,
            price,
            quantity: 0,
            ledger: Some(DealLedger::new()),
        }
    }

    /// Create a line that cannot take part in deals.
    pub fn plain(identifier: impl Into<PurchasableId>, price: Money<'static, Currency>) -> Self {
        Self {
            ledger: None,
            ..Self::new(identifier, price)
        }
    }

    /// Set the product-level identifier.
    #[must_use]
    pub fn with_primary_identifier(mut self, primary: impl Into<PurchasableId>) -> Self {
        self.primary_identifier = primary.into();
        self
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Purchasable for CartItem {
    fn identifier(&self) -> &PurchasableId {
        &self.identifier
    }

    fn primary_identifier(&self) -> &PurchasableId {
        &self.primary_identifier
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }

    fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
    }

    fn unit_price(&self) -> Money<'static, Currency> {
        self.price
    }

    fn ledger(&self) -> Option<&DealLedger> {
        self.ledger.as_ref()
    }

    fn ledger_mut(&mut self) -> Option<&mut DealLedger> {
        self.ledger.as_mut()
    }
}

/// In-memory cart.
#[derive(Debug)]
pub struct Cart {
    items: Vec<Box<dyn Purchasable>>,
    currency: &'static Currency,
    total: Money<'static, Currency>,
    events: EventSwitch,
    outbox: Vec<Event>,
}

impl Cart {
    /// Create an empty cart in the given currency.
    pub fn new(currency: &'static Currency) -> Self {
        Cart {
            items: Vec::new(),
            currency,
            total: Money::from_minor(0, currency),
            events: EventSwitch::new(),
            outbox: Vec::new(),
        }
    }

    /// Create a cart holding the given lines with their quantities.
    ///
    /// No events are raised for the initial lines.
    pub fn with_items(
        items: impl IntoIterator<Item = (CartItem, u32)>,
        currency: &'static Currency,
    ) -> Self {
        let mut cart = Cart::new(currency);

        {
            let _quiet = cart.events.suppress();

            for (item, quantity) in items {
                cart.add_purchasable(Box::new(item), quantity);
            }
        }

        cart.update_total();
        cart
    }

    /// Get the number of lines in the cart.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Quantity of a purchasable, zero if absent.
    pub fn quantity_of(&self, id: &PurchasableId) -> u32 {
        self.purchasable(id).map_or(0, Purchasable::quantity)
    }

    fn raise(&mut self, event: Event) {
        if self.events.is_enabled() {
            self.outbox.push(event);
        }
    }

    fn position(&self, id: &PurchasableId) -> Option<usize> {
        self.items.iter().position(|item| item.identifier() == id)
    }

    /// Line total after deals. A line whose charged total overflows saturates.
    fn line_total_minor(&self, purchasable: &dyn Purchasable) -> i64 {
        let charged = charged_minor(purchasable).unwrap_or_else(|error| {
            warn!(purchasable = %purchasable.identifier(), %error, "line total overflowed; saturated");

            i64::MAX
        });
        let discounts = purchasable
            .ledger()
            .map(|ledger| ledger.total_discount_minor(self.currency))
            .unwrap_or_default();

        charged.saturating_sub(discounts).max(0)
    }
}

impl PurchasableHolder for Cart {
    fn currency(&self) -> &'static Currency {
        self.currency
    }

    fn purchasables(&self) -> Vec<&dyn Purchasable> {
        let mut purchasables: Vec<&dyn Purchasable> = Vec::with_capacity(self.items.len());

        for item in &self.items {
            purchasables.push(&**item);
        }

        purchasables
    }

    fn purchasables_mut(&mut self) -> Vec<&mut dyn Purchasable> {
        let mut purchasables: Vec<&mut dyn Purchasable> = Vec::with_capacity(self.items.len());

        for item in &mut self.items {
            purchasables.push(&mut **item);
        }

        purchasables
    }

    fn purchasable(&self, id: &PurchasableId) -> Option<&dyn Purchasable> {
        let item = self.items.iter().find(|item| item.identifier() == id)?;

        Some(&**item)
    }

    fn purchasable_mut(&mut self, id: &PurchasableId) -> Option<&mut dyn Purchasable> {
        let item = self.items.iter_mut().find(|item| item.identifier() == id)?;

        Some(&mut **item)
    }

    fn add_purchasable(&mut self, mut purchasable: Box<dyn Purchasable>, quantity: u32) {
        let id = purchasable.identifier().clone();

        let new_quantity = if let Some(existing) = self.purchasable_mut(&id) {
            let new_quantity = existing.quantity().saturating_add(quantity);
            existing.set_quantity(new_quantity);
            new_quantity
        } else {
            purchasable.set_quantity(quantity);
            self.items.push(purchasable);
            quantity
        };

        self.raise(Event::PurchasableAdded {
            purchasable: id,
            quantity: new_quantity,
        });
    }

    fn set_purchasable(&mut self, id: &PurchasableId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return self
                .remove_purchasable(id)
                .map(|_| ())
                .ok_or_else(|| CartError::PurchasableNotFound(id.clone()));
        }

        let existing = self
            .purchasable_mut(id)
            .ok_or_else(|| CartError::PurchasableNotFound(id.clone()))?;

        existing.set_quantity(quantity);

        self.raise(Event::PurchasableChanged {
            purchasable: id.clone(),
            quantity,
        });

        Ok(())
    }

    fn remove_purchasable(&mut self, id: &PurchasableId) -> Option<Box<dyn Purchasable>> {
        let removed = self.items.remove(self.position(id)?);

        self.raise(Event::PurchasableRemoved {
            purchasable: id.clone(),
        });

        Some(removed)
    }

    fn total(&self) -> Money<'static, Currency> {
        self.total
    }

    fn update_total(&mut self) {
        let total = self
            .items
            .iter()
            .map(|item| self.line_total_minor(&**item))
            .fold(0_i64, i64::saturating_add);

        self.total = Money::from_minor(total, self.currency);
    }

    fn events(&self) -> &EventSwitch {
        &self.events
    }

    fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.outbox)
    }
}
