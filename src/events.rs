//! Events
//!
//! In-process, synchronous events describing cart and deal changes, the sink
//! they are dispatched to, and the switch that suppresses dispatch while the
//! engine mutates the cart itself.

use std::{cell::Cell, rc::Rc};

use rusty_money::{Money, iso::Currency};

use crate::ids::{DealId, PurchasableId};

/// Something that happened to the cart, its surroundings, or a deal.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The active currency changed.
    CurrencyChanged {
        /// New active currency code
        currency: &'static str,
    },

    /// The active locale changed.
    LocaleChanged {
        /// New country code, if known
        country: Option<String>,
    },

    /// A purchasable was added to the cart.
    PurchasableAdded {
        /// Added purchasable
        purchasable: PurchasableId,

        /// Quantity after the addition
        quantity: u32,
    },

    /// A purchasable's quantity changed.
    PurchasableChanged {
        /// Changed purchasable
        purchasable: PurchasableId,

        /// New quantity
        quantity: u32,
    },

    /// A purchasable was removed from the cart.
    PurchasableRemoved {
        /// Removed purchasable
        purchasable: PurchasableId,
    },

    /// A coupon was added to the coupon holder.
    CouponAdded {
        /// Coupon code
        code: String,
    },

    /// A coupon was removed from the coupon holder.
    CouponRemoved {
        /// Coupon code
        code: String,
    },

    /// A deal's conditions held and its total was recomputed.
    DealTotalUpdated {
        /// Deal
        deal: DealId,

        /// New deal total
        total: Money<'static, Currency>,
    },

    /// A deal's conditions no longer hold.
    DealConditionsNotMet {
        /// Deal
        deal: DealId,
    },
}

impl Event {
    /// Return whether this event should trigger a full deal recompute.
    pub fn triggers_recompute(&self) -> bool {
        !matches!(
            self,
            Event::DealTotalUpdated { .. } | Event::DealConditionsNotMet { .. }
        )
    }
}

/// Receiver for dispatched events.
pub trait EventSink {
    /// Dispatch an event. Fire-and-forget.
    fn dispatch(&mut self, event: Event);
}

/// Sink that records every dispatched event in order.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the recorded events.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Remove and return the recorded events.
    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Return whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for EventLog {
    fn dispatch(&mut self, event: Event) {
        self.events.push(event);
    }
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn dispatch(&mut self, _event: Event) {}
}

/// Shared enable/disable switch for event dispatch.
///
/// Clones share state. Dispatch is enabled while no [`SuppressedEvents`] guard
/// is alive; guards nest.
#[derive(Debug, Clone, Default)]
pub struct EventSwitch {
    suppressed: Rc<Cell<u32>>,
}

impl EventSwitch {
    /// Create an enabled switch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return whether events should currently be dispatched.
    pub fn is_enabled(&self) -> bool {
        self.suppressed.get() == 0
    }

    /// Disable dispatch until the returned guard is dropped.
    #[must_use = "events are re-enabled as soon as the guard is dropped"]
    pub fn suppress(&self) -> SuppressedEvents {
        self.suppressed.set(self.suppressed.get().saturating_add(1));

        SuppressedEvents {
            switch: self.clone(),
        }
    }
}

/// Guard that keeps event dispatch disabled for its lifetime.
#[derive(Debug)]
pub struct SuppressedEvents {
    switch: EventSwitch,
}

impl Drop for SuppressedEvents {
    fn drop(&mut self) {
        let depth = &self.switch.suppressed;

        depth.set(depth.get().saturating_sub(1));
    }
}
