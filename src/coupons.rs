//! Coupons
//!
//! Coupons bound to deals and the holder that keeps the coupons a customer has
//! entered.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{events::Event, ids::DealId};

/// Errors related to coupon handling.
#[derive(Debug, Error)]
pub enum CouponError {
    /// The coupon code is already held.
    #[error("coupon {0} has already been added")]
    Duplicate(String),
}

/// A coupon code, optionally bound to a deal and a validity window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    /// Code entered by the customer.
    pub code: String,

    /// Deal this coupon unlocks.
    pub deal: Option<DealId>,

    /// Whether the coupon is switched on at all.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,

    /// Start of the validity window (inclusive).
    #[serde(default)]
    pub valid_from: Option<Timestamp>,

    /// End of the validity window (exclusive).
    #[serde(default)]
    pub valid_until: Option<Timestamp>,
}

fn enabled_by_default() -> bool {
    true
}

impl Coupon {
    /// Create an enabled coupon bound to a deal, with no validity window.
    pub fn new(code: impl Into<String>, deal: DealId) -> Self {
        Self {
            code: code.into(),
            deal: Some(deal),
            enabled: true,
            valid_from: None,
            valid_until: None,
        }
    }

    /// Restrict the validity window.
    #[must_use]
    pub fn valid_between(mut self, from: Option<Timestamp>, until: Option<Timestamp>) -> Self {
        self.valid_from = from;
        self.valid_until = until;
        self
    }

    /// Switch the coupon off.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Return whether the coupon can be redeemed at `now`.
    pub fn is_valid(&self, now: Timestamp) -> bool {
        self.enabled
            && self.valid_from.is_none_or(|from| now >= from)
            && self.valid_until.is_none_or(|until| now < until)
    }

    /// Return whether this coupon is bound to `deal`.
    pub fn unlocks(&self, deal: &DealId) -> bool {
        self.deal.as_ref() == Some(deal)
    }
}

/// Coupons entered against the current cart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CouponHolder {
    coupons: Vec<Coupon>,
}

impl CouponHolder {
    /// Create an empty holder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a coupon, returning the event to dispatch.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::Duplicate` if a coupon with the same code is held.
    pub fn add(&mut self, coupon: Coupon) -> Result<Event, CouponError> {
        if self.get(&coupon.code).is_some() {
            return Err(CouponError::Duplicate(coupon.code));
        }

        debug!(code = %coupon.code, "coupon added");

        let event = Event::CouponAdded {
            code: coupon.code.clone(),
        };

        self.coupons.push(coupon);

        Ok(event)
    }

    /// Remove a coupon by code, returning the event to dispatch if it was held.
    pub fn remove(&mut self, code: &str) -> Option<Event> {
        let position = self.coupons.iter().position(|coupon| coupon.code == code)?;
        let removed = self.coupons.remove(position);

        debug!(code = %removed.code, "coupon removed");

        Some(Event::CouponRemoved { code: removed.code })
    }

    /// Look up a coupon by code.
    pub fn get(&self, code: &str) -> Option<&Coupon> {
        self.coupons.iter().find(|coupon| coupon.code == code)
    }

    /// Iterate over held coupons.
    pub fn iter(&self) -> impl Iterator<Item = &Coupon> {
        self.coupons.iter()
    }

    /// Return whether a valid coupon bound to `deal` is held at `now`.
    pub fn has_valid_coupon_for(&self, deal: &DealId, now: Timestamp) -> bool {
        self.coupons
            .iter()
            .any(|coupon| coupon.unlocks(deal) && coupon.is_valid(now))
    }

    /// Get the number of held coupons.
    pub fn len(&self) -> usize {
        self.coupons.len()
    }

    /// Check if no coupons are held.
    pub fn is_empty(&self) -> bool {
        self.coupons.is_empty()
    }
}
