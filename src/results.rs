//! Results
//!
//! What a deal does once its conditions hold: discounts recorded against cart
//! lines, free units, or a shipping discount.

use std::{fmt, str::FromStr};

use decimal_percentage::Percentage;
use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};

use crate::{
    config::{Config, ConfigError, CurrencyAmounts, exclusive_keys},
    context::{DealContext, DealView},
    discounts::{DiscountError, percent_of_minor, percent_points, percentage_from_points},
    error::DealError,
    ids::{DealId, PurchasableId},
    results::{
        cart_discount::CartDiscountResult, cheapest::CheapestPurchasableDiscountResult,
        free_gift::FreeGiftResult, gift_choice::GiftChoiceResult,
        purchasable_discount::PurchasableDiscountResult, shipping::ShippingResult,
    },
};

pub mod cart_discount;
pub mod cheapest;
pub mod free_gift;
pub mod gift_choice;
pub mod purchasable_discount;
pub mod shipping;

/// Result type tags, as used in deal configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    /// Discount spread across the whole cart
    CartDiscount,

    /// Discount on specific purchasables
    PurchasableDiscount,

    /// Free units of a gift purchasable
    FreeGift,

    /// Cheapest matching units made free
    CheapestPurchasableDiscount,

    /// Discount on shipping
    Shipping,

    /// Free units of a gift chosen by the customer
    GiftChoice,
}

impl ResultKind {
    /// Every result type.
    pub const ALL: [ResultKind; 6] = [
        ResultKind::CartDiscount,
        ResultKind::PurchasableDiscount,
        ResultKind::FreeGift,
        ResultKind::CheapestPurchasableDiscount,
        ResultKind::Shipping,
        ResultKind::GiftChoice,
    ];

    /// Configuration tag for this type.
    pub fn as_str(self) -> &'static str {
        match self {
            ResultKind::CartDiscount => "cart_discount",
            ResultKind::PurchasableDiscount => "purchasable_discount",
            ResultKind::FreeGift => "free_gift",
            ResultKind::CheapestPurchasableDiscount => "cheapest_purchasable_discount",
            ResultKind::Shipping => "shipping",
            ResultKind::GiftChoice => "gift_choice",
        }
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultKind {
    type Err = ConfigError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        ResultKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == tag)
            .ok_or_else(|| ConfigError::UnknownResult(tag.to_string()))
    }
}

/// Bookkeeping a result keeps between evaluations, persisted with its deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResultState {
    /// Gift choice selection.
    GiftChoice {
        /// Gift chosen by the customer, if any.
        selected: Option<PurchasableId>,

        /// Gift currently granted in the cart, if any.
        awarded: Option<PurchasableId>,
    },
}

/// The action a deal applies when its conditions hold.
pub trait DealResult: fmt::Debug {
    /// Type tag of this result.
    fn kind(&self) -> ResultKind;

    /// Apply the result, returning the value it is worth to the customer.
    ///
    /// # Errors
    ///
    /// Returns a `DealError` if discount arithmetic or cart mutation fails.
    fn process(
        &mut self,
        deal: &DealView<'_>,
        ctx: &mut DealContext<'_>,
    ) -> Result<Money<'static, Currency>, DealError>;

    /// Undo everything this deal recorded against the cart.
    ///
    /// # Errors
    ///
    /// Returns a `DealError` if cart mutation fails.
    fn reset(&mut self, deal: &DealView<'_>, ctx: &mut DealContext<'_>) -> Result<(), DealError>;

    /// Human-readable description.
    fn description(&self) -> String;

    /// Bookkeeping to persist, if the result keeps any.
    fn snapshot(&self) -> Option<ResultState> {
        None
    }

    /// Restore persisted bookkeeping.
    fn restore(&mut self, _state: &ResultState) {}

    /// Select one of the result's options.
    ///
    /// # Errors
    ///
    /// Returns `DealError::ChoiceUnsupported` unless the result offers a
    /// choice, or `DealError::UnknownGift` if `option` is not on offer.
    fn choose(&mut self, deal: &DealId, _option: &PurchasableId) -> Result<(), DealError> {
        Err(DealError::ChoiceUnsupported(deal.clone()))
    }
}

/// A discount configured either as fixed per-currency amounts or a percentage.
#[derive(Debug, Clone)]
pub enum DiscountAmount {
    /// Fixed amount per currency, in minor units.
    Fixed(CurrencyAmounts),

    /// Percentage of the discounted base.
    Percentage(Percentage),
}

impl DiscountAmount {
    /// Read from two mutually exclusive keys: a currency amount map and a
    /// percentage in points (`10` is 10%).
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` unless exactly one key is present and valid.
    pub fn from_config(
        config: &Config,
        amounts_key: &str,
        percentage_key: &str,
    ) -> Result<Self, ConfigError> {
        if exclusive_keys(config, amounts_key, percentage_key)? {
            Ok(DiscountAmount::Fixed(config.currency_amounts(amounts_key)?))
        } else {
            Self::percentage(config.get(percentage_key)?)
        }
    }

    /// Build a percentage discount from points (`10` is 10%).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Discount` if `points` is not finite.
    pub fn percentage(points: f64) -> Result<Self, ConfigError> {
        Ok(DiscountAmount::Percentage(percentage_from_points(points)?))
    }

    /// Discount off `base` minor units, never more than `base` nor less than zero.
    ///
    /// A fixed discount without an amount for `currency` is zero.
    ///
    /// # Errors
    ///
    /// Returns a `DiscountError` if the percentage cannot be applied.
    pub fn off_minor(&self, base: i64, currency: &'static Currency) -> Result<i64, DiscountError> {
        let base = base.max(0);

        let discount = match self {
            DiscountAmount::Fixed(amounts) => amounts
                .get(currency)
                .map_or(0, |amount| amount.to_minor_units()),
            DiscountAmount::Percentage(percent) => percent_of_minor(percent, base)?,
        };

        Ok(discount.clamp(0, base))
    }

    fn describe(&self) -> String {
        match self {
            DiscountAmount::Fixed(_) => "a fixed amount".to_string(),
            DiscountAmount::Percentage(percent) => format!("{}%", percent_points(*percent)),
        }
    }
}

/// Build a result from its configuration tag and flat config.
///
/// # Errors
///
/// Returns `ConfigError::UnknownResult` for an unrecognised tag, or any error
/// raised validating the result's configuration.
pub fn build_result(kind: &str, config: &Config) -> Result<Box<dyn DealResult>, ConfigError> {
    let result: Box<dyn DealResult> = match kind.parse()? {
        ResultKind::CartDiscount => Box::new(CartDiscountResult::from_config(config)?),
        ResultKind::PurchasableDiscount => {
            Box::new(PurchasableDiscountResult::from_config(config)?)
        }
        ResultKind::FreeGift => Box::new(FreeGiftResult::from_config(config)?),
        ResultKind::CheapestPurchasableDiscount => {
            Box::new(CheapestPurchasableDiscountResult::from_config(config)?)
        }
        ResultKind::Shipping => Box::new(ShippingResult::from_config(config)?),
        ResultKind::GiftChoice => Box::new(GiftChoiceResult::from_config(config)?),
    };

    Ok(result)
}

/// Clear every discount `deal` recorded against the cart.
pub(crate) fn clear_discounts(deal: &DealId, ctx: &mut DealContext<'_>) {
    let zero = ctx.zero();

    for purchasable in ctx.cart.purchasables_mut() {
        if let Some(ledger) = purchasable.ledger_mut() {
            ledger.set_discount(deal, zero);
        }
    }
}

/// Clear every free unit `deal` recorded against the cart, leaving quantities alone.
pub(crate) fn clear_free_quantities(deal: &DealId, ctx: &mut DealContext<'_>) {
    for purchasable in ctx.cart.purchasables_mut() {
        if let Some(ledger) = purchasable.ledger_mut() {
            ledger.set_free_quantity(deal, 0);
        }
    }
}
