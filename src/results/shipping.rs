//! Shipping Result

use rusty_money::{Money, iso::Currency};
use serde::Deserialize;
use tracing::debug;

use crate::{
    config::{Config, ConfigError},
    context::{DealContext, DealView},
    error::DealError,
    results::{DealResult, DiscountAmount, ResultKind},
};

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ShippingDiscountType {
    Free,
    Amount,
    Percentage,
}

/// How much comes off shipping.
#[derive(Debug, Clone)]
pub enum ShippingDiscount {
    /// Shipping is free.
    Free,

    /// A fixed amount or percentage off shipping.
    Discount(DiscountAmount),
}

/// Discount on the shipping cost, never more than the shipping cost itself.
///
/// When shipping cannot be calculated yet, or is charged in another currency,
/// the discount is zero.
#[derive(Debug, Clone)]
pub struct ShippingResult {
    discount: ShippingDiscount,
}

impl ShippingResult {
    /// Create with a shipping discount.
    pub fn new(discount: ShippingDiscount) -> Self {
        Self { discount }
    }

    /// Create from config keys: `shipping_discount_type` (`free`, `amount` or
    /// `percentage`), with `shipping_discount_amounts` or
    /// `shipping_discount_percentage` to match.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the type is missing or unknown, or the key it
    /// needs is missing or malformed.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let discount = match config.get("shipping_discount_type")? {
            ShippingDiscountType::Free => ShippingDiscount::Free,
            ShippingDiscountType::Amount => ShippingDiscount::Discount(DiscountAmount::Fixed(
                config.currency_amounts("shipping_discount_amounts")?,
            )),
            ShippingDiscountType::Percentage => ShippingDiscount::Discount(
                DiscountAmount::percentage(config.get("shipping_discount_percentage")?)?,
            ),
        };

        Ok(Self::new(discount))
    }
}

impl DealResult for ShippingResult {
    fn kind(&self) -> ResultKind {
        ResultKind::Shipping
    }

    fn process(
        &mut self,
        deal: &DealView<'_>,
        ctx: &mut DealContext<'_>,
    ) -> Result<Money<'static, Currency>, DealError> {
        let currency = ctx.active_currency();

        let Some(shipping) = ctx
            .shipping
            .shipping_total()
            .filter(|shipping| shipping.currency() == currency)
        else {
            debug!(deal = %deal.identifier, "no shipping total to discount");

            return Ok(ctx.zero());
        };

        let cost = shipping.to_minor_units();

        let discount = match &self.discount {
            ShippingDiscount::Free => cost.max(0),
            ShippingDiscount::Discount(amount) => amount.off_minor(cost, currency)?,
        };

        Ok(Money::from_minor(discount, currency))
    }

    fn reset(&mut self, _deal: &DealView<'_>, _ctx: &mut DealContext<'_>) -> Result<(), DealError> {
        Ok(())
    }

    fn description(&self) -> String {
        match &self.discount {
            ShippingDiscount::Free => "Free shipping".to_string(),
            ShippingDiscount::Discount(amount) => format!("{} off shipping", amount.describe()),
        }
    }
}
