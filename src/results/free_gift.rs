//! Free Gift Result
//!
//! Grants free units of a gift purchasable, adding it to the cart when the
//! customer has not. The units a deal grants are recorded in the gift line's
//! free-quantity ledger, so a later pass can take back exactly what it gave.

use std::collections::BTreeMap;

use rusty_money::{Money, iso::Currency};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    cart::CartItem,
    config::{Config, ConfigError, CurrencyAmounts},
    context::{DealContext, DealView},
    discounts::{DiscountError, line_minor},
    error::DealError,
    ids::{DealId, PurchasableId},
    purchasables::Purchasable,
    results::{DealResult, ResultKind},
};

/// Gift as written in configuration.
#[derive(Debug, Clone, Deserialize)]
struct GiftSpec {
    identifier: PurchasableId,
    #[serde(default)]
    primary_identifier: Option<PurchasableId>,
    #[serde(default)]
    name: Option<String>,
    prices: BTreeMap<String, i64>,
}

/// A purchasable a deal can give away.
#[derive(Debug, Clone)]
pub struct Gift {
    identifier: PurchasableId,
    primary_identifier: Option<PurchasableId>,
    name: Option<String>,
    prices: CurrencyAmounts,
}

impl Gift {
    /// Create a gift with a unit price per currency.
    pub fn new(identifier: impl Into<PurchasableId>, prices: CurrencyAmounts) -> Self {
        Self {
            identifier: identifier.into(),
            primary_identifier: None,
            name: None,
            prices,
        }
    }

    /// Set the product-level identifier.
    #[must_use]
    pub fn with_primary_identifier(mut self, primary: impl Into<PurchasableId>) -> Self {
        self.primary_identifier = Some(primary.into());
        self
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Identifier of the gift purchasable.
    pub fn identifier(&self) -> &PurchasableId {
        &self.identifier
    }

    /// Display name, falling back to the identifier.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.identifier.as_str())
    }

    /// Read a gift from a config key holding
    /// `{ identifier, primary_identifier?, name?, prices }`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the key is missing, malformed, or prices
    /// use an unknown currency.
    pub fn from_config(config: &Config, key: &str) -> Result<Self, ConfigError> {
        Self::from_spec(config.get(key)?)
    }

    /// Read a list of gifts from a config key.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the key is missing, malformed, empty, or
    /// prices use an unknown currency.
    pub fn list_from_config(config: &Config, key: &str) -> Result<Vec<Self>, ConfigError> {
        let specs: Vec<GiftSpec> = config.get(key)?;

        if specs.is_empty() {
            return Err(ConfigError::Invalid {
                key: key.to_string(),
                reason: "at least one gift is required".to_string(),
            });
        }

        specs.into_iter().map(Self::from_spec).collect()
    }

    fn from_spec(spec: GiftSpec) -> Result<Self, ConfigError> {
        Ok(Self {
            identifier: spec.identifier,
            primary_identifier: spec.primary_identifier,
            name: spec.name,
            prices: CurrencyAmounts::try_from_codes(spec.prices)?,
        })
    }

    fn cart_item(&self, price: Money<'static, Currency>) -> CartItem {
        let item = CartItem::new(self.identifier.clone(), price).with_name(self.name());

        match &self.primary_identifier {
            Some(primary) => item.with_primary_identifier(primary.clone()),
            None => item,
        }
    }
}

/// Make `units` of `gift` free for `deal`, replacing whatever it granted before.
///
/// Returns the value of the free units. Without a price for the active
/// currency whatever `deal` granted before is taken back and the value is
/// zero.
pub(crate) fn grant(
    gift: &Gift,
    deal: &DealId,
    units: u32,
    ctx: &mut DealContext<'_>,
) -> Result<Money<'static, Currency>, DealError> {
    let currency = ctx.active_currency();

    let Some(price) = gift.prices.get(currency) else {
        debug!(deal = %deal, gift = %gift.identifier, currency = currency.iso_alpha_code, "no gift price for currency");

        revoke(gift.identifier(), deal, ctx);

        return Ok(ctx.zero());
    };

    if units == 0 {
        revoke(gift.identifier(), deal, ctx);

        return Ok(ctx.zero());
    }

    let unit_price = {
        let _quiet = ctx.cart.events().suppress();

        if let Some(line) = ctx.cart.purchasable_mut(&gift.identifier) {
            let Some(previous) = line.ledger().map(|ledger| ledger.free_quantity(deal)) else {
                warn!(deal = %deal, gift = %gift.identifier, "gift line cannot take part in deals; skipped");

                return Ok(ctx.zero());
            };

            let quantity = line.quantity().saturating_sub(previous).saturating_add(units);
            line.set_quantity(quantity);

            if let Some(ledger) = line.ledger_mut() {
                ledger.set_gifted_quantity(deal, units);
            }

            line.unit_price()
        } else {
            let mut item = gift.cart_item(price);

            if let Some(ledger) = item.ledger_mut() {
                ledger.set_gifted_quantity(deal, units);
            }

            ctx.cart.add_purchasable(Box::new(item), units);

            price
        }
    };

    ctx.cart.update_total();

    let value = line_minor(unit_price.to_minor_units(), units)?;

    debug!(deal = %deal, gift = %gift.identifier, units, value, "gift granted");

    Ok(Money::from_minor(value, unit_price.currency()))
}

/// Take back the free units `deal` granted on a gift line, removing the line
/// when nothing is left.
pub(crate) fn revoke(gift: &PurchasableId, deal: &DealId, ctx: &mut DealContext<'_>) {
    let removed = {
        let _quiet = ctx.cart.events().suppress();

        let Some(line) = ctx.cart.purchasable_mut(gift) else {
            return;
        };

        let Some(own) = line.ledger_mut().map(|ledger| {
            let own = ledger.free_quantity(deal);
            ledger.set_free_quantity(deal, 0);
            own
        }) else {
            return;
        };

        if own == 0 {
            return;
        }

        let remaining = line.quantity().saturating_sub(own);
        line.set_quantity(remaining);

        if remaining == 0 {
            ctx.cart.remove_purchasable(gift);
        }

        own
    };

    ctx.cart.update_total();

    debug!(deal = %deal, gift = %gift, removed, "gift revoked");
}

/// Free units of a gift, `quantity` for every time the deal's conditions are met.
#[derive(Debug, Clone)]
pub struct FreeGiftResult {
    gift: Gift,
    quantity: u32,
}

impl FreeGiftResult {
    /// Create with one free unit per award.
    pub fn new(gift: Gift) -> Self {
        Self { gift, quantity: 1 }
    }

    /// Set the free units per award.
    #[must_use]
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    /// Create from config keys: `gift`, `quantity`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `gift` is missing or malformed, or `quantity` is malformed.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(Gift::from_config(config, "gift")?)
            .with_quantity(config.get_opt("quantity")?.unwrap_or(1)))
    }
}

impl DealResult for FreeGiftResult {
    fn kind(&self) -> ResultKind {
        ResultKind::FreeGift
    }

    fn process(
        &mut self,
        deal: &DealView<'_>,
        ctx: &mut DealContext<'_>,
    ) -> Result<Money<'static, Currency>, DealError> {
        let units = deal
            .conditions_met_count
            .checked_mul(self.quantity)
            .ok_or(DiscountError::Overflow)?;

        grant(&self.gift, deal.identifier, units, ctx)
    }

    fn reset(&mut self, deal: &DealView<'_>, ctx: &mut DealContext<'_>) -> Result<(), DealError> {
        revoke(self.gift.identifier(), deal.identifier, ctx);

        Ok(())
    }

    fn description(&self) -> String {
        format!("Free {}", self.gift.name())
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::{GBP, USD};
    use testresult::TestResult;

    use crate::{cart::PurchasableHolder, fixtures::Storefront, purchasables::charged_quantity};

    use super::*;

    fn sticker() -> Gift {
        Gift::new("sticker", CurrencyAmounts::new([(USD, 200)])).with_name("Sticker")
    }

    fn free_of(store: &Storefront, deal: &DealId) -> u32 {
        store
            .cart
            .purchasable(&PurchasableId::new("sticker"))
            .and_then(Purchasable::ledger)
            .map_or(0, |ledger| ledger.free_quantity(deal))
    }

    #[test]
    fn adds_missing_gift_as_free_units() -> TestResult {
        let deal = DealId::new("gift");
        let mut store = Storefront::new(USD);
        store.add(CartItem::new("mug", Money::from_minor(500, USD)), 1);

        let mut result = FreeGiftResult::new(sticker());
        let value = result.process(&DealView::new(&deal, 2), &mut store.context())?;

        assert_eq!(value, Money::from_minor(400, USD));
        assert_eq!(store.cart.quantity_of(&PurchasableId::new("sticker")), 2);
        assert_eq!(free_of(&store, &deal), 2);
        assert_eq!(store.cart.total(), Money::from_minor(500, USD));
        // Only the customer's own addition is reported.
        assert_eq!(store.cart.take_events().len(), 1);

        Ok(())
    }

    #[test]
    fn paid_units_of_the_gift_are_kept() -> TestResult {
        let deal = DealId::new("gift");
        let mut store = Storefront::new(USD);
        store.add(CartItem::new("sticker", Money::from_minor(200, USD)), 1);

        let mut result = FreeGiftResult::new(sticker());
        result.process(&DealView::new(&deal, 1), &mut store.context())?;

        assert_eq!(store.cart.quantity_of(&PurchasableId::new("sticker")), 2);

        result.process(&DealView::new(&deal, 3), &mut store.context())?;

        let line = store.cart.purchasable(&PurchasableId::new("sticker"));

        assert_eq!(line.map(Purchasable::quantity), Some(4));
        assert_eq!(line.map(charged_quantity), Some(1));

        Ok(())
    }

    #[test]
    fn reset_removes_emptied_gift_line() -> TestResult {
        let deal = DealId::new("gift");
        let mut store = Storefront::new(USD);
        let mut result = FreeGiftResult::new(sticker());

        result.process(&DealView::new(&deal, 2), &mut store.context())?;
        result.reset(&DealView::new(&deal, 0), &mut store.context())?;

        assert!(store.cart.purchasable(&PurchasableId::new("sticker")).is_none());

        Ok(())
    }

    #[test]
    fn reset_keeps_paid_units() -> TestResult {
        let deal = DealId::new("gift");
        let mut store = Storefront::new(USD);
        store.add(CartItem::new("sticker", Money::from_minor(200, USD)), 1);

        let mut result = FreeGiftResult::new(sticker());

        result.process(&DealView::new(&deal, 2), &mut store.context())?;
        result.reset(&DealView::new(&deal, 0), &mut store.context())?;

        assert_eq!(store.cart.quantity_of(&PurchasableId::new("sticker")), 1);
        assert_eq!(free_of(&store, &deal), 0);

        Ok(())
    }

    #[test]
    fn quantity_multiplies_awards() -> TestResult {
        let deal = DealId::new("gift");
        let mut store = Storefront::new(USD);

        let mut result = FreeGiftResult::new(sticker()).with_quantity(2);
        result.process(&DealView::new(&deal, 3), &mut store.context())?;

        assert_eq!(free_of(&store, &deal), 6);

        Ok(())
    }

    #[test]
    fn missing_price_for_currency_changes_nothing() -> TestResult {
        let deal = DealId::new("gift");
        let mut store = Storefront::new(GBP);

        let mut result = FreeGiftResult::new(sticker());
        let value = result.process(&DealView::new(&deal, 1), &mut store.context())?;

        assert!(value.is_zero());
        assert!(store.cart.is_empty());

        Ok(())
    }

    #[test]
    fn switching_to_an_unpriced_currency_takes_the_gift_back() -> TestResult {
        let deal = DealId::new("gift");
        let mut store = Storefront::new(USD);
        store.add(CartItem::new("mug", Money::from_minor(500, USD)), 1);

        let mut result = FreeGiftResult::new(sticker());
        result.process(&DealView::new(&deal, 1), &mut store.context())?;

        assert_eq!(free_of(&store, &deal), 1);

        store.currency.set(GBP);
        let value = result.process(&DealView::new(&deal, 1), &mut store.context())?;

        assert!(value.is_zero());
        assert!(store.cart.purchasable(&PurchasableId::new("sticker")).is_none());
        assert_eq!(store.cart.total(), Money::from_minor(500, USD));

        Ok(())
    }

    #[test]
    fn config_reads_gift_spec() -> TestResult {
        let config = Config::from_yaml(
            "{ gift: { identifier: sticker, name: Sticker, prices: { USD: 200 } }, quantity: 2 }",
        )?;

        let result = FreeGiftResult::from_config(&config)?;

        assert_eq!(result.description(), "Free Sticker");
        assert_eq!(result.quantity, 2);

        Ok(())
    }

    #[test]
    fn config_rejects_unknown_gift_currency() -> TestResult {
        let config = Config::from_yaml("gift: { identifier: sticker, prices: { ZZZ: 200 } }")?;

        assert!(matches!(
            FreeGiftResult::from_config(&config),
            Err(ConfigError::UnknownCurrency(code)) if code == "ZZZ"
        ));

        Ok(())
    }
}
