//! Fixtures
//!
//! A storefront wiring a cart to in-memory services, loadable from YAML, for
//! tests and demos.

use std::{fs, path::Path};

use jiff::Timestamp;
use rusty_money::{Money, iso::Currency};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    cart::{Cart, CartItem, PurchasableHolder},
    config::find_currency,
    context::{DealContext, DealPass},
    coupons::{Coupon, CouponError, CouponHolder},
    ids::{DealId, PurchasableId},
    purchasables::Purchasable,
    services::{ActiveCurrency, FixedClock, FlatShipping, StaticLocale},
};

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Coupon could not be added
    #[error(transparent)]
    Coupon(#[from] CouponError),
}

#[derive(Debug, Deserialize)]
struct StorefrontFixture {
    currency: String,

    #[serde(default)]
    country: Option<String>,

    #[serde(default)]
    shipping: Option<i64>,

    #[serde(default)]
    now: Option<Timestamp>,

    #[serde(default)]
    items: Vec<ItemFixture>,

    #[serde(default)]
    coupons: Vec<Coupon>,
}

#[derive(Debug, Deserialize)]
struct ItemFixture {
    id: PurchasableId,
    price: i64,

    #[serde(default = "one")]
    quantity: u32,

    #[serde(default)]
    primary: Option<PurchasableId>,

    #[serde(default)]
    name: Option<String>,

    #[serde(default = "deal_capable")]
    deals: bool,
}

fn one() -> u32 {
    1
}

fn deal_capable() -> bool {
    true
}

/// Noon UTC on 2024-06-01.
const DEFAULT_NOW: Timestamp = Timestamp::constant(1_717_243_200, 0);

/// A cart with the services deals consult, all owned in one place.
#[derive(Debug)]
pub struct Storefront {
    /// Cart
    pub cart: Cart,

    /// Active currency
    pub currency: ActiveCurrency,

    /// Active locale
    pub locale: StaticLocale,

    /// Shipping cost
    pub shipping: FlatShipping,

    /// Entered coupons
    pub coupons: CouponHolder,

    /// Frozen clock
    pub clock: FixedClock,
}

impl Storefront {
    /// Create an empty storefront trading in `currency`, with no known
    /// country, no shipping cost, and the clock frozen at noon UTC on
    /// 2024-06-01.
    pub fn new(currency: &'static Currency) -> Self {
        Self {
            cart: Cart::new(currency),
            currency: ActiveCurrency::new(currency),
            locale: StaticLocale::unknown(),
            shipping: FlatShipping::unavailable(),
            coupons: CouponHolder::new(),
            clock: FixedClock::new(DEFAULT_NOW),
        }
    }

    /// Parse a storefront from YAML.
    ///
    /// ```yaml
    /// currency: USD
    /// country: NZ
    /// shipping: 500
    /// items:
    ///   - { id: mug, price: 500, quantity: 2 }
    /// coupons:
    ///   - { code: MUGS, deal: mug-deal }
    /// ```
    ///
    /// Prices and shipping are in minor units of `currency`. Items load
    /// without raising cart events.
    ///
    /// # Errors
    ///
    /// Returns a `FixtureError` if the YAML is malformed, the currency is
    /// unknown, or a coupon code repeats.
    pub fn from_yaml(yaml: &str) -> Result<Self, FixtureError> {
        let fixture: StorefrontFixture = serde_norway::from_str(yaml)?;

        let currency = find_currency(&fixture.currency)
            .ok_or_else(|| FixtureError::UnknownCurrency(fixture.currency.clone()))?;

        let items = fixture.items.into_iter().map(|item| {
            let mut line = if item.deals {
                CartItem::new(item.id, Money::from_minor(item.price, currency))
            } else {
                CartItem::plain(item.id, Money::from_minor(item.price, currency))
            };

            if let Some(primary) = item.primary {
                line = line.with_primary_identifier(primary);
            }

            if let Some(name) = item.name {
                line = line.with_name(name);
            }

            (line, item.quantity)
        });

        let mut store = Self {
            cart: Cart::with_items(items, currency),
            ..Self::new(currency)
        };

        if let Some(country) = fixture.country {
            store.locale = StaticLocale::new(country);
        }

        if let Some(shipping) = fixture.shipping {
            store.shipping = FlatShipping::new(Money::from_minor(shipping, currency));
        }

        if let Some(now) = fixture.now {
            store.clock.set(now);
        }

        for coupon in fixture.coupons {
            store.coupons.add(coupon)?;
        }

        Ok(store)
    }

    /// Load a storefront from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns a `FixtureError` if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let contents = fs::read_to_string(path)?;

        Self::from_yaml(&contents)
    }

    /// Add `quantity` units of a line, raising the cart event, and refresh the
    /// cart total.
    pub fn add(&mut self, item: CartItem, quantity: u32) {
        self.cart.add_purchasable(Box::new(item), quantity);
        self.cart.update_total();
    }

    /// Record `quantity` units of a line as free under `deal`.
    pub fn give_free(&mut self, id: &str, deal: &str, quantity: u32) {
        if let Some(ledger) = self
            .cart
            .purchasable_mut(&PurchasableId::new(id))
            .and_then(Purchasable::ledger_mut)
        {
            ledger.set_free_quantity(&DealId::new(deal), quantity);
        }

        self.cart.update_total();
    }

    /// Record a discount of `minor` units of the cart currency on a line under
    /// `deal`.
    pub fn give_discount(&mut self, id: &str, deal: &str, minor: i64) {
        let amount = Money::from_minor(minor, self.cart.currency());

        if let Some(ledger) = self
            .cart
            .purchasable_mut(&PurchasableId::new(id))
            .and_then(Purchasable::ledger_mut)
        {
            ledger.set_discount(&DealId::new(deal), amount);
        }

        self.cart.update_total();
    }

    /// Borrow everything as a deal context.
    pub fn context(&mut self) -> DealContext<'_> {
        DealContext {
            cart: &mut self.cart,
            currency: &self.currency,
            locale: &self.locale,
            shipping: &self.shipping,
            coupons: &self.coupons,
            clock: &self.clock,
            pass: DealPass::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rusty_money::iso::NZD;
    use testresult::TestResult;

    use crate::services::{Clock, LocaleService, ShippingService};

    use super::*;

    const STOREFRONT: &str = r"
currency: nzd
country: NZ
shipping: 650
now: 2025-01-10T09:00:00Z
items:
  - { id: tee-m, primary: tee, name: Tee (M), price: 2500, quantity: 2 }
  - { id: gift-card, price: 5000, deals: false }
coupons:
  - { code: TEES, deal: tee-deal }
";

    #[test]
    fn loads_storefront_from_yaml() -> TestResult {
        let store = Storefront::from_yaml(STOREFRONT)?;

        assert_eq!(store.cart.total(), Money::from_minor(10_000, NZD));
        assert_eq!(store.cart.quantity_of(&PurchasableId::new("tee-m")), 2);
        assert_eq!(store.locale.country_code(), Some("NZ"));
        assert_eq!(store.shipping.shipping_total(), Some(Money::from_minor(650, NZD)));
        assert_eq!(store.clock.now(), "2025-01-10T09:00:00Z".parse::<Timestamp>()?);
        assert!(store.coupons.get("TEES").is_some());

        let gift_card = store.cart.purchasable(&PurchasableId::new("gift-card"));

        assert!(gift_card.is_some_and(|line| line.ledger().is_none()));

        Ok(())
    }

    #[test]
    fn loads_storefront_from_file() -> TestResult {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(STOREFRONT.as_bytes())?;

        let store = Storefront::from_path(file.path())?;

        assert_eq!(store.cart.len(), 2);

        Ok(())
    }

    #[test]
    fn unknown_currency_is_rejected() {
        assert!(matches!(
            Storefront::from_yaml("currency: XYZ"),
            Err(FixtureError::UnknownCurrency(code)) if code == "XYZ"
        ));
    }

    #[test]
    fn ledger_helpers_update_the_total() {
        let mut store = Storefront::new(NZD);
        store.add(CartItem::new("mug", Money::from_minor(500, NZD)), 3);

        store.give_free("mug", "deal", 1);
        store.give_discount("mug", "other", 100);

        assert_eq!(store.cart.total(), Money::from_minor(900, NZD));
        assert_eq!(store.cart.take_events().len(), 1);
    }
}
