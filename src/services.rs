//! Services
//!
//! Narrow interfaces to the storefront collaborators the engine consults while
//! evaluating deals, with simple in-memory implementations.

use std::fmt;

use jiff::Timestamp;
use rusty_money::{Money, iso::Currency};

use crate::events::Event;

/// Active currency lookup.
pub trait CurrencyService: fmt::Debug {
    /// The currency prices are currently shown in.
    fn active_currency(&self) -> &'static Currency;

    /// ISO code of the active currency.
    fn active_currency_code(&self) -> &'static str {
        self.active_currency().iso_alpha_code
    }

    /// Zero in the active currency.
    fn zero_money(&self) -> Money<'static, Currency> {
        Money::from_minor(0, self.active_currency())
    }
}

/// Active locale lookup.
pub trait LocaleService: fmt::Debug {
    /// ISO 3166 alpha-2 country code of the active locale, if known.
    fn country_code(&self) -> Option<&str>;
}

/// Shipping cost lookup.
pub trait ShippingService: fmt::Debug {
    /// Current shipping cost, if shipping can be calculated.
    fn shipping_total(&self) -> Option<Money<'static, Currency>>;
}

/// Source of the current time.
pub trait Clock: fmt::Debug {
    /// Current instant.
    fn now(&self) -> Timestamp;
}

/// Currency service with a switchable active currency.
#[derive(Debug, Clone, Copy)]
pub struct ActiveCurrency {
    currency: &'static Currency,
}

impl ActiveCurrency {
    /// Create with an initial active currency.
    pub fn new(currency: &'static Currency) -> Self {
        Self { currency }
    }

    /// Switch the active currency, returning the event to dispatch.
    pub fn set(&mut self, currency: &'static Currency) -> Event {
        self.currency = currency;

        Event::CurrencyChanged {
            currency: currency.iso_alpha_code,
        }
    }
}

impl CurrencyService for ActiveCurrency {
    fn active_currency(&self) -> &'static Currency {
        self.currency
    }
}

/// Locale with a fixed, switchable country.
#[derive(Debug, Clone, Default)]
pub struct StaticLocale {
    country: Option<String>,
}

impl StaticLocale {
    /// Create for a country code.
    pub fn new(country: impl Into<String>) -> Self {
        Self {
            country: Some(country.into()),
        }
    }

    /// Create with no known country.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Switch the country, returning the event to dispatch.
    pub fn set(&mut self, country: Option<String>) -> Event {
        self.country.clone_from(&country);

        Event::LocaleChanged { country }
    }
}

impl LocaleService for StaticLocale {
    fn country_code(&self) -> Option<&str> {
        self.country.as_deref()
    }
}

/// Shipping service returning a fixed cost.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatShipping {
    total: Option<Money<'static, Currency>>,
}

impl FlatShipping {
    /// Shipping with a fixed cost.
    pub fn new(total: Money<'static, Currency>) -> Self {
        Self { total: Some(total) }
    }

    /// Shipping that cannot be calculated yet.
    pub fn unavailable() -> Self {
        Self::default()
    }
}

impl ShippingService for FlatShipping {
    fn shipping_total(&self) -> Option<Money<'static, Currency>> {
        self.total
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Clock frozen at a given instant, for tests and previews.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: Timestamp,
}

impl FixedClock {
    /// Freeze time at `now`.
    pub fn new(now: Timestamp) -> Self {
        Self { now }
    }

    /// Move the frozen instant.
    pub fn set(&mut self, now: Timestamp) {
        self.now = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::{EUR, USD};
    use testresult::TestResult;

    use super::*;

    #[test]
    fn active_currency_switch_reports_event() {
        let mut currency = ActiveCurrency::new(USD);

        assert_eq!(currency.active_currency_code(), "USD");

        let event = currency.set(EUR);

        assert_eq!(currency.zero_money(), Money::from_minor(0, EUR));
        assert_eq!(event, Event::CurrencyChanged { currency: "EUR" });
    }

    #[test]
    fn locale_switch_reports_event() {
        let mut locale = StaticLocale::unknown();

        assert_eq!(locale.country_code(), None);

        let event = locale.set(Some("NZ".to_string()));

        assert_eq!(locale.country_code(), Some("NZ"));
        assert!(matches!(event, Event::LocaleChanged { country: Some(code) } if code == "NZ"));
    }

    #[test]
    fn fixed_clock_returns_frozen_instant() -> TestResult {
        let instant: Timestamp = "2024-06-01T12:00:00Z".parse()?;
        let mut clock = FixedClock::new(instant);

        assert_eq!(clock.now(), instant);

        let later: Timestamp = "2024-06-02T12:00:00Z".parse()?;
        clock.set(later);

        assert_eq!(clock.now(), later);

        Ok(())
    }

    #[test]
    fn flat_shipping_can_be_unavailable() {
        assert!(FlatShipping::unavailable().shipping_total().is_none());
        assert_eq!(
            FlatShipping::new(Money::from_minor(500, USD)).shipping_total(),
            Some(Money::from_minor(500, USD))
        );
    }
}
