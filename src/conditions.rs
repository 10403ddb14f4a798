//! Conditions
//!
//! Predicates over the cart, coupons, clock and locale that decide whether a
//! deal applies, and how many times.

use std::{fmt, str::FromStr};

use rusty_money::iso::Currency;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use crate::{
    conditions::{
        amount::AmountCondition,
        coupon::HasCouponCondition,
        items::ItemsCondition,
        purchasable::{
            PurchasableCondition, PurchasableHasQuantityInCartCondition,
            QuantityOfPurchasablesInCartCondition,
        },
        time::{EndDateCondition, StartDateCondition, TimeCondition},
        zone::HasZoneCondition,
    },
    config::{Config, ConfigError},
    context::DealContext,
    discounts::DiscountError,
    error::DealError,
    ids::{DealId, PurchasableId},
    purchasables::countable_minor,
};

pub mod amount;
pub mod coupon;
pub mod items;
pub mod purchasable;
pub mod time;
pub mod zone;

/// Outcome of evaluating a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Met {
    /// Plain yes/no.
    Bool(bool),

    /// Met this many times. Zero is not met.
    Count(u32),
}

impl Met {
    /// Return whether the condition holds.
    pub fn is_met(self) -> bool {
        self.count() > 0
    }

    /// Number of times the condition holds; `Bool(true)` counts once.
    pub fn count(self) -> u32 {
        match self {
            Met::Bool(met) => u32::from(met),
            Met::Count(count) => count,
        }
    }

    /// Return whether `self` is a step up from `before` in the lookahead sense:
    /// a count that grew, or a condition that went from unmet to met.
    pub fn improves_on(self, before: Met) -> bool {
        match (before, self) {
            (Met::Count(before), Met::Count(after)) => after > before,
            _ => !before.is_met() && self.is_met(),
        }
    }
}

/// Condition type tags, as used in deal configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    /// Cart subtotal threshold
    Amount,

    /// Item count threshold
    Items,

    /// Specific purchasable present
    Purchasable,

    /// Any listed purchasable has a minimum quantity
    PurchasableHasQuantityInCart,

    /// Repeat count of listed purchasables
    QuantityOfPurchasablesInCart,

    /// Not before a given instant
    StartDate,

    /// Before a given instant
    EndDate,

    /// Within a time window
    Time,

    /// Locale in an allow-list of countries
    HasZone,

    /// Valid coupon for the deal entered
    HasCoupon,
}

impl ConditionKind {
    /// Every condition type.
    pub const ALL: [ConditionKind; 10] = [
        ConditionKind::Amount,
        ConditionKind::Items,
        ConditionKind::Purchasable,
        ConditionKind::PurchasableHasQuantityInCart,
        ConditionKind::QuantityOfPurchasablesInCart,
        ConditionKind::StartDate,
        ConditionKind::EndDate,
        ConditionKind::Time,
        ConditionKind::HasZone,
        ConditionKind::HasCoupon,
    ];

    /// Configuration tag for this type.
    pub fn as_str(self) -> &'static str {
        match self {
            ConditionKind::Amount => "amount",
            ConditionKind::Items => "items",
            ConditionKind::Purchasable => "purchasable",
            ConditionKind::PurchasableHasQuantityInCart => "purchasable_has_quantity_in_cart",
            ConditionKind::QuantityOfPurchasablesInCart => "quantity_of_purchasables_in_cart",
            ConditionKind::StartDate => "start_date",
            ConditionKind::EndDate => "end_date",
            ConditionKind::Time => "time",
            ConditionKind::HasZone => "has_zone",
            ConditionKind::HasCoupon => "has_coupon",
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConditionKind {
    type Err = ConfigError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        ConditionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == tag)
            .ok_or_else(|| ConfigError::UnknownCondition(tag.to_string()))
    }
}

/// A deal condition.
pub trait Condition: fmt::Debug {
    /// Type tag of this condition.
    fn kind(&self) -> ConditionKind;

    /// Evaluate the condition against the current context.
    ///
    /// # Errors
    ///
    /// Returns a `DealError` if evaluation arithmetic fails.
    fn met(&self, ctx: &DealContext<'_>) -> Result<Met, DealError>;

    /// Return whether a single extra unit of some purchasable would meet the
    /// condition, or raise its count.
    ///
    /// # Errors
    ///
    /// Returns a `DealError` if evaluation fails. The cart is rolled back
    /// regardless.
    fn almost_met(&self, ctx: &mut DealContext<'_>) -> Result<bool, DealError> {
        lookahead(self, ctx)
    }

    /// Human-readable description.
    fn description(&self) -> String;
}

/// Try one extra unit of each deal-capable purchasable in turn and report
/// whether any of them would improve on the current outcome.
///
/// Cart events are suppressed for the duration and every quantity is restored
/// before the next candidate is tried, even when evaluation fails.
///
/// # Errors
///
/// Returns the first error raised by `condition`.
pub fn lookahead<C: Condition + ?Sized>(
    condition: &C,
    ctx: &mut DealContext<'_>,
) -> Result<bool, DealError> {
    let current = condition.met(ctx)?;

    if current == Met::Bool(true) {
        return Ok(false);
    }

    let candidates: SmallVec<[PurchasableId; 8]> = ctx
        .cart
        .purchasables()
        .into_iter()
        .filter(|purchasable| purchasable.ledger().is_some())
        .map(|purchasable| purchasable.identifier().clone())
        .collect();

    let _quiet = ctx.cart.events().suppress();

    for id in candidates {
        let Some(purchasable) = ctx.cart.purchasable_mut(&id) else {
            continue;
        };

        let original = purchasable.quantity();
        purchasable.set_quantity(original.saturating_add(1));

        let outcome = condition.met(ctx);

        if let Some(purchasable) = ctx.cart.purchasable_mut(&id) {
            purchasable.set_quantity(original);
        }

        if outcome?.improves_on(current) {
            debug!(kind = %condition.kind(), purchasable = %id, "one more unit would improve condition");

            return Ok(true);
        }
    }

    Ok(false)
}

/// Build a condition from its configuration tag and flat config.
///
/// # Errors
///
/// Returns `ConfigError::UnknownCondition` for an unrecognised tag, or any
/// error raised validating the condition's configuration.
pub fn build_condition(
    kind: &str,
    config: &Config,
    deal: &DealId,
) -> Result<Box<dyn Condition>, ConfigError> {
    let condition: Box<dyn Condition> = match kind.parse()? {
        ConditionKind::Amount => Box::new(AmountCondition::from_config(config)?),
        ConditionKind::Items => Box::new(ItemsCondition::from_config(config)?),
        ConditionKind::Purchasable => Box::new(PurchasableCondition::from_config(config)?),
        ConditionKind::PurchasableHasQuantityInCart => {
            Box::new(PurchasableHasQuantityInCartCondition::from_config(config)?)
        }
        ConditionKind::QuantityOfPurchasablesInCart => {
            Box::new(QuantityOfPurchasablesInCartCondition::from_config(config)?)
        }
        ConditionKind::StartDate => Box::new(StartDateCondition::from_config(config)?),
        ConditionKind::EndDate => Box::new(EndDateCondition::from_config(config)?),
        ConditionKind::Time => Box::new(TimeCondition::from_config(config)?),
        ConditionKind::HasZone => Box::new(HasZoneCondition::from_config(config)?),
        ConditionKind::HasCoupon => Box::new(HasCouponCondition::new(deal.clone())),
    };

    Ok(condition)
}

/// Subtotal of the countable units priced in `currency`, in minor units.
pub(crate) fn countable_subtotal_minor(
    ctx: &DealContext<'_>,
    currency: &'static Currency,
) -> Result<i64, DiscountError> {
    ctx.cart
        .purchasables()
        .into_iter()
        .filter(|purchasable| purchasable.unit_price().currency() == currency)
        .try_fold(0_i64, |acc, purchasable| {
            acc.checked_add(countable_minor(purchasable, &ctx.pass)?)
                .ok_or(DiscountError::Overflow)
        })
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn met_counts_true_as_one() {
        assert_eq!(Met::Bool(true).count(), 1);
        assert_eq!(Met::Bool(false).count(), 0);
        assert_eq!(Met::Count(3).count(), 3);
        assert!(!Met::Count(0).is_met());
    }

    #[test]
    fn improves_on_compares_counts_and_flips() {
        assert!(Met::Count(2).improves_on(Met::Count(1)));
        assert!(!Met::Count(1).improves_on(Met::Count(1)));
        assert!(Met::Bool(true).improves_on(Met::Bool(false)));
        assert!(!Met::Bool(false).improves_on(Met::Bool(false)));
        assert!(Met::Count(1).improves_on(Met::Bool(false)));
    }

    #[test]
    fn kinds_round_trip_through_tags() -> TestResult {
        for kind in ConditionKind::ALL {
            assert_eq!(kind.as_str().parse::<ConditionKind>()?, kind);
        }

        Ok(())
    }

    #[test]
    fn unknown_tag_is_a_config_error() {
        let deal = DealId::new("deal");

        assert!(matches!(
            build_condition("moon_phase", &Config::new(), &deal),
            Err(ConfigError::UnknownCondition(tag)) if tag == "moon_phase"
        ));
    }

    #[test]
    fn registry_builds_each_kind() -> TestResult {
        let deal = DealId::new("deal");
        let configs = [
            ("amount", Config::from_yaml("amounts: { USD: 400 }")?),
            ("items", Config::from_yaml("items: 2")?),
            ("purchasable", Config::from_yaml("purchasable: mug")?),
            (
                "purchasable_has_quantity_in_cart",
                Config::from_yaml("{ purchasables: [mug], quantity: 2 }")?,
            ),
            (
                "quantity_of_purchasables_in_cart",
                Config::from_yaml("{ purchasables: [mug], quantity: 3 }")?,
            ),
            ("start_date", Config::from_yaml("start: 2024-01-01T00:00:00Z")?),
            ("end_date", Config::from_yaml("end: 2024-12-31T00:00:00Z")?),
            ("time", Config::from_yaml("start: 2024-01-01T00:00:00Z")?),
            ("has_zone", Config::from_yaml("countries: [NZ, AU]")?),
            ("has_coupon", Config::new()),
        ];

        for (tag, config) in configs {
            let condition = build_condition(tag, &config, &deal)?;

            assert_eq!(condition.kind().as_str(), tag);
        }

        Ok(())
    }
}
