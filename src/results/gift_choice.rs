//! Gift Choice Result

use rusty_money::{Money, iso::Currency};
use tracing::debug;

use crate::{
    config::{Config, ConfigError},
    context::{DealContext, DealView},
    discounts::DiscountError,
    error::DealError,
    ids::{DealId, PurchasableId},
    results::{
        DealResult, ResultKind, ResultState,
        free_gift::{Gift, grant, revoke},
    },
};

/// Free units of one gift out of several, chosen by the customer.
///
/// Until the customer chooses, the first gift is granted. When the choice
/// changes, the previously granted gift is taken back before the new one is
/// granted.
#[derive(Debug, Clone)]
pub struct GiftChoiceResult {
    gifts: Vec<Gift>,
    quantity: u32,
    selected: Option<PurchasableId>,
    awarded: Option<PurchasableId>,
}

impl GiftChoiceResult {
    /// Create with the gifts on offer, one free unit per award.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if no gifts are offered.
    pub fn new(gifts: impl IntoIterator<Item = Gift>) -> Result<Self, ConfigError> {
        let gifts: Vec<Gift> = gifts.into_iter().collect();

        if gifts.is_empty() {
            return Err(ConfigError::Invalid {
                key: "gifts".to_string(),
                reason: "at least one gift is required".to_string(),
            });
        }

        Ok(Self {
            gifts,
            quantity: 1,
            selected: None,
            awarded: None,
        })
    }

    /// Set the free units per award.
    #[must_use]
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    /// Create from config keys: `gifts`, `quantity`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `gifts` is missing, empty or malformed.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(Gift::list_from_config(config, "gifts")?)?
            .with_quantity(config.get_opt("quantity")?.unwrap_or(1)))
    }

    /// Gifts on offer.
    pub fn gifts(&self) -> &[Gift] {
        &self.gifts
    }

    /// Gift that will be granted: the customer's choice, or the first on offer.
    pub fn current(&self) -> Option<&Gift> {
        self.selected
            .as_ref()
            .and_then(|selected| self.gifts.iter().find(|gift| gift.identifier() == selected))
            .or_else(|| self.gifts.first())
    }
}

impl DealResult for GiftChoiceResult {
    fn kind(&self) -> ResultKind {
        ResultKind::GiftChoice
    }

    fn process(
        &mut self,
        deal: &DealView<'_>,
        ctx: &mut DealContext<'_>,
    ) -> Result<Money<'static, Currency>, DealError> {
        let Some(gift) = self.current().cloned() else {
            return Ok(ctx.zero());
        };

        if let Some(previous) = self.awarded.take_if(|awarded| *awarded != *gift.identifier()) {
            debug!(deal = %deal.identifier, previous = %previous, next = %gift.identifier(), "gift choice changed");

            revoke(&previous, deal.identifier, ctx);
        }

        let units = deal
            .conditions_met_count
            .checked_mul(self.quantity)
            .ok_or(DiscountError::Overflow)?;

        let value = grant(&gift, deal.identifier, units, ctx)?;

        let granted = ctx
            .cart
            .purchasable(gift.identifier())
            .and_then(|line| line.ledger())
            .is_some_and(|ledger| ledger.free_quantity(deal.identifier) > 0);

        self.awarded = granted.then(|| gift.identifier().clone());

        Ok(value)
    }

    fn reset(&mut self, deal: &DealView<'_>, ctx: &mut DealContext<'_>) -> Result<(), DealError> {
        if let Some(previous) = self.awarded.take() {
            revoke(&previous, deal.identifier, ctx);
        }

        Ok(())
    }

    fn description(&self) -> String {
        let names: Vec<&str> = self.gifts.iter().map(Gift::name).collect();

        format!("Choose a free gift: {}", names.join(", "))
    }

    fn snapshot(&self) -> Option<ResultState> {
        Some(ResultState::GiftChoice {
            selected: self.selected.clone(),
            awarded: self.awarded.clone(),
        })
    }

    fn restore(&mut self, state: &ResultState) {
        let ResultState::GiftChoice { selected, awarded } = state;

        self.selected.clone_from(selected);
        self.awarded.clone_from(awarded);
    }

    fn choose(&mut self, _deal: &DealId, option: &PurchasableId) -> Result<(), DealError> {
        if !self.gifts.iter().any(|gift| gift.identifier() == option) {
            return Err(DealError::UnknownGift(option.clone()));
        }

        self.selected = Some(option.clone());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::USD;
    use testresult::TestResult;

    use crate::{cart::PurchasableHolder, config::CurrencyAmounts, fixtures::Storefront};

    use super::*;

    fn result() -> Result<GiftChoiceResult, ConfigError> {
        GiftChoiceResult::new([
            Gift::new("sticker", CurrencyAmounts::new([(USD, 200)])),
            Gift::new("badge", CurrencyAmounts::new([(USD, 300)])),
        ])
    }

    #[test]
    fn grants_first_gift_by_default() -> TestResult {
        let deal = DealId::new("choice");
        let mut store = Storefront::new(USD);
        let mut result = result()?;

        let value = result.process(&DealView::new(&deal, 1), &mut store.context())?;

        assert_eq!(value, Money::from_minor(200, USD));
        assert_eq!(store.cart.quantity_of(&PurchasableId::new("sticker")), 1);

        Ok(())
    }

    #[test]
    fn changing_choice_swaps_the_gift() -> TestResult {
        let deal = DealId::new("choice");
        let mut store = Storefront::new(USD);
        let mut result = result()?;
        let view = DealView::new(&deal, 1);

        result.process(&view, &mut store.context())?;
        result.choose(&deal, &PurchasableId::new("badge"))?;
        let value = result.process(&view, &mut store.context())?;

        assert_eq!(value, Money::from_minor(300, USD));
        assert!(store.cart.purchasable(&PurchasableId::new("sticker")).is_none());
        assert_eq!(store.cart.quantity_of(&PurchasableId::new("badge")), 1);

        Ok(())
    }

    #[test]
    fn choosing_an_unknown_gift_fails() -> TestResult {
        let deal = DealId::new("choice");
        let mut result = result()?;

        assert!(matches!(
            result.choose(&deal, &PurchasableId::new("yacht")),
            Err(DealError::UnknownGift(id)) if id.as_str() == "yacht"
        ));

        Ok(())
    }

    #[test]
    fn selection_survives_snapshot_and_restore() -> TestResult {
        let deal = DealId::new("choice");
        let mut chosen = result()?;
        chosen.choose(&deal, &PurchasableId::new("badge"))?;

        let mut restored = result()?;

        if let Some(state) = chosen.snapshot() {
            restored.restore(&state);
        }

        assert_eq!(
            restored.current().map(Gift::identifier),
            Some(&PurchasableId::new("badge"))
        );

        Ok(())
    }

    #[test]
    fn reset_takes_back_the_awarded_gift() -> TestResult {
        let deal = DealId::new("choice");
        let mut store = Storefront::new(USD);
        let mut result = result()?;

        result.process(&DealView::new(&deal, 1), &mut store.context())?;
        result.reset(&DealView::new(&deal, 0), &mut store.context())?;

        assert!(store.cart.is_empty());

        Ok(())
    }

    #[test]
    fn zero_priced_gift_is_still_taken_back() -> TestResult {
        let deal = DealId::new("choice");
        let mut store = Storefront::new(USD);
        let mut result = GiftChoiceResult::new([Gift::new("pin", CurrencyAmounts::new([(USD, 0)]))])?;

        let value = result.process(&DealView::new(&deal, 1), &mut store.context())?;

        assert!(value.is_zero());
        assert_eq!(store.cart.quantity_of(&PurchasableId::new("pin")), 1);

        result.reset(&DealView::new(&deal, 0), &mut store.context())?;

        assert!(store.cart.is_empty());

        Ok(())
    }

    #[test]
    fn empty_gift_list_is_rejected() -> TestResult {
        let config = Config::from_yaml("gifts: []")?;

        assert!(matches!(
            GiftChoiceResult::from_config(&config),
            Err(ConfigError::Invalid { key, .. }) if key == "gifts"
        ));

        Ok(())
    }
}
