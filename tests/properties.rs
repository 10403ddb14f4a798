//! Behaviour every deal configuration relies on, exercised through the public
//! API only.

use rusty_money::{
    Money,
    iso::{GBP, USD},
};
use testresult::TestResult;

use lattice_deals::prelude::*;

fn recompute(handler: &mut DealHandler, store: &mut Storefront) -> TestResult<i64> {
    let total = handler.recompute(&mut store.context(), &mut NullSink)?;
    store.cart.update_total();

    Ok(total.to_minor_units())
}

#[test]
fn missing_required_keys_fail_construction() {
    let empty = Config::new();

    assert!(matches!(
        AmountCondition::from_config(&empty),
        Err(ConfigError::Missing(key)) if key == "amounts"
    ));
    assert!(matches!(
        QuantityOfPurchasablesInCartCondition::from_config(
            &Config::new().with("purchasables", vec!["mug"])
        ),
        Err(ConfigError::Missing(key)) if key == "quantity"
    ));
    assert!(matches!(
        CartDiscountResult::from_config(&empty),
        Err(ConfigError::Missing(_))
    ));
}

#[test]
fn quantity_condition_counts_whole_multiples() -> TestResult {
    let mut store = Storefront::new(USD);
    store.add(CartItem::new("mug", Money::from_minor(500, USD)), 7);

    let condition = QuantityOfPurchasablesInCartCondition::new([PurchasableId::new("mug")], 3)?;
    let ctx = store.context();

    assert_eq!(condition.met(&ctx)?, Met::Count(2));
    assert_eq!(condition.met(&ctx)?, Met::Count(2));

    store.cart.set_purchasable(&PurchasableId::new("mug"), 2)?;

    assert_eq!(condition.met(&store.context())?, Met::Count(0));

    Ok(())
}

#[test]
fn almost_met_leaves_the_cart_untouched() -> TestResult {
    let mut store = Storefront::new(USD);
    store.add(CartItem::new("mug", Money::from_minor(500, USD)), 2);
    store.add(CartItem::plain("gift-card", Money::from_minor(2_000, USD)), 1);
    store.cart.take_events();

    let condition = QuantityOfPurchasablesInCartCondition::new([PurchasableId::new("mug")], 3)?;

    assert!(condition.almost_met(&mut store.context())?);
    assert_eq!(store.cart.quantity_of(&PurchasableId::new("mug")), 2);
    assert_eq!(store.cart.quantity_of(&PurchasableId::new("gift-card")), 1);
    assert!(store.cart.take_events().is_empty());
    assert!(store.cart.events().is_enabled());

    Ok(())
}

#[test]
fn cart_discount_excludes_other_deals() -> TestResult {
    let mut store = Storefront::new(USD);
    store.add(CartItem::new("coat", Money::from_minor(10_000, USD)), 1);

    let mut ten_off = DealHandler::builder("ten-off")
        .result(CartDiscountResult::new(DiscountAmount::percentage(10.0)?))
        .build()?;

    assert_eq!(recompute(&mut ten_off, &mut store)?, 1_000);

    store.give_discount("coat", "five-off", 500);

    assert_eq!(recompute(&mut ten_off, &mut store)?, 950);
    assert_eq!(store.cart.total(), Money::from_minor(8_550, USD));

    Ok(())
}

#[test]
fn conditions_met_count_is_the_largest_count() -> TestResult {
    let mut store = Storefront::new(USD);
    store.add(CartItem::new("mug", Money::from_minor(500, USD)), 9);

    let handler = DealHandler::builder("mugs")
        .condition(QuantityOfPurchasablesInCartCondition::new(
            [PurchasableId::new("mug")],
            3,
        )?)
        .condition(PurchasableCondition::new(PurchasableId::new("mug")))
        .result(CheapestPurchasableDiscountResult::new([PurchasableId::new("mug")]))
        .build()?;

    assert_eq!(handler.conditions_met(&mut store.context())?, 3);

    Ok(())
}

#[test]
fn free_gift_is_withdrawn_when_conditions_stop_holding() -> TestResult {
    let mut store = Storefront::new(USD);
    store.add(CartItem::new("mug", Money::from_minor(500, USD)), 4);

    let mut gift = DealHandler::builder("gift")
        .condition(QuantityOfPurchasablesInCartCondition::new(
            [PurchasableId::new("mug")],
            2,
        )?)
        .result(FreeGiftResult::new(Gift::new(
            "sticker",
            CurrencyAmounts::new([(USD, 200)]),
        )))
        .build()?;

    assert_eq!(recompute(&mut gift, &mut store)?, 400);

    let sticker = store
        .cart
        .purchasable(&PurchasableId::new("sticker"))
        .and_then(Purchasable::ledger)
        .map(|ledger| ledger.free_quantity(&DealId::new("gift")));

    assert_eq!(sticker, Some(2));
    assert_eq!(store.cart.total(), Money::from_minor(2_000, USD));

    store.cart.set_purchasable(&PurchasableId::new("mug"), 1)?;

    assert_eq!(recompute(&mut gift, &mut store)?, 0);
    assert!(store.cart.purchasable(&PurchasableId::new("sticker")).is_none());

    Ok(())
}

#[test]
fn amount_threshold_is_per_currency() -> TestResult {
    let mut store = Storefront::new(USD);
    store.add(CartItem::new("coat", Money::from_minor(500, USD)), 1);

    let condition = AmountCondition::new(CurrencyAmounts::new([(USD, 400)]));

    assert!(condition.met(&store.context())?.is_met());

    store.currency.set(GBP);

    assert!(!condition.met(&store.context())?.is_met());

    Ok(())
}
