//! Integration test for a gift-choice deal whose selection survives a restart.

use std::path::PathBuf;

use rusty_money::{Money, iso::USD};
use testresult::TestResult;

use lattice_deals::prelude::*;

fn config() -> TestResult<DealsConfig> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/deals/gift_choice.yml");

    Ok(DealsConfig::from_path(path)?)
}

fn storefront() -> Storefront {
    let mut store = Storefront::new(USD);

    store.add(CartItem::new("tee", Money::from_minor(2_500, USD)), 1);
    store.add(CartItem::new("cap", Money::from_minor(1_800, USD)), 1);

    store
}

#[test]
fn selection_is_restored_from_the_state_store() -> TestResult {
    let config = config()?;
    let mut store = storefront();
    let deal = DealId::new("pick-a-gift");

    let mut deals = DealsSubscriber::from_config(&config, MemoryStateStore::new())?;
    deals.process_pending(&mut store.context())?;

    assert_eq!(store.cart.quantity_of(&PurchasableId::new("sticker")), 1);

    deals.choose_gift(&deal, &PurchasableId::new("badge"), &mut store.context())?;

    // Restart: same cart, same store, fresh handlers.
    let mut restored = DealsSubscriber::from_config(&config, deals.into_store())?;

    assert_eq!(
        restored.deal(&deal).and_then(DealHandler::total),
        Some(Money::from_minor(300, USD))
    );

    restored.recompute(&mut store.context())?;

    assert_eq!(store.cart.quantity_of(&PurchasableId::new("badge")), 1);
    assert!(store.cart.purchasable(&PurchasableId::new("sticker")).is_none());
    assert_eq!(store.cart.total(), Money::from_minor(4_300, USD));

    Ok(())
}

#[test]
fn gift_without_a_price_in_the_active_currency_is_not_granted() -> TestResult {
    let mut store = storefront();
    let deal = DealId::new("pick-a-gift");
    let mut deals = DealsSubscriber::from_config(&config()?, MemoryStateStore::new())?;

    deals.process_pending(&mut store.context())?;
    deals.choose_gift(&deal, &PurchasableId::new("poster"), &mut store.context())?;

    assert!(store.cart.purchasable(&PurchasableId::new("sticker")).is_none());
    assert!(store.cart.purchasable(&PurchasableId::new("poster")).is_none());
    assert_eq!(deals.total_discount(USD)?, Money::from_minor(0, USD));

    Ok(())
}

#[test]
fn unknown_gifts_and_deals_are_rejected() -> TestResult {
    let mut store = storefront();
    let mut deals = DealsSubscriber::from_config(&config()?, MemoryStateStore::new())?;

    let unknown_gift = deals.choose_gift(
        &DealId::new("pick-a-gift"),
        &PurchasableId::new("yacht"),
        &mut store.context(),
    );

    assert!(matches!(unknown_gift, Err(DealError::UnknownGift(gift)) if gift.as_str() == "yacht"));

    let unknown_deal = deals.choose_gift(
        &DealId::new("nope"),
        &PurchasableId::new("badge"),
        &mut store.context(),
    );

    assert!(matches!(unknown_deal, Err(DealError::DealNotFound(deal)) if deal.as_str() == "nope"));

    Ok(())
}
