//! Lattice Deals prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{Cart, CartError, CartItem, PurchasableHolder},
    conditions::{
        Condition, ConditionKind, Met,
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
    config::{
        Config, ConfigError, CurrencyAmounts,
        deals::{DealDefinition, DealsConfig},
    },
    context::{DealContext, DealPass, DealView},
    coupons::{Coupon, CouponError, CouponHolder},
    discounts::DiscountError,
    error::DealError,
    events::{Event, EventLog, EventSink, EventSwitch, NullSink},
    fixtures::Storefront,
    handler::{DealHandler, DealState, MessageKind},
    ids::{DealId, PurchasableId},
    purchasables::{DealLedger, Purchasable},
    receipt::{Receipt, ReceiptError},
    results::{
        DealResult, DiscountAmount, ResultKind,
        cart_discount::CartDiscountResult,
        cheapest::CheapestPurchasableDiscountResult,
        free_gift::{FreeGiftResult, Gift},
        gift_choice::GiftChoiceResult,
        purchasable_discount::PurchasableDiscountResult,
        shipping::{ShippingDiscount, ShippingResult},
    },
    services::{
        ActiveCurrency, Clock, CurrencyService, FixedClock, FlatShipping, LocaleService,
        ShippingService, StaticLocale, SystemClock,
    },
    state::{MemoryStateStore, StateError, StateStore},
    subscriber::{DealKey, DealsSubscriber},
};
