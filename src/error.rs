//! Deal errors

use rusty_money::MoneyError;
use thiserror::Error;

use crate::{
    cart::CartError, config::ConfigError, coupons::CouponError, discounts::DiscountError,
    ids::{DealId, PurchasableId},
    state::StateError,
};

/// Errors raised while evaluating conditions and processing results.
#[derive(Debug, Error)]
pub enum DealError {
    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// Wrapped discount calculation error.
    #[error(transparent)]
    Discount(#[from] DiscountError),

    /// Wrapped cart mutation error.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Wrapped configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Wrapped coupon error.
    #[error(transparent)]
    Coupon(#[from] CouponError),

    /// Wrapped state persistence error.
    #[error(transparent)]
    State(#[from] StateError),

    /// No deal with this identifier is registered.
    #[error("deal {0} not found")]
    DealNotFound(DealId),

    /// The deal's result does not offer a choice of gifts.
    #[error("deal {0} does not offer a choice of gifts")]
    ChoiceUnsupported(DealId),

    /// The chosen gift is not one of the deal's options.
    #[error("{0} is not one of the available gifts")]
    UnknownGift(PurchasableId),
}
