//! Lattice Deals
//!
//! A promotional deals engine for e-commerce carts. A deal bundles conditions
//! over the cart, its currency, locale, coupons and the clock with one result:
//! a discount or a cart mutation applied while the conditions hold. Deals are
//! recomputed in priority order whenever the cart changes, and record what
//! they did in per-deal ledgers on each cart line.

pub mod cart;
pub mod conditions;
pub mod config;
pub mod context;
pub mod coupons;
pub mod discounts;
pub mod error;
pub mod events;
pub mod fixtures;
pub mod handler;
pub mod ids;
pub mod prelude;
pub mod purchasables;
pub mod receipt;
pub mod results;
pub mod services;
pub mod state;
pub mod subscriber;
