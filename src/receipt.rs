//! Receipt
//!
//! A printable breakdown of a cart after deals: what each line was charged,
//! which deals touched it, and what each deal was worth.

use std::io;

use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use rusty_money::{Money, MoneyError, iso::Currency};
use smallvec::SmallVec;
use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    cart::PurchasableHolder,
    discounts::{DiscountError, line_minor, percent_points},
    handler::DealHandler,
    ids::{DealId, PurchasableId},
    purchasables::Purchasable,
    subscriber::DealsSubscriber,
};

/// Errors that can occur when building or printing a receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// Wrapper for money errors.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// Line arithmetic overflowed.
    #[error(transparent)]
    Discount(#[from] DiscountError),

    /// IO error
    #[error("failed to write receipt: {0}")]
    Io(#[from] io::Error),
}

/// One cart line on the receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptLine {
    /// Purchasable
    pub identifier: PurchasableId,

    /// Display name
    pub name: String,

    /// Units in the cart
    pub quantity: u32,

    /// Units made free by deals
    pub free_quantity: u32,

    /// Price of one unit
    pub unit_price: Money<'static, Currency>,

    /// Discounts recorded against the line by deals
    pub discount: Money<'static, Currency>,

    /// What the line costs after deals
    pub total: Money<'static, Currency>,

    /// Deals that wrote to the line's ledger
    pub deals: SmallVec<[DealId; 2]>,
}

/// One deal on the receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptDeal {
    /// Deal
    pub identifier: DealId,

    /// What the deal gives
    pub description: String,

    /// What the deal was worth at the last recompute
    pub total: Money<'static, Currency>,
}

/// Breakdown of a cart after deals.
#[derive(Debug, Clone)]
pub struct Receipt {
    lines: Vec<ReceiptLine>,
    deals: Vec<ReceiptDeal>,
    subtotal: Money<'static, Currency>,
    total: Money<'static, Currency>,
}

impl Receipt {
    /// Build a receipt for a cart and the deals applied to it.
    ///
    /// Deals whose last total is in another currency than the cart are left
    /// off.
    ///
    /// # Errors
    ///
    /// Returns a [`ReceiptError`] if a line total overflows.
    pub fn new(cart: &dyn PurchasableHolder, deals: &DealsSubscriber) -> Result<Self, ReceiptError> {
        let currency = cart.currency();
        let mut lines = Vec::new();
        let mut subtotal = 0_i64;

        for purchasable in cart.purchasables() {
            let unit_price = purchasable.unit_price();
            let full = line_minor(unit_price.to_minor_units(), purchasable.quantity())?;

            subtotal = subtotal.checked_add(full).ok_or(DiscountError::Overflow)?;

            lines.push(receipt_line(purchasable, deals, currency, full)?);
        }

        let deals = deals
            .deals()
            .filter_map(|handler| receipt_deal(handler, currency))
            .collect();

        Ok(Self {
            lines,
            deals,
            subtotal: Money::from_minor(subtotal, currency),
            total: cart.total(),
        })
    }

    /// Lines in cart order.
    pub fn lines(&self) -> &[ReceiptLine] {
        &self.lines
    }

    /// Deals in recompute order.
    pub fn deals(&self) -> &[ReceiptDeal] {
        &self.deals
    }

    /// Total before deals.
    pub fn subtotal(&self) -> Money<'static, Currency> {
        self.subtotal
    }

    /// Total after deals.
    pub fn total(&self) -> Money<'static, Currency> {
        self.total
    }

    /// Savings made by deals.
    ///
    /// # Errors
    ///
    /// Returns a [`MoneyError`] if the subtraction operation fails.
    pub fn savings(&self) -> Result<Money<'static, Currency>, MoneyError> {
        self.subtotal.sub(self.total)
    }

    /// Savings as a share of the subtotal.
    ///
    /// # Errors
    ///
    /// Returns a [`MoneyError`] if the subtraction operation fails.
    pub fn savings_percent(&self) -> Result<Percentage, MoneyError> {
        let savings = self.savings()?.to_minor_units();
        let subtotal = self.subtotal.to_minor_units();

        if subtotal == 0 {
            return Ok(Percentage::from(0.0));
        }

        Ok(Percentage::from(Decimal::from(savings) / Decimal::from(subtotal)))
    }

    /// Print the receipt.
    ///
    /// # Errors
    ///
    /// Returns a [`ReceiptError`] if writing fails.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReceiptError> {
        let mut items = Builder::default();

        items.push_record(["Item", "Qty", "Free", "Unit Price", "Discount", "Total", "Deals"]);

        for line in &self.lines {
            let deals: Vec<&str> = line.deals.iter().map(DealId::as_str).collect();

            items.push_record([
                line.name.clone(),
                line.quantity.to_string(),
                line.free_quantity.to_string(),
                line.unit_price.to_string(),
                line.discount.to_string(),
                line.total.to_string(),
                deals.join(", "),
            ]);
        }

        write_table(&mut out, items, Columns::new(1..6))?;

        if !self.deals.is_empty() {
            let mut deals = Builder::default();

            deals.push_record(["Deal", "Description", "Value"]);

            for deal in &self.deals {
                deals.push_record([
                    deal.identifier.to_string(),
                    deal.description.clone(),
                    deal.total.to_string(),
                ]);
            }

            write_table(&mut out, deals, Columns::new(2..3))?;
        }

        let savings = self.savings()?;
        let savings_percent = percent_points(self.savings_percent()?);

        writeln!(out, " Subtotal: {}", self.subtotal)?;
        writeln!(out, " \x1b[1mTotal: {}\x1b[0m", self.total)?;
        writeln!(out, " Savings: ({savings_percent:.2}%) {savings}")?;

        Ok(())
    }
}

fn receipt_line(
    purchasable: &dyn Purchasable,
    deals: &DealsSubscriber,
    currency: &'static Currency,
    full: i64,
) -> Result<ReceiptLine, ReceiptError> {
    let unit_minor = purchasable.unit_price().to_minor_units();

    let (free_quantity, discount, touched) = match purchasable.ledger() {
        Some(ledger) => {
            let touched = deals
                .deals()
                .map(DealHandler::identifier)
                .filter(|deal| {
                    ledger.free_quantity(deal) > 0
                        || ledger.discount(deal).is_some_and(|discount| !discount.is_zero())
                })
                .cloned()
                .collect();

            (
                ledger.total_free_quantity().min(purchasable.quantity()),
                ledger.total_discount_minor(currency),
                touched,
            )
        }
        None => (0, 0, SmallVec::new()),
    };

    let total = full
        .checked_sub(line_minor(unit_minor, free_quantity)?)
        .ok_or(DiscountError::Overflow)?
        .saturating_sub(discount)
        .max(0);

    Ok(ReceiptLine {
        identifier: purchasable.identifier().clone(),
        name: purchasable.name().to_string(),
        quantity: purchasable.quantity(),
        free_quantity,
        unit_price: purchasable.unit_price(),
        discount: Money::from_minor(discount, currency),
        total: Money::from_minor(total, currency),
        deals: touched,
    })
}

fn receipt_deal(handler: &DealHandler, currency: &'static Currency) -> Option<ReceiptDeal> {
    let total = handler
        .total()
        .unwrap_or_else(|| Money::from_minor(0, currency));

    (total.currency() == currency).then(|| ReceiptDeal {
        identifier: handler.identifier().clone(),
        description: handler.description(),
        total,
    })
}

fn write_table(
    out: &mut impl io::Write,
    builder: Builder,
    numeric: Columns<std::ops::Range<usize>>,
) -> Result<(), ReceiptError> {
    let mut table = builder.build();
    let mut theme = Theme::from(Style::modern_rounded());

    theme.remove_horizontal_lines();
    theme.insert_horizontal_line(1, HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤')));

    table.with(theme);
    table.modify(Rows::first(), Color::BOLD);
    table.modify(numeric, Alignment::right());

    writeln!(out, "\n{table}")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::USD;
    use testresult::TestResult;

    use crate::{
        cart::CartItem,
        fixtures::Storefront,
        handler::DealHandler,
        results::{
            DiscountAmount, cart_discount::CartDiscountResult,
            cheapest::CheapestPurchasableDiscountResult,
        },
        state::MemoryStateStore,
    };

    use super::*;

    fn applied() -> TestResult<(Storefront, DealsSubscriber)> {
        let mut store = Storefront::new(USD);
        store.add(CartItem::new("mug", Money::from_minor(500, USD)).with_name("Mug"), 2);
        store.add(CartItem::new("coat", Money::from_minor(9_000, USD)).with_name("Coat"), 1);

        let mut deals = DealsSubscriber::new(MemoryStateStore::new());
        deals.register(
            DealHandler::builder("cheapest-free")
                .priority(10)
                .result(CheapestPurchasableDiscountResult::new([PurchasableId::new("mug")]))
                .build()?,
        )?;
        deals.register(
            DealHandler::builder("ten-off")
                .result(CartDiscountResult::new(DiscountAmount::percentage(10.0)?))
                .build()?,
        )?;

        deals.process_pending(&mut store.context())?;

        Ok((store, deals))
    }

    #[test]
    fn lines_show_free_units_and_discounts() -> TestResult {
        let (store, deals) = applied()?;
        let receipt = Receipt::new(&store.cart, &deals)?;

        let mug = receipt.lines().first().ok_or("missing mug line")?;

        assert_eq!(mug.free_quantity, 1);
        assert_eq!(mug.discount, Money::from_minor(50, USD));
        assert_eq!(mug.total, Money::from_minor(450, USD));
        assert_eq!(
            mug.deals.as_slice(),
            &[DealId::new("cheapest-free"), DealId::new("ten-off")]
        );

        assert_eq!(receipt.subtotal(), Money::from_minor(10_000, USD));
        assert_eq!(receipt.total(), Money::from_minor(8_550, USD));
        assert_eq!(receipt.savings()?, Money::from_minor(1_450, USD));
        assert_eq!(receipt.deals().len(), 2);

        Ok(())
    }

    #[test]
    fn write_to_renders_lines_deals_and_summary() -> TestResult {
        let (store, deals) = applied()?;
        let receipt = Receipt::new(&store.cart, &deals)?;

        let mut out = Vec::new();
        receipt.write_to(&mut out)?;

        let output = String::from_utf8(out)?;

        assert!(output.contains("Mug"));
        assert!(output.contains("Coat"));
        assert!(output.contains("cheapest-free"));
        assert!(output.contains("Cheapest item free"));
        assert!(output.contains("Subtotal:"));
        assert!(output.contains("(14.50%)"));

        Ok(())
    }

    #[test]
    fn empty_cart_has_zero_savings() -> TestResult {
        let store = Storefront::new(USD);
        let deals = DealsSubscriber::new(MemoryStateStore::new());
        let receipt = Receipt::new(&store.cart, &deals)?;

        assert!(receipt.lines().is_empty());
        assert_eq!(percent_points(receipt.savings_percent()?), Decimal::ZERO);

        Ok(())
    }
}
