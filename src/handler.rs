//! Deal Handler
//!
//! One configured deal: its conditions, its result, and the total it was last
//! worth.

use std::fmt;

use rustc_hash::FxHashMap;
use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    conditions::Condition,
    config::{ConfigError, find_currency},
    context::{DealContext, DealView},
    error::DealError,
    events::{Event, EventSink},
    ids::{DealId, PurchasableId},
    results::{DealResult, ResultState},
};

/// Which promotional message applies to a deal right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Conditions hold.
    Met,

    /// One more unit of something would make the conditions hold.
    AlmostMet,

    /// Conditions do not hold.
    NotMet,
}

/// Persisted bookkeeping for a deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealState {
    /// Last computed total, in minor units.
    pub total: i64,

    /// Currency of `total`.
    pub currency: String,

    /// Conditions-met-count at the last recompute.
    pub conditions_met_count: u32,

    /// Result bookkeeping, if the result keeps any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultState>,
}

/// A deal with its conditions and result.
pub struct DealHandler {
    identifier: DealId,
    priority: i32,
    conditions: Vec<Box<dyn Condition>>,
    result: Box<dyn DealResult>,
    messages: FxHashMap<MessageKind, String>,
    total: Option<Money<'static, Currency>>,
    conditions_met_count: u32,
}

impl fmt::Debug for DealHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DealHandler")
            .field("identifier", &self.identifier)
            .field("priority", &self.priority)
            .field("conditions", &self.conditions)
            .field("result", &self.result)
            .field("total", &self.total)
            .field("conditions_met_count", &self.conditions_met_count)
            .finish_non_exhaustive()
    }
}

impl DealHandler {
    /// Start building a deal.
    pub fn builder(identifier: impl Into<DealId>) -> DealHandlerBuilder {
        DealHandlerBuilder {
            identifier: identifier.into(),
            priority: 0,
            conditions: Vec::new(),
            result: None,
            messages: FxHashMap::default(),
        }
    }

    /// Deal identifier.
    pub fn identifier(&self) -> &DealId {
        &self.identifier
    }

    /// Priority; higher runs first.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Conditions in the order they were added.
    pub fn conditions(&self) -> impl Iterator<Item = &dyn Condition> {
        self.conditions.iter().map(|condition| &**condition)
    }

    /// The deal's result.
    pub fn result(&self) -> &dyn DealResult {
        &*self.result
    }

    /// Total as of the last recompute, or `None` before the first.
    pub fn total(&self) -> Option<Money<'static, Currency>> {
        self.total
    }

    /// Conditions-met-count as of the last recompute.
    pub fn conditions_met_count(&self) -> u32 {
        self.conditions_met_count
    }

    /// Configured message for a state, if any.
    pub fn message_for(&self, kind: MessageKind) -> Option<&str> {
        self.messages.get(&kind).map(String::as_str)
    }

    /// Human-readable description of the result.
    pub fn description(&self) -> String {
        self.result.description()
    }

    /// How many times the conditions hold together.
    ///
    /// Zero as soon as one condition does not hold; otherwise the largest
    /// count any condition reports. A deal without conditions is met once.
    /// Conditions ignore what this deal itself recorded on the cart.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a condition.
    pub fn conditions_met(&self, ctx: &mut DealContext<'_>) -> Result<u32, DealError> {
        ctx.pass.enter(&self.identifier);

        let mut count = 1;

        for condition in &self.conditions {
            let met = condition.met(ctx)?;

            if !met.is_met() {
                debug!(deal = %self.identifier, kind = %condition.kind(), "condition not met");

                return Ok(0);
            }

            count = count.max(met.count());
        }

        Ok(count)
    }

    /// Return whether every condition is met or almost met, and at least one
    /// is only almost met.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a condition.
    pub fn almost_met(&self, ctx: &mut DealContext<'_>) -> Result<bool, DealError> {
        ctx.pass.enter(&self.identifier);

        let mut almost = false;

        for condition in &self.conditions {
            if condition.met(ctx)?.is_met() {
                continue;
            }

            if !condition.almost_met(ctx)? {
                return Ok(false);
            }

            almost = true;
        }

        Ok(almost)
    }

    /// Promotional message matching the deal's current state, if configured.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a condition.
    pub fn message(&self, ctx: &mut DealContext<'_>) -> Result<Option<&str>, DealError> {
        let kind = if self.conditions_met(ctx)? > 0 {
            MessageKind::Met
        } else if self.almost_met(ctx)? {
            MessageKind::AlmostMet
        } else {
            MessageKind::NotMet
        };

        Ok(self.message_for(kind))
    }

    /// Evaluate the conditions and apply or undo the result.
    ///
    /// When the conditions hold, the result is processed, its value cached and
    /// `Event::DealTotalUpdated` dispatched. Otherwise the cached total drops to
    /// zero, the result is reset and `Event::DealConditionsNotMet` dispatched.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a condition or the result.
    #[tracing::instrument(name = "deal.recompute", skip_all, fields(deal = %self.identifier))]
    pub fn recompute(
        &mut self,
        ctx: &mut DealContext<'_>,
        sink: &mut dyn EventSink,
    ) -> Result<Money<'static, Currency>, DealError> {
        let count = self.conditions_met(ctx)?;
        let view = DealView::new(&self.identifier, count);

        self.conditions_met_count = count;

        if count > 0 {
            let total = self.result.process(&view, ctx)?;

            self.total = Some(total);

            info!(count, total = %total, "deal applied");

            sink.dispatch(Event::DealTotalUpdated {
                deal: self.identifier.clone(),
                total,
            });

            Ok(total)
        } else {
            let zero = ctx.zero();

            self.total = Some(zero);
            self.result.reset(&view, ctx)?;

            debug!("deal conditions not met");

            sink.dispatch(Event::DealConditionsNotMet {
                deal: self.identifier.clone(),
            });

            Ok(zero)
        }
    }

    /// Select a gift on a deal whose result offers a choice.
    ///
    /// # Errors
    ///
    /// Returns `DealError::ChoiceUnsupported` if the result offers no choice,
    /// or `DealError::UnknownGift` if `gift` is not on offer.
    pub fn choose(&mut self, gift: &PurchasableId) -> Result<(), DealError> {
        self.result.choose(&self.identifier, gift)
    }

    /// Key this deal's state is stored under.
    pub fn state_key(&self) -> String {
        format!("deal:{}", self.identifier)
    }

    /// Bookkeeping to persist, if the deal has been computed.
    pub fn state(&self) -> Option<DealState> {
        let total = self.total?;

        Some(DealState {
            total: total.to_minor_units(),
            currency: total.currency().iso_alpha_code.to_string(),
            conditions_met_count: self.conditions_met_count,
            result: self.result.snapshot(),
        })
    }

    /// Restore persisted bookkeeping.
    ///
    /// A total in an unknown currency is dropped; the next recompute
    /// replaces it anyway.
    pub fn restore(&mut self, state: &DealState) {
        self.total = find_currency(&state.currency)
            .map(|currency| Money::from_minor(state.total, currency));
        self.conditions_met_count = state.conditions_met_count;

        if let Some(result) = &state.result {
            self.result.restore(result);
        }
    }
}

/// Builder for [`DealHandler`].
#[derive(Debug)]
pub struct DealHandlerBuilder {
    identifier: DealId,
    priority: i32,
    conditions: Vec<Box<dyn Condition>>,
    result: Option<Box<dyn DealResult>>,
    messages: FxHashMap<MessageKind, String>,
}

impl DealHandlerBuilder {
    /// Set the priority; higher runs first.
    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Add a condition.
    #[must_use]
    pub fn condition(self, condition: impl Condition + 'static) -> Self {
        self.boxed_condition(Box::new(condition))
    }

    /// Add a boxed condition. A condition of a type already present replaces
    /// it in place.
    #[must_use]
    pub fn boxed_condition(mut self, condition: Box<dyn Condition>) -> Self {
        let kind = condition.kind();

        match self.conditions.iter_mut().find(|existing| existing.kind() == kind) {
            Some(existing) => *existing = condition,
            None => self.conditions.push(condition),
        }

        self
    }

    /// Set the result.
    #[must_use]
    pub fn result(self, result: impl DealResult + 'static) -> Self {
        self.boxed_result(Box::new(result))
    }

    /// Set a boxed result.
    #[must_use]
    pub fn boxed_result(mut self, result: Box<dyn DealResult>) -> Self {
        self.result = Some(result);
        self
    }

    /// Set the message for a state.
    #[must_use]
    pub fn message(mut self, kind: MessageKind, text: impl Into<String>) -> Self {
        self.messages.insert(kind, text.into());
        self
    }

    /// Set every message at once.
    #[must_use]
    pub fn messages(mut self, messages: impl IntoIterator<Item = (MessageKind, String)>) -> Self {
        self.messages.extend(messages);
        self
    }

    /// Build the deal.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingResult` if no result was set.
    pub fn build(self) -> Result<DealHandler, ConfigError> {
        let result = self
            .result
            .ok_or_else(|| ConfigError::MissingResult(self.identifier.to_string()))?;

        Ok(DealHandler {
            identifier: self.identifier,
            priority: self.priority,
            conditions: self.conditions,
            result,
            messages: self.messages,
            total: None,
            conditions_met_count: 0,
        })
    }
}
