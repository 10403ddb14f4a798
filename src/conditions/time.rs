//! Time Conditions
//!
//! Windows are half-open: met from `start` (inclusive) until `end`
//! (exclusive). Adding purchasables never changes the time, so these
//! conditions are almost met exactly when they are met.

use jiff::Timestamp;

use crate::{
    conditions::{Condition, ConditionKind, Met},
    config::{Config, ConfigError},
    context::DealContext,
    error::DealError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    start: Option<Timestamp>,
    end: Option<Timestamp>,
}

impl Window {
    fn contains(self, now: Timestamp) -> bool {
        self.start.is_none_or(|start| now >= start) && self.end.is_none_or(|end| now < end)
    }

    fn describe(self) -> String {
        match (self.start, self.end) {
            (Some(start), Some(end)) => format!("Valid from {start} until {end}"),
            (Some(start), None) => format!("Valid from {start}"),
            (None, Some(end)) => format!("Valid until {end}"),
            (None, None) => "Always valid".to_string(),
        }
    }

    fn met(self, ctx: &DealContext<'_>) -> Met {
        Met::Bool(self.contains(ctx.clock.now()))
    }
}

/// Met from an instant onwards.
#[derive(Debug, Clone, Copy)]
pub struct StartDateCondition {
    window: Window,
}

impl StartDateCondition {
    /// Create with a start instant.
    pub fn new(start: Timestamp) -> Self {
        Self {
            window: Window {
                start: Some(start),
                end: None,
            },
        }
    }

    /// Create from config keys: `start` (RFC 3339).
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `start` is missing or not a timestamp.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(config.get("start")?))
    }
}

impl Condition for StartDateCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::StartDate
    }

    fn met(&self, ctx: &DealContext<'_>) -> Result<Met, DealError> {
        Ok(self.window.met(ctx))
    }

    fn almost_met(&self, ctx: &mut DealContext<'_>) -> Result<bool, DealError> {
        Ok(self.window.met(ctx).is_met())
    }

    fn description(&self) -> String {
        self.window.describe()
    }
}

/// Met until an instant.
#[derive(Debug, Clone, Copy)]
pub struct EndDateCondition {
    window: Window,
}

impl EndDateCondition {
    /// Create with an end instant.
    pub fn new(end: Timestamp) -> Self {
        Self {
            window: Window {
                start: None,
                end: Some(end),
            },
        }
    }

    /// Create from config keys: `end` (RFC 3339).
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `end` is missing or not a timestamp.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(config.get("end")?))
    }
}

impl Condition for EndDateCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::EndDate
    }

    fn met(&self, ctx: &DealContext<'_>) -> Result<Met, DealError> {
        Ok(self.window.met(ctx))
    }

    fn almost_met(&self, ctx: &mut DealContext<'_>) -> Result<bool, DealError> {
        Ok(self.window.met(ctx).is_met())
    }

    fn description(&self) -> String {
        self.window.describe()
    }
}

/// Met within a window bounded on at least one side.
#[derive(Debug, Clone, Copy)]
pub struct TimeCondition {
    window: Window,
}

impl TimeCondition {
    /// Create with optional bounds.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if neither bound is given, or
    /// `ConfigError::Invalid` if `end` is not after `start`.
    pub fn new(start: Option<Timestamp>, end: Option<Timestamp>) -> Result<Self, ConfigError> {
        match (start, end) {
            (None, None) => Err(ConfigError::Missing("start` or `end".to_string())),
            (Some(start), Some(end)) if end <= start => Err(ConfigError::Invalid {
                key: "end".to_string(),
                reason: format!("must be after {start}"),
            }),
            _ => Ok(Self {
                window: Window { start, end },
            }),
        }
    }

    /// Create from config keys: `start` and/or `end` (RFC 3339).
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if neither key is present, either is not a
    /// timestamp, or the window is empty.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::new(config.get_opt("start")?, config.get_opt("end")?)
    }
}

impl Condition for TimeCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::Time
    }

    fn met(&self, ctx: &DealContext<'_>) -> Result<Met, DealError> {
        Ok(self.window.met(ctx))
    }

    fn almost_met(&self, ctx: &mut DealContext<'_>) -> Result<bool, DealError> {
        Ok(self.window.met(ctx).is_met())
    }

    fn description(&self) -> String {
        self.window.describe()
    }
}
