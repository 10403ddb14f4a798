//! Zone Condition

use smallvec::SmallVec;

use crate::{
    conditions::{Condition, ConditionKind, Met},
    config::{Config, ConfigError},
    context::DealContext,
    error::DealError,
};

/// Met when the active locale's country is in an allow-list.
#[derive(Debug, Clone)]
pub struct HasZoneCondition {
    countries: SmallVec<[String; 4]>,
}

impl HasZoneCondition {
    /// Create for a list of ISO 3166 alpha-2 country codes.
    pub fn new<S: Into<String>>(countries: impl IntoIterator<Item = S>) -> Self {
        Self {
            countries: countries.into_iter().map(Into::into).collect(),
        }
    }

    /// Create from config keys: `countries`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `countries` is missing or not a list of strings.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let countries: Vec<String> = config.get("countries")?;

        Ok(Self::new(countries))
    }
}

impl Condition for HasZoneCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::HasZone
    }

    fn met(&self, ctx: &DealContext<'_>) -> Result<Met, DealError> {
        let met = ctx.locale.country_code().is_some_and(|country| {
            self.countries
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(country))
        });

        Ok(Met::Bool(met))
    }

    fn description(&self) -> String {
        format!("Ships to {}", self.countries.join(", "))
    }
}
