//! Configuration
//!
//! Conditions and results are configured from flat key/value maps. A missing
//! or malformed required key is a construction-time failure; nothing falls
//! back to a silent default.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use rusty_money::{Findable, Money, iso::Currency};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_norway::Value;
use thiserror::Error;

use crate::discounts::DiscountError;

pub mod deals;

/// Configuration errors raised while wiring deals.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required key is absent.
    #[error("missing required config key `{0}`")]
    Missing(String),

    /// A key is present but its value has the wrong shape.
    #[error("invalid value for config key `{key}`: {reason}")]
    Invalid {
        /// Offending key
        key: String,

        /// Why the value was rejected
        reason: String,
    },

    /// A currency code is not a known ISO currency.
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Condition type tag is not recognised.
    #[error("unknown condition type: {0}")]
    UnknownCondition(String),

    /// Result type tag is not recognised.
    #[error("unknown result type: {0}")]
    UnknownResult(String),

    /// A deal was built without a result.
    #[error("deal `{0}` has no result")]
    MissingResult(String),

    /// Two deals share an identifier.
    #[error("duplicate deal identifier: {0}")]
    DuplicateDeal(String),

    /// IO error reading a configuration file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Configured percentage could not be represented.
    #[error(transparent)]
    Discount(#[from] DiscountError),
}

impl ConfigError {
    fn invalid(key: &str, reason: impl ToString) -> Self {
        Self::Invalid {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Flat configuration map for a single condition or result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config {
    values: BTreeMap<String, Value>,
}

impl Config {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration map from YAML.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Yaml` if the document is not a mapping of string keys.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_norway::from_str(yaml)?)
    }

    /// Set a key, replacing any previous value.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    /// Return whether the key is present.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Read a required key.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the key is absent, or
    /// `ConfigError::Invalid` if it cannot be read as `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigError> {
        self.get_opt(key)?
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    /// Read an optional key.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the key is present but cannot be read as `T`.
    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.values
            .get(key)
            .map(|value| {
                serde_norway::from_value(value.clone()).map_err(|err| ConfigError::invalid(key, err))
            })
            .transpose()
    }

    /// Read a required per-currency amount map (`{ USD: 400, GBP: 350 }`, minor units).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the key is absent, `ConfigError::Invalid` if it
    /// is not a map of integers, or `ConfigError::UnknownCurrency` for unknown codes.
    pub fn currency_amounts(&self, key: &str) -> Result<CurrencyAmounts, ConfigError> {
        let raw: BTreeMap<String, i64> = self.get(key)?;

        CurrencyAmounts::try_from_codes(raw)
    }
}

/// Amounts in minor units keyed by ISO currency code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrencyAmounts {
    amounts: FxHashMap<&'static str, i64>,
}

impl CurrencyAmounts {
    /// Build from `(currency, minor units)` pairs.
    pub fn new(amounts: impl IntoIterator<Item = (&'static Currency, i64)>) -> Self {
        Self {
            amounts: amounts
                .into_iter()
                .map(|(currency, minor)| (currency.iso_alpha_code, minor))
                .collect(),
        }
    }

    /// Build from currency codes, validating each one.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownCurrency` if a code is not an ISO currency.
    pub fn try_from_codes(
        amounts: impl IntoIterator<Item = (String, i64)>,
    ) -> Result<Self, ConfigError> {
        let amounts = amounts
            .into_iter()
            .map(|(code, minor)| {
                find_currency(&code)
                    .map(|currency| (currency.iso_alpha_code, minor))
                    .ok_or(ConfigError::UnknownCurrency(code))
            })
            .collect::<Result<FxHashMap<_, _>, _>>()?;

        Ok(Self { amounts })
    }

    /// Return the configured amount for a currency, if any.
    pub fn get(&self, currency: &'static Currency) -> Option<Money<'static, Currency>> {
        self.amounts
            .get(currency.iso_alpha_code)
            .map(|minor| Money::from_minor(*minor, currency))
    }

    /// Return whether no currencies are configured.
    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }
}

/// Look up an ISO currency by its alphabetic code (case-insensitive).
pub fn find_currency(code: &str) -> Option<&'static Currency> {
    Currency::find(&code.to_ascii_uppercase())
}

/// Read a value that must be one of two mutually exclusive keys.
pub(crate) fn exclusive_keys(
    config: &Config,
    first: &str,
    second: &str,
) -> Result<bool, ConfigError> {
    match (config.has(first), config.has(second)) {
        (true, false) => Ok(true),
        (false, true) => Ok(false),
        (true, true) => Err(ConfigError::invalid(
            first,
            format!("cannot be combined with `{second}`"),
        )),
        (false, false) => Err(ConfigError::Missing(format!("{first}` or `{second}"))),
    }
}
