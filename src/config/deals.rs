//! Deal definitions
//!
//! Deals declared in YAML:
//!
//! ```yaml
//! deals:
//!   - identifier: spend-400
//!     priority: 10
//!     messages:
//!       met: "You saved 10%"
//!     conditions:
//!       - type: amount
//!         amounts: { USD: 400 }
//!     result:
//!       type: cart_discount
//!       cart_discount_percentage: 10
//! ```

use std::{collections::BTreeMap, fs, path::Path, str::FromStr};

use serde::Deserialize;
use tracing::debug;

use crate::{
    conditions::build_condition,
    config::{Config, ConfigError},
    handler::{DealHandler, MessageKind},
    ids::DealId,
    results::build_result,
};

/// A condition or result: its type tag and the rest of its keys.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TypedConfig {
    /// Type tag
    #[serde(rename = "type")]
    pub kind: String,

    /// Remaining keys
    #[serde(flatten)]
    pub config: Config,
}

/// One deal as declared in configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DealDefinition {
    /// Deal identifier
    pub identifier: DealId,

    /// Priority; higher runs first
    #[serde(default)]
    pub priority: i32,

    /// Promotional messages
    #[serde(default)]
    pub messages: BTreeMap<MessageKind, String>,

    /// Conditions, all of which must hold
    #[serde(default)]
    pub conditions: Vec<TypedConfig>,

    /// Result applied when the conditions hold
    #[serde(default)]
    pub result: Option<TypedConfig>,
}

impl DealDefinition {
    /// Build the handler for this deal.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for an unknown type tag, a missing or malformed
    /// key, or a deal without a result.
    pub fn build(&self) -> Result<DealHandler, ConfigError> {
        let mut builder = DealHandler::builder(self.identifier.clone())
            .priority(self.priority)
            .messages(self.messages.clone());

        for condition in &self.conditions {
            builder = builder.boxed_condition(build_condition(
                &condition.kind,
                &condition.config,
                &self.identifier,
            )?);
        }

        if let Some(result) = &self.result {
            builder = builder.boxed_result(build_result(&result.kind, &result.config)?);
        }

        debug!(deal = %self.identifier, conditions = self.conditions.len(), "deal built from config");

        builder.build()
    }
}

/// Every deal declared in a configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DealsConfig {
    /// Declared deals, in file order
    #[serde(default)]
    pub deals: Vec<DealDefinition>,
}

impl DealsConfig {
    /// Load deal definitions from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, or
    /// `ConfigError::Yaml` if it cannot be parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;

        contents.parse()
    }

    /// Build a handler for every declared deal, in file order.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` raised building a deal.
    pub fn build(&self) -> Result<Vec<DealHandler>, ConfigError> {
        self.deals.iter().map(DealDefinition::build).collect()
    }
}

impl FromStr for DealsConfig {
    type Err = ConfigError;

    fn from_str(yaml: &str) -> Result<Self, Self::Err> {
        Ok(serde_norway::from_str(yaml)?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use testresult::TestResult;

    use crate::{conditions::ConditionKind, results::ResultKind};

    use super::*;

    const DEALS: &str = r#"
deals:
  - identifier: spend-400
    priority: 10
    messages:
      met: "You saved 10%"
      almost_met: "Add one more item to save 10%"
    conditions:
      - type: amount
        amounts: { USD: 400 }
      - type: has_zone
        countries: [NZ, AU]
    result:
      type: cart_discount
      cart_discount_percentage: 10
  - identifier: mug-gift
    conditions:
      - type: quantity_of_purchasables_in_cart
        purchasables: [mug]
        quantity: 2
    result:
      type: free_gift
      gift: { identifier: sticker, prices: { USD: 200 } }
"#;

    #[test]
    fn parses_deal_definitions() -> TestResult {
        let config: DealsConfig = DEALS.parse()?;

        assert_eq!(config.deals.len(), 2);

        let spend = config.deals.first().ok_or("no deals")?;

        assert_eq!(spend.identifier.as_str(), "spend-400");
        assert_eq!(spend.priority, 10);
        assert_eq!(
            spend.messages.get(&MessageKind::Met).map(String::as_str),
            Some("You saved 10%")
        );
        assert_eq!(spend.conditions.len(), 2);
        assert!(spend.conditions.iter().all(|condition| !condition.config.has("type")));

        Ok(())
    }

    #[test]
    fn builds_handlers_in_file_order() -> TestResult {
        let handlers = DEALS.parse::<DealsConfig>()?.build()?;

        let summary: Vec<(&str, i32, Vec<ConditionKind>, ResultKind)> = handlers
            .iter()
            .map(|handler| {
                (
                    handler.identifier().as_str(),
                    handler.priority(),
                    handler.conditions().map(|condition| condition.kind()).collect(),
                    handler.result().kind(),
                )
            })
            .collect();

        assert_eq!(
            summary,
            vec![
                (
                    "spend-400",
                    10,
                    vec![ConditionKind::Amount, ConditionKind::HasZone],
                    ResultKind::CartDiscount
                ),
                (
                    "mug-gift",
                    0,
                    vec![ConditionKind::QuantityOfPurchasablesInCart],
                    ResultKind::FreeGift
                ),
            ]
        );

        Ok(())
    }

    #[test]
    fn loads_from_file() -> TestResult {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(DEALS.as_bytes())?;

        let config = DealsConfig::from_path(file.path())?;

        assert_eq!(config, DEALS.parse::<DealsConfig>()?);

        Ok(())
    }

    #[test]
    fn unknown_types_are_rejected() -> TestResult {
        let condition: DealsConfig = r"
deals:
  - identifier: broken
    conditions: [{ type: moon_phase }]
    result: { type: shipping, shipping_discount_type: free }
"
        .parse()?;

        assert!(matches!(
            condition.build(),
            Err(ConfigError::UnknownCondition(kind)) if kind == "moon_phase"
        ));

        let result: DealsConfig = "deals: [{ identifier: broken, result: { type: refund } }]".parse()?;

        assert!(matches!(
            result.build(),
            Err(ConfigError::UnknownResult(kind)) if kind == "refund"
        ));

        Ok(())
    }

    #[test]
    fn missing_keys_and_results_are_fatal() -> TestResult {
        let missing_key: DealsConfig = r"
deals:
  - identifier: spend
    conditions: [{ type: amount }]
    result: { type: shipping, shipping_discount_type: free }
"
        .parse()?;

        assert!(matches!(
            missing_key.build(),
            Err(ConfigError::Missing(key)) if key == "amounts"
        ));

        let no_result: DealsConfig = "deals: [{ identifier: empty }]".parse()?;

        assert!(matches!(
            no_result.build(),
            Err(ConfigError::MissingResult(deal)) if deal == "empty"
        ));

        Ok(())
    }
}
