//! # Delay Configuration
//!
//! Validated delay settings used by the batch runner, plus the lenient
//! override shape accepted from request bodies and config files.

use crate::error::ConfigError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_WALLET_DELAY_MIN_MS: u64 = 50;
pub const DEFAULT_WALLET_DELAY_MAX_MS: u64 = 100;
pub const DEFAULT_OPERATION_DELAY_MS: u64 = 100;

/// Inclusive millisecond range for randomized delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    /// Builds a range, rejecting `min > max`.
    pub fn new(field: &str, min_ms: u64, max_ms: u64) -> Result<Self, ConfigError> {
        let range = Self { min_ms, max_ms };
        range.check(field)?;
        Ok(range)
    }

    fn check(&self, field: &str) -> Result<(), ConfigError> {
        if self.min_ms > self.max_ms {
            return Err(ConfigError::InvalidDelayRange {
                field: field.to_string(),
                min: self.min_ms,
                max: self.max_ms,
            });
        }
        Ok(())
    }
}

/// Delay between two operations of the same wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationDelay {
    Fixed(u64),
    Range(DelayRange),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayConfig {
    pub wallet: DelayRange,
    pub operation: OperationDelay,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            wallet: DelayRange {
                min_ms: DEFAULT_WALLET_DELAY_MIN_MS,
                max_ms: DEFAULT_WALLET_DELAY_MAX_MS,
            },
            operation: OperationDelay::Fixed(DEFAULT_OPERATION_DELAY_MS),
        }
    }
}

impl DelayConfig {
    pub fn new(wallet: DelayRange, operation: OperationDelay) -> Result<Self, ConfigError> {
        let config = Self { wallet, operation };
        config.validate()?;
        Ok(config)
    }

    /// Fields are public, so anything built by hand is re-checked here
    /// before a batch accepts it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.wallet.check("delays.wallet")?;
        if let OperationDelay::Range(range) = &self.operation {
            range.check("delays.operation")?;
        }
        Ok(())
    }
}

/// Partially specified delays as they arrive from callers.
///
/// Every field is optional and malformed fields are treated as absent, so
/// resolution falls back to the defaults field by field instead of
/// rejecting the whole object. `like` and `buy` are accepted as names for
/// the operation delay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DelayOverrides {
    #[serde(default, deserialize_with = "lenient")]
    pub wallet: Option<RangeOverride>,
    #[serde(default, alias = "like", alias = "buy", deserialize_with = "lenient")]
    pub operation: Option<OperationOverride>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeOverride {
    #[serde(default, deserialize_with = "lenient_ms")]
    pub min: Option<u64>,
    #[serde(default, deserialize_with = "lenient_ms")]
    pub max: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationOverride {
    #[serde(default, deserialize_with = "lenient_ms")]
    pub fixed: Option<u64>,
    #[serde(default, deserialize_with = "lenient_ms")]
    pub min: Option<u64>,
    #[serde(default, deserialize_with = "lenient_ms")]
    pub max: Option<u64>,
}

impl DelayOverrides {
    /// Fills in defaults and validates the resulting ranges.
    pub fn resolve(&self) -> Result<DelayConfig, ConfigError> {
        let wallet = self.wallet.clone().unwrap_or_default();
        let wallet = DelayRange::new(
            "delays.wallet",
            wallet.min.unwrap_or(DEFAULT_WALLET_DELAY_MIN_MS),
            wallet.max.unwrap_or(DEFAULT_WALLET_DELAY_MAX_MS),
        )?;

        let operation = match &self.operation {
            Some(OperationOverride {
                fixed: Some(fixed), ..
            }) => OperationDelay::Fixed(*fixed),
            Some(OperationOverride { min, max, .. }) if min.is_some() || max.is_some() => {
                OperationDelay::Range(DelayRange::new(
                    "delays.operation",
                    min.unwrap_or(DEFAULT_OPERATION_DELAY_MS),
                    max.unwrap_or(DEFAULT_OPERATION_DELAY_MS),
                )?)
            }
            _ => OperationDelay::Fixed(DEFAULT_OPERATION_DELAY_MS),
        };

        DelayConfig::new(wallet, operation)
    }

    /// Overlays `other` on top of `self`, field by field.
    pub fn merged_with(&self, other: &DelayOverrides) -> DelayOverrides {
        let wallet = match (&self.wallet, &other.wallet) {
            (Some(base), Some(top)) => Some(RangeOverride {
                min: top.min.or(base.min),
                max: top.max.or(base.max),
            }),
            (base, top) => top.clone().or_else(|| base.clone()),
        };
        let operation = match (&self.operation, &other.operation) {
            (Some(base), Some(top)) => Some(if top.fixed.is_some() {
                top.clone()
            } else if top.min.is_some() || top.max.is_some() {
                OperationOverride {
                    fixed: None,
                    min: top.min.or(base.min),
                    max: top.max.or(base.max),
                }
            } else {
                base.clone()
            }),
            (base, top) => top.clone().or_else(|| base.clone()),
        };
        DelayOverrides { wallet, operation }
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_ms<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(parse_ms(&value))
}

fn parse_ms(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.floor() as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_ms_variants() {
        assert_eq!(parse_ms(&json!(120)), Some(120));
        assert_eq!(parse_ms(&json!(12.9)), Some(12));
        assert_eq!(parse_ms(&json!("75")), Some(75));
        assert_eq!(parse_ms(&json!(-5)), None);
        assert_eq!(parse_ms(&json!(null)), None);
        assert_eq!(parse_ms(&json!({"a": 1})), None);
    }

    #[test]
    fn test_merge_prefers_top_fields() {
        let base: DelayOverrides =
            serde_json::from_value(json!({"wallet": {"min": 10, "max": 20}})).unwrap();
        let top: DelayOverrides =
            serde_json::from_value(json!({"wallet": {"max": 30}, "operation": {"fixed": 5}}))
                .unwrap();

        let merged = base.merged_with(&top).resolve().unwrap();
        assert_eq!(merged.wallet, DelayRange { min_ms: 10, max_ms: 30 });
        assert_eq!(merged.operation, OperationDelay::Fixed(5));
    }
}
