//! Coordinator configuration, loaded from TOML via `serde` the way the
//! teacher's binaries load their `MmCtx` configuration.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::CoordinatorError;

/// Per-currency static configuration: the final-hop CLTV delta and the
/// smallest-unit exponent used to convert decimal quantities to the integer
/// amounts the chain client speaks (§6, §9 "global subunit" design note).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    pub cltv_delta: u64,
    pub subunits: u64,
    pub rpc_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    pub node_pub_key: String,
    #[serde(default)]
    pub history_path: Option<String>,
    pub currencies: HashMap<String, CurrencyConfig>,
}

impl CoordinatorConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, CoordinatorError> {
        let config: CoordinatorConfig =
            toml::from_str(raw).map_err(|e| CoordinatorError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CoordinatorError> {
        let raw = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(|e| CoordinatorError::ConfigError(format!("reading {}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&raw)
    }

    /// Every currency this design supports (§4.7) must be present; anything
    /// else in the file is accepted but unused, so operators can keep a
    /// shared config across coordinator variants.
    fn validate(&self) -> Result<(), CoordinatorError> {
        for required in ["BTC", "LTC"] {
            if !self.currencies.contains_key(required) {
                return Err(CoordinatorError::ConfigError(format!(
                    "missing required currency config for {required}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        node_pub_key = "02abcd"

        [currencies.BTC]
        cltv_delta = 40
        subunits = 100000000
        rpc_url = "https://btc.example"

        [currencies.LTC]
        cltv_delta = 576
        subunits = 100000000
        rpc_url = "https://ltc.example"
    "#;

    #[test]
    fn parses_a_well_formed_config() {
        let config = CoordinatorConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.currencies["BTC"].cltv_delta, 40);
        assert_eq!(config.currencies["LTC"].subunits, 100_000_000);
    }

    #[test]
    fn rejects_a_config_missing_a_required_currency() {
        let err = CoordinatorConfig::from_toml_str(r#"node_pub_key = "02abcd""#).unwrap_err();
        assert!(matches!(err, CoordinatorError::ConfigError(_)));
    }
}
