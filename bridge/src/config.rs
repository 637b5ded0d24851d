// Copyright (c) Tablechain, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::error::{BridgeError, BridgeResult};
use crate::finality::{ExternalHeightClock, DEFAULT_FINALITY_MARGIN};
use anyhow::Result;
use ethers::types::Address as EthAddress;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Config file loading/saving. YAML and JSON are both accepted, keyed off the
/// file extension.
pub trait Config: Serialize + DeserializeOwned {
    fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            _ => serde_json::from_str(&content)?,
        };
        Ok(config)
    }

    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Settlement bridge configuration.
///
/// The deterministic-height parameters (`l2-genesis-time`,
/// `l2-block-interval-secs`, `finality-margin`) are consensus parameters:
/// every validator must run with identical values or safe heights diverge.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BridgeConfig {
    /// Whether deposit ingestion runs at all. The withdrawal ledger works
    /// regardless, it needs no L2 connection.
    #[serde(default)]
    pub enabled: bool,
    /// Rpc url for the L2 fullnode, used for read-only queries.
    pub l2_rpc_url: String,
    /// The deposit bridge contract on the L2.
    pub bridge_contract_address: String,
    /// Expected L2 chain id; connection fails on mismatch when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_chain_id: Option<u64>,
    /// Unix timestamp of L2 block 0.
    pub l2_genesis_time: u64,
    /// L2 block production interval in seconds.
    #[serde(default = "default_l2_block_interval_secs")]
    pub l2_block_interval_secs: u64,
    /// Reorg defense margin in L2 blocks.
    #[serde(default = "default_finality_margin")]
    pub finality_margin: u64,
    /// Minimum seconds between batch scanner runs.
    #[serde(default = "default_deposit_check_interval_secs")]
    pub deposit_check_interval_secs: u64,
    /// Maximum gap fills per scanner run.
    #[serde(default = "default_max_deposits_per_batch")]
    pub max_deposits_per_batch: usize,
    /// Maximum records the per-block engine handles in one hook.
    #[serde(default = "default_max_deposits_per_block")]
    pub max_deposits_per_block: usize,
    /// Bound on every single RPC call.
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,
    /// Hex secp256k1 key used to auto-sign pending withdrawals in the block
    /// hook. Unset disables auto-signing; manual signing stays available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator_signing_key: Option<String>,
}

fn default_l2_block_interval_secs() -> u64 {
    2
}

fn default_finality_margin() -> u64 {
    DEFAULT_FINALITY_MARGIN
}

fn default_deposit_check_interval_secs() -> u64 {
    600
}

fn default_max_deposits_per_batch() -> usize {
    10
}

fn default_max_deposits_per_block() -> usize {
    5
}

fn default_rpc_timeout_secs() -> u64 {
    10
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            l2_rpc_url: String::new(),
            // Base mainnet deposit contract of the reference deployment
            bridge_contract_address: "0xcc391c8f1aFd6DB5D8b0e064BA81b1383b14FE5B".to_string(),
            expected_chain_id: Some(8453),
            // Base mainnet genesis
            l2_genesis_time: 1_686_789_347,
            l2_block_interval_secs: default_l2_block_interval_secs(),
            finality_margin: default_finality_margin(),
            deposit_check_interval_secs: default_deposit_check_interval_secs(),
            max_deposits_per_batch: default_max_deposits_per_batch(),
            max_deposits_per_block: default_max_deposits_per_block(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
            validator_signing_key: None,
        }
    }
}

impl Config for BridgeConfig {}

impl BridgeConfig {
    /// Deposit ingestion requires both an endpoint and a contract; without
    /// them the block hooks skip silently.
    pub fn ingestion_configured(&self) -> bool {
        self.enabled && !self.l2_rpc_url.is_empty() && !self.bridge_contract_address.is_empty()
    }

    pub fn contract_address(&self) -> BridgeResult<EthAddress> {
        EthAddress::from_str(&self.bridge_contract_address).map_err(|e| {
            BridgeError::InternalError(format!(
                "invalid bridge contract address {}: {}",
                self.bridge_contract_address, e
            ))
        })
    }

    pub fn height_clock(&self) -> ExternalHeightClock {
        ExternalHeightClock::new(
            self.l2_genesis_time,
            self.l2_block_interval_secs,
            self.finality_margin,
        )
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert!(!config.enabled);
        assert!(!config.ingestion_configured());
        assert_eq!(config.finality_margin, 64);
        assert_eq!(config.deposit_check_interval_secs, 600);
        assert_eq!(config.max_deposits_per_batch, 10);
        assert_eq!(config.max_deposits_per_block, 5);
        assert!(config.contract_address().is_ok());
    }

    #[test]
    fn test_ingestion_configured_requires_endpoint_and_contract() {
        let config = BridgeConfig {
            enabled: true,
            l2_rpc_url: "http://localhost:8545".to_string(),
            ..Default::default()
        };
        assert!(config.ingestion_configured());

        let no_url = BridgeConfig {
            enabled: true,
            l2_rpc_url: String::new(),
            ..Default::default()
        };
        assert!(!no_url.ingestion_configured());

        let no_contract = BridgeConfig {
            enabled: true,
            l2_rpc_url: "http://localhost:8545".to_string(),
            bridge_contract_address: String::new(),
            ..Default::default()
        };
        assert!(!no_contract.ingestion_configured());
    }

    #[test]
    fn test_kebab_case_serde_with_defaults() {
        let yaml = r#"
enabled: true
l2-rpc-url: "http://localhost:8545"
bridge-contract-address: "0xcc391c8f1aFd6DB5D8b0e064BA81b1383b14FE5B"
l2-genesis-time: 1686789347
"#;
        let config: BridgeConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.enabled);
        assert_eq!(config.l2_block_interval_secs, 2);
        assert_eq!(config.finality_margin, 64);
        assert_eq!(config.rpc_timeout_secs, 10);
        assert!(config.validator_signing_key.is_none());
    }

    #[test]
    fn test_height_clock_uses_config_values() {
        let config = BridgeConfig {
            l2_genesis_time: 1_000,
            l2_block_interval_secs: 2,
            finality_margin: 64,
            ..Default::default()
        };
        let clock = config.height_clock();
        assert_eq!(clock.safe_height(1_000 + 2_000), 1_000 - 64);
    }

    #[test]
    fn test_config_roundtrip_json() {
        let config = BridgeConfig {
            enabled: true,
            l2_rpc_url: "http://localhost:8545".to_string(),
            validator_signing_key: Some("ab".repeat(32)),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: BridgeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.l2_rpc_url, config.l2_rpc_url);
        assert_eq!(back.validator_signing_key, config.validator_signing_key);
    }
}
