// Copyright (c) Tablechain, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Deterministic test collaborators: a scriptable external chain and an
//! in-memory ledger. No test in this crate touches the network.

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::eth_client::ExternalChainReader;
use crate::handler::BridgeModule;
use crate::metrics::BridgeMetrics;
use crate::store::{Bank, BridgeStore};
use crate::types::{DepositRecord, HOST_ADDRESS_HRP};
use async_trait::async_trait;
use bech32::{ToBase32, Variant};
use ethers::types::U256;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Contract address used across tests (the reference deployment's).
pub const TEST_CONTRACT: &str = "0xcc391c8f1aFd6DB5D8b0e064BA81b1383b14FE5B";

/// L2 genesis time used across tests; pick block times relative to this.
pub const TEST_L2_GENESIS_TIME: u64 = 1_000_000_000;

pub fn test_bech32_address(payload: &[u8]) -> String {
    bech32::encode(HOST_ADDRESS_HRP, payload.to_base32(), Variant::Bech32).unwrap()
}

/// A deposit record owned by a validly addressed test account.
pub fn test_record(index: u64, amount: u64) -> DepositRecord {
    DepositRecord {
        index,
        account: test_bech32_address(&[index as u8; 20]),
        amount: U256::from(amount),
        at_height: 0,
    }
}

/// Scriptable stand-in for the L2: a fixed record set and tip height.
pub struct MockChainReader {
    records: BTreeMap<u64, DepositRecord>,
    height: u64,
    fail: bool,
    last_queried_height: Mutex<Option<u64>>,
}

impl MockChainReader {
    pub fn new(height: u64) -> Self {
        Self {
            records: BTreeMap::new(),
            height,
            fail: false,
            last_queried_height: Mutex::new(None),
        }
    }

    pub fn with_record(mut self, record: DepositRecord) -> Self {
        self.records.insert(record.index, record);
        self
    }

    /// Every call fails with a transient error, as a dead endpoint would.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Height the last `deposit_at_index` call was pinned to.
    pub fn last_queried_height(&self) -> Option<u64> {
        *self.last_queried_height.lock().unwrap()
    }

    fn check_up(&self) -> BridgeResult<()> {
        if self.fail {
            Err(BridgeError::TransientProviderError(
                "mock: connection refused".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ExternalChainReader for MockChainReader {
    async fn deposit_at_index(
        &self,
        index: u64,
        at_height: Option<u64>,
    ) -> BridgeResult<Option<DepositRecord>> {
        self.check_up()?;
        let height = at_height.unwrap_or(self.height);
        *self.last_queried_height.lock().unwrap() = Some(height);
        Ok(self.records.get(&index).map(|record| DepositRecord {
            at_height: height,
            ..record.clone()
        }))
    }

    async fn highest_deposit_index(&self, _at_height: Option<u64>) -> BridgeResult<u64> {
        self.check_up()?;
        Ok(self.records.keys().next_back().copied().unwrap_or(0))
    }

    async fn block_number(&self) -> BridgeResult<u64> {
        self.check_up()?;
        Ok(self.height)
    }
}

/// In-memory ledger, tracking totals so tests can assert no double-credit.
#[derive(Debug, Default)]
pub struct MemoryBank {
    balances: BTreeMap<String, u64>,
    total_credited: u64,
    total_burned: u64,
}

impl MemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(mut self, account: &str, amount: u64) -> Self {
        self.balances.insert(account.to_string(), amount);
        self
    }

    pub fn balance(&self, account: &str) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn total_credited(&self) -> u64 {
        self.total_credited
    }

    pub fn total_burned(&self) -> u64 {
        self.total_burned
    }
}

impl Bank for MemoryBank {
    fn credit(&mut self, account: &str, amount: u64) -> BridgeResult<()> {
        *self.balances.entry(account.to_string()).or_default() += amount;
        self.total_credited += amount;
        Ok(())
    }

    fn burn(&mut self, account: &str, amount: u64) -> BridgeResult<()> {
        let balance = self.balances.entry(account.to_string()).or_default();
        if *balance < amount {
            return Err(BridgeError::LedgerError(format!(
                "burn exceeds balance: have {}, need {}",
                balance, amount
            )));
        }
        *balance -= amount;
        self.total_burned += amount;
        Ok(())
    }

    fn spendable_balance(&self, account: &str) -> u64 {
        self.balance(account)
    }
}

pub fn test_config() -> BridgeConfig {
    BridgeConfig {
        enabled: true,
        l2_rpc_url: "http://localhost:8545".to_string(),
        bridge_contract_address: TEST_CONTRACT.to_string(),
        expected_chain_id: None,
        l2_genesis_time: TEST_L2_GENESIS_TIME,
        l2_block_interval_secs: 2,
        finality_margin: 64,
        deposit_check_interval_secs: 600,
        max_deposits_per_batch: 10,
        max_deposits_per_block: 5,
        rpc_timeout_secs: 1,
        validator_signing_key: None,
    }
}

pub fn test_module() -> BridgeModule<MemoryBank> {
    test_module_with_config(|_| {})
}

pub fn test_module_with_config(
    tweak: impl FnOnce(&mut BridgeConfig),
) -> BridgeModule<MemoryBank> {
    let mut config = test_config();
    tweak(&mut config);
    BridgeModule::new(
        config,
        BridgeStore::new(),
        MemoryBank::new(),
        Arc::new(BridgeMetrics::new_for_testing()),
    )
}

pub fn test_module_with_bank(bank: MemoryBank) -> BridgeModule<MemoryBank> {
    BridgeModule::new(
        test_config(),
        BridgeStore::new(),
        bank,
        Arc::new(BridgeMetrics::new_for_testing()),
    )
}
