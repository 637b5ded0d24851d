// Copyright (c) Tablechain, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The bridge module and its externally callable operations.
//!
//! [`BridgeModule`] owns the bridge store and the seams to the host chain
//! (ledger, metrics, configuration). The per-block hooks live in
//! [`crate::deposit_sync`] and [`crate::deposit_scanner`]; the withdrawal
//! entry points in [`crate::withdrawal`]. This module holds the shared
//! credit path, the manual deposit entry point and the queries.

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::eth_client::ExternalChainReader;
use crate::events::BridgeEvent;
use crate::finality::ExternalHeightClock;
use crate::metrics::BridgeMetrics;
use crate::store::{Bank, BlockCtx, BridgeStore, SyncCursor};
use crate::types::{
    deposit_record_id, normalize_host_address, DepositRecord, WithdrawalRequest,
};
use ethers::types::{Address as EthAddress, U256};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Result of crediting a single deposit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditOutcome {
    pub record_id: String,
    pub recipient: String,
    pub amount: u64,
}

/// Response of the manual deposit entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    pub recipient: String,
    pub amount: u64,
    pub deposit_index: u64,
    /// The external height the query was pinned to, reported back so a
    /// relayer can pin the same height when replaying.
    pub external_height: u64,
}

/// The settlement bridge module, embedded by the host chain's state machine.
pub struct BridgeModule<B> {
    config: BridgeConfig,
    clock: ExternalHeightClock,
    contract: Option<EthAddress>,
    store: BridgeStore,
    bank: B,
    metrics: Arc<BridgeMetrics>,
}

impl<B: Bank> BridgeModule<B> {
    pub fn new(
        config: BridgeConfig,
        store: BridgeStore,
        bank: B,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        let clock = config.height_clock();
        let contract = if config.ingestion_configured() {
            config.contract_address().ok()
        } else {
            None
        };
        Self {
            config,
            clock,
            contract,
            store,
            bank,
            metrics,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn store(&self) -> &BridgeStore {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut BridgeStore {
        &mut self.store
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    pub(crate) fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }

    pub(crate) fn metrics(&self) -> &BridgeMetrics {
        &self.metrics
    }

    pub(crate) fn clock(&self) -> ExternalHeightClock {
        self.clock
    }

    /// The deposit contract, when ingestion is configured and parseable.
    pub(crate) fn ingestion_contract(&self) -> Option<EthAddress> {
        self.contract
    }

    /// Block-end hook, invoked once per host block by the state machine.
    ///
    /// Runs the per-block ingestion engine, the rate-limited batch scanner
    /// and withdrawal auto-signing. Never returns an error: anything that
    /// goes wrong here either became a recorded skip or is deferred to the
    /// next block.
    pub async fn end_block<R: ExternalChainReader>(&mut self, ctx: &mut BlockCtx, reader: &R) {
        self.run_deposit_sync(ctx, reader).await;
        self.process_pending_deposits(ctx, reader).await;
        self.auto_sign_pending_withdrawals(ctx);
    }

    /// Credit one deposit record, or fail deterministically.
    ///
    /// Every error out of this function is a total function of the record
    /// itself (plus current ledger state) — callers on the ingestion paths
    /// convert those into recorded skips. Transient causes live below the
    /// reader and never reach here.
    pub(crate) fn credit_deposit(
        &mut self,
        ctx: &mut BlockCtx,
        record: &DepositRecord,
    ) -> BridgeResult<CreditOutcome> {
        let contract = self
            .contract
            .ok_or_else(|| BridgeError::InternalError("bridge contract not configured".into()))?;
        let record_id = deposit_record_id(&contract, record.index);

        if self.store.is_deposit_processed(&record_id) {
            return Err(BridgeError::DepositAlreadyProcessed(record_id));
        }

        let recipient = normalize_host_address(&record.account)?;
        if record.amount.is_zero() {
            return Err(BridgeError::ZeroValueDeposit);
        }
        if record.amount > U256::from(u64::MAX) {
            return Err(BridgeError::DepositAmountOverflow(record.amount.to_string()));
        }
        let amount = record.amount.as_u64();

        self.bank
            .credit(&recipient, amount)
            .map_err(|e| BridgeError::LedgerError(e.to_string()))?;

        self.store.mark_deposit_processed(&record_id);
        ctx.emit(BridgeEvent::BridgeDepositProcessed {
            record_id: record_id.clone(),
            recipient: recipient.clone(),
            amount,
            index: record.index,
        });

        info!(
            record_id = %record_id,
            recipient = %recipient,
            amount,
            index = record.index,
            "deposit credited"
        );

        Ok(CreditOutcome {
            record_id,
            recipient,
            amount,
        })
    }

    /// Manual/relayer-assisted deposit processing.
    ///
    /// Unlike the ingestion paths this surfaces every error to the caller:
    /// an operator pushing a specific index wants to see why it failed, and
    /// an already-processed index is rejected rather than skipped. The
    /// cursor is not touched — the engine remains the only writer.
    pub async fn process_deposit<R: ExternalChainReader>(
        &mut self,
        ctx: &mut BlockCtx,
        reader: &R,
        index: u64,
        external_height: Option<u64>,
    ) -> BridgeResult<DepositReceipt> {
        let contract = self
            .contract
            .ok_or_else(|| BridgeError::InternalError("bridge contract not configured".into()))?;

        let height = match external_height {
            Some(height) => height,
            None => reader.block_number().await?,
        };

        let record_id = deposit_record_id(&contract, index);
        if self.store.is_deposit_processed(&record_id) {
            return Err(BridgeError::DepositAlreadyProcessed(record_id));
        }

        let record = reader
            .deposit_at_index(index, Some(height))
            .await?
            .ok_or(BridgeError::DepositNotFound { index, height })?;

        let outcome = self.credit_deposit(ctx, &record)?;
        self.store.record_deposit_index(index, height);

        Ok(DepositReceipt {
            recipient: outcome.recipient,
            amount: outcome.amount,
            deposit_index: index,
            external_height: height,
        })
    }

    // ---- queries ----

    pub fn is_deposit_processed(&self, record_id: &str) -> bool {
        self.store.is_deposit_processed(record_id)
    }

    pub fn processed_deposit_ids(&self) -> Vec<String> {
        self.store
            .processed_deposit_ids()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn sync_cursor(&self) -> SyncCursor {
        self.store.sync_cursor()
    }

    pub fn get_withdrawal_request(&self, nonce: &str) -> BridgeResult<WithdrawalRequest> {
        self.store.withdrawal_request(nonce).cloned()
    }

    pub fn list_withdrawal_requests(&self, owner: Option<&str>) -> Vec<WithdrawalRequest> {
        self.store
            .withdrawal_requests()
            .filter(|request| owner.map_or(true, |o| request.owner == o))
            .cloned()
            .collect()
    }
}
