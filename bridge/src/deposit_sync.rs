// Copyright (c) Tablechain, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-block deposit ingestion engine.
//!
//! Runs once per host block and advances a single shared cursor over the L2
//! deposit ledger. Consensus safety rests on two rules: the query height is a
//! pure function of the consensus block timestamp (never the live L2 tip),
//! and every state-mutating error path is a total function of the fetched
//! record. Transient network failures mutate nothing — the next block is the
//! retry.

use crate::error::BridgeError;
use crate::eth_client::ExternalChainReader;
use crate::events::BridgeEvent;
use crate::handler::BridgeModule;
use crate::store::{Bank, BlockCtx};
use crate::types::deposit_record_id;
use tracing::{debug, info, warn};

impl<B: Bank> BridgeModule<B> {
    /// Attempt to process the deposit at `last_processed_index + 1`.
    ///
    /// Returns `true` when the cursor advanced (credit, skip, or defensive
    /// advance over an already-processed record), `false` when nothing
    /// changed this block (not found yet, transient failure, not
    /// configured).
    pub async fn process_next_deposit<R: ExternalChainReader>(
        &mut self,
        ctx: &mut BlockCtx,
        reader: &R,
    ) -> bool {
        let Some(contract) = self.ingestion_contract() else {
            return false;
        };

        let height = self.clock().safe_height(ctx.time);
        let next_index = self.store().sync_cursor().last_processed_index + 1;

        let record = match reader.deposit_at_index(next_index, Some(height)).await {
            Err(e) => {
                // Transient by construction; never consensus-visible
                debug!(
                    index = next_index,
                    height,
                    error = %e,
                    "deposit query failed, retrying next block"
                );
                return false;
            }
            Ok(None) => {
                debug!(index = next_index, height, "no deposit at next index");
                return false;
            }
            Ok(Some(record)) => record,
        };

        let record_id = deposit_record_id(&contract, next_index);
        if self.store().is_deposit_processed(&record_id) {
            // Seen before (e.g. via the manual entry point). Advance the
            // cursor so the engine does not stall on it.
            warn!(
                index = next_index,
                record_id = %record_id,
                "deposit already processed, advancing cursor"
            );
            self.metrics().deposits_already_processed.inc();
            self.store_mut().advance_sync_cursor(next_index, height);
            self.store_mut().record_deposit_index(next_index, height);
            self.update_cursor_gauges();
            return true;
        }

        match self.credit_deposit(ctx, &record) {
            Ok(outcome) => {
                self.store_mut().advance_sync_cursor(next_index, height);
                self.store_mut().record_deposit_index(next_index, height);
                ctx.emit(BridgeEvent::DepositSynced {
                    deposit_index: next_index,
                    recipient: outcome.recipient.clone(),
                    amount: outcome.amount,
                    external_height: height,
                });
                self.metrics().deposits_synced.inc();
                self.update_cursor_gauges();
                info!(
                    index = next_index,
                    recipient = %outcome.recipient,
                    amount = outcome.amount,
                    external_height = height,
                    "deposit synced"
                );
                true
            }
            Err(e) if !e.is_transient() => {
                // A record that can never be credited: record the skip so
                // every validator moves the cursor identically, instead of
                // retrying forever on divergent timing.
                self.store_mut().mark_deposit_processed(&record_id);
                self.store_mut().advance_sync_cursor(next_index, height);
                self.store_mut().record_deposit_index(next_index, height);
                ctx.emit(BridgeEvent::DepositSkipped {
                    deposit_index: next_index,
                    recipient: record.account.clone(),
                    amount: record.amount.low_u64(),
                    reason: e.to_string(),
                    external_height: height,
                });
                self.metrics()
                    .deposits_skipped
                    .with_label_values(&[e.error_type()])
                    .inc();
                self.update_cursor_gauges();
                warn!(
                    index = next_index,
                    account = %record.account,
                    reason = %e,
                    "deposit skipped"
                );
                true
            }
            Err(e) => {
                debug!(index = next_index, error = %e, "transient credit failure");
                false
            }
        }
    }

    /// Engine entry: handle up to `max_deposits_per_block` records within one
    /// block hook. One record per iteration keeps the per-block cost bounded;
    /// the cap lets a freshly started chain catch up faster than one record
    /// per block.
    pub async fn run_deposit_sync<R: ExternalChainReader>(
        &mut self,
        ctx: &mut BlockCtx,
        reader: &R,
    ) -> usize {
        let cap = self.config().max_deposits_per_block;
        let mut processed = 0;
        while processed < cap {
            if !self.process_next_deposit(ctx, reader).await {
                break;
            }
            processed += 1;
        }
        processed
    }

    fn update_cursor_gauges(&self) {
        let cursor = self.store().sync_cursor();
        self.metrics()
            .last_processed_deposit_index
            .set(cursor.last_processed_index as i64);
        self.metrics()
            .last_external_height
            .set(cursor.last_external_height as i64);
    }

    /// Fails a record through the skip path without touching the network.
    /// Exists for the scanner, which already holds the record.
    pub(crate) fn credit_or_skip(
        &mut self,
        ctx: &mut BlockCtx,
        record: &crate::types::DepositRecord,
        record_id: &str,
    ) -> Result<(), BridgeError> {
        match self.credit_deposit(ctx, record) {
            Ok(_) => Ok(()),
            Err(e) if !e.is_transient() => {
                self.store_mut().mark_deposit_processed(record_id);
                ctx.emit(BridgeEvent::DepositSkipped {
                    deposit_index: record.index,
                    recipient: record.account.clone(),
                    amount: record.amount.low_u64(),
                    reason: e.to_string(),
                    external_height: record.at_height,
                });
                self.metrics()
                    .deposits_skipped
                    .with_label_values(&[e.error_type()])
                    .inc();
                warn!(
                    index = record.index,
                    account = %record.account,
                    reason = %e,
                    "deposit skipped"
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
