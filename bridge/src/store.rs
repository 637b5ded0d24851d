// Copyright (c) Tablechain, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Persisted bridge state and the seams to the host chain.
//!
//! The store is plain data behind `&mut` access: the replicated state machine
//! already serializes all mutation, so correctness rests on determinism, not
//! on synchronization. The sync cursor lives here as an explicit record
//! (never a process-wide global) so tests can construct independent
//! instances.

use crate::error::{BridgeError, BridgeResult};
use crate::events::BridgeEvent;
use crate::types::WithdrawalRequest;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The host chain's account ledger, implemented by the embedding application.
/// The bridge only credits deposits, burns withdrawals and checks balances.
pub trait Bank {
    fn credit(&mut self, account: &str, amount: u64) -> BridgeResult<()>;
    fn burn(&mut self, account: &str, amount: u64) -> BridgeResult<()>;
    fn spendable_balance(&self, account: &str) -> u64;
}

/// Per-block processing context handed in by the host engine: consensus
/// height and timestamp, plus the event stream for this block.
#[derive(Debug, Default)]
pub struct BlockCtx {
    pub height: u64,
    /// Consensus block time, unix seconds. Identical on every validator.
    pub time: u64,
    events: Vec<BridgeEvent>,
}

impl BlockCtx {
    pub fn new(height: u64, time: u64) -> Self {
        Self {
            height,
            time,
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: BridgeEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[BridgeEvent] {
        &self.events
    }

    /// Drain the events for the host's event manager at block end.
    pub fn take_events(&mut self) -> Vec<BridgeEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Ingestion cursor: advanced only by the engine, once per successful step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCursor {
    /// Last deposit index credited or skipped. Monotone increasing.
    pub last_processed_index: u64,
    /// External height used for the last credit. Only ever advances to
    /// heights already past the finality margin.
    pub last_external_height: u64,
}

/// Durable bridge state, persisted by the host chain between blocks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeStore {
    /// Append-only set of processed record ids. The single source of truth
    /// for at-most-once crediting; every handling path consults it.
    processed_deposits: BTreeSet<String>,
    sync_cursor: SyncCursor,
    /// Nonce-keyed withdrawal requests.
    withdrawal_requests: BTreeMap<String, WithdrawalRequest>,
    /// Monotonic withdrawal nonce sequence; last value handed out.
    withdrawal_nonce_seq: u64,
    /// Consensus time of the last batch scanner run.
    last_deposit_check_time: u64,
    /// Deposit index → external height used when it was handled. Audit
    /// trail for non-sequential gap fills; never consulted for membership.
    processed_deposit_indices: BTreeMap<u64, u64>,
}

impl BridgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- processed-record ledger ----

    pub fn is_deposit_processed(&self, record_id: &str) -> bool {
        self.processed_deposits.contains(record_id)
    }

    pub fn mark_deposit_processed(&mut self, record_id: &str) {
        self.processed_deposits.insert(record_id.to_string());
    }

    pub fn processed_deposit_ids(&self) -> impl Iterator<Item = &str> {
        self.processed_deposits.iter().map(|s| s.as_str())
    }

    pub fn processed_deposit_count(&self) -> usize {
        self.processed_deposits.len()
    }

    // ---- sync cursor ----

    pub fn sync_cursor(&self) -> SyncCursor {
        self.sync_cursor
    }

    /// Advance the cursor past `index`. The cursor never moves backward;
    /// stale advances are ignored rather than rejected so defensive re-runs
    /// stay no-ops.
    pub fn advance_sync_cursor(&mut self, index: u64, external_height: u64) {
        if index > self.sync_cursor.last_processed_index {
            self.sync_cursor.last_processed_index = index;
        }
        if external_height > self.sync_cursor.last_external_height {
            self.sync_cursor.last_external_height = external_height;
        }
    }

    // ---- per-index height audit trail ----

    pub fn record_deposit_index(&mut self, index: u64, external_height: u64) {
        self.processed_deposit_indices
            .insert(index, external_height);
    }

    pub fn deposit_index_height(&self, index: u64) -> Option<u64> {
        self.processed_deposit_indices.get(&index).copied()
    }

    // ---- withdrawal ledger ----

    /// Hand out the next withdrawal nonce. The sequence starts at 1 so the
    /// first withdrawal never carries an all-zero replay nonce.
    pub fn next_withdrawal_nonce(&mut self) -> String {
        self.withdrawal_nonce_seq += 1;
        crate::types::format_withdrawal_nonce(self.withdrawal_nonce_seq)
    }

    pub fn withdrawal_request(&self, nonce: &str) -> BridgeResult<&WithdrawalRequest> {
        self.withdrawal_requests
            .get(nonce)
            .ok_or_else(|| BridgeError::WithdrawalNotFound(nonce.to_string()))
    }

    pub fn put_withdrawal_request(&mut self, request: WithdrawalRequest) {
        self.withdrawal_requests
            .insert(request.nonce.clone(), request);
    }

    pub fn withdrawal_requests(&self) -> impl Iterator<Item = &WithdrawalRequest> {
        self.withdrawal_requests.values()
    }

    // ---- scanner gate ----

    pub fn last_deposit_check_time(&self) -> u64 {
        self.last_deposit_check_time
    }

    pub fn set_last_deposit_check_time(&mut self, time: u64) {
        self.last_deposit_check_time = time;
    }
}
