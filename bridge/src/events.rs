// Copyright (c) Tablechain, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Typed events emitted into the host chain's event stream.

use serde::{Deserialize, Serialize};

/// Events the bridge appends to the per-block event stream. The host engine
/// forwards them to its own event manager for indexing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeEvent {
    /// A deposit record was credited (engine, scanner or manual path).
    BridgeDepositProcessed {
        record_id: String,
        recipient: String,
        amount: u64,
        index: u64,
    },
    /// The engine advanced its cursor over a freshly credited record.
    DepositSynced {
        deposit_index: u64,
        recipient: String,
        amount: u64,
        external_height: u64,
    },
    /// The engine met a record that can never be credited and recorded the
    /// decision so no validator retries it.
    DepositSkipped {
        deposit_index: u64,
        recipient: String,
        amount: u64,
        reason: String,
        external_height: u64,
    },
    WithdrawalInitiated {
        owner: String,
        nonce: String,
        amount: u64,
        destination: String,
    },
    WithdrawalSigned {
        nonce: String,
    },
    WithdrawalCompleted {
        nonce: String,
        external_tx_ref: String,
        amount: u64,
    },
}

impl BridgeEvent {
    /// Event name as it appears in the host chain's event stream.
    pub fn name(&self) -> &'static str {
        match self {
            BridgeEvent::BridgeDepositProcessed { .. } => "bridge_deposit_processed",
            BridgeEvent::DepositSynced { .. } => "deposit_synced",
            BridgeEvent::DepositSkipped { .. } => "deposit_skipped",
            BridgeEvent::WithdrawalInitiated { .. } => "withdrawal_initiated",
            BridgeEvent::WithdrawalSigned { .. } => "withdrawal_signed",
            BridgeEvent::WithdrawalCompleted { .. } => "withdrawal_completed",
        }
    }
}
