// Copyright (c) Tablechain, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::error::{BridgeError, BridgeResult};
use bech32::{FromBase32, ToBase32, Variant};
use ethers::types::{Address as EthAddress, U256};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Human-readable prefix of host chain account addresses.
pub const HOST_ADDRESS_HRP: &str = "b52";

/// A deposit record as observed on the L2 bridge contract.
///
/// The record is owned by the contract and immutable once observed; the host
/// chain only reads it. `at_height` is the external height the query was
/// pinned to, not a property of the record itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositRecord {
    pub index: u64,
    pub account: String,
    pub amount: U256,
    pub at_height: u64,
}

/// Deterministic identifier standing in for the deposit's L2 transaction.
///
/// `sha256("{contract}-{index}")`, with the contract in canonical lowercase
/// 0x form, rendered as 0x-prefixed hex. Computable by every validator
/// without querying the external chain.
pub fn deposit_record_id(contract: &EthAddress, index: u64) -> String {
    let input = format!("{:?}-{}", contract, index);
    let hash = Sha256::digest(input.as_bytes());
    format!("0x{}", hex::encode(hash))
}

/// Normalize a deposit recipient to bech32 form.
///
/// Deposits placed on the L2 contract carry the recipient as a free-form
/// string; some senders supply `b52` + hex payload instead of bech32.
/// Valid bech32 with the right prefix passes through unchanged, the hex form
/// is re-encoded, anything else is rejected.
pub fn normalize_host_address(recipient: &str) -> BridgeResult<String> {
    if let Ok((hrp, _, _)) = bech32::decode(recipient) {
        if hrp == HOST_ADDRESS_HRP {
            return Ok(recipient.to_string());
        }
    }

    let lowered = recipient.to_ascii_lowercase();
    if let Some(hex_part) = lowered.strip_prefix(HOST_ADDRESS_HRP) {
        if !hex_part.is_empty() && hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            let bytes = hex::decode(hex_part)
                .map_err(|e| BridgeError::InvalidRecipient(format!("bad hex payload: {}", e)))?;
            return bech32::encode(HOST_ADDRESS_HRP, bytes.to_base32(), Variant::Bech32)
                .map_err(|e| BridgeError::InvalidRecipient(format!("bech32 encode: {}", e)));
        }
    }

    Err(BridgeError::InvalidRecipient(format!(
        "not valid bech32 or hex: {}",
        recipient
    )))
}

/// Decode the payload bytes of a host address (either accepted encoding).
pub fn host_address_bytes(recipient: &str) -> BridgeResult<Vec<u8>> {
    let normalized = normalize_host_address(recipient)?;
    let (_, data, _) = bech32::decode(&normalized)
        .map_err(|e| BridgeError::InvalidRecipient(format!("bech32 decode: {}", e)))?;
    Vec::<u8>::from_base32(&data)
        .map_err(|e| BridgeError::InvalidRecipient(format!("bech32 payload: {}", e)))
}

/// Validate a withdrawal destination: `0x` + 40 hex characters, parseable as
/// an Ethereum address.
pub fn validate_external_address(destination: &str) -> BridgeResult<EthAddress> {
    if !destination.starts_with("0x") || destination.len() != 42 {
        return Err(BridgeError::InvalidDestination(format!(
            "must be 0x + 40 hex characters: {}",
            destination
        )));
    }
    destination
        .parse::<EthAddress>()
        .map_err(|_| BridgeError::InvalidDestination(destination.to_string()))
}

/// Format a withdrawal nonce sequence value as the fixed-width hex value the
/// L2 contract uses for replay protection.
pub fn format_withdrawal_nonce(seq: u64) -> String {
    format!("0x{:064x}", seq)
}

/// Lifecycle of a withdrawal request: pending → signed → completed, no
/// backward transitions. Cancel-free since the burn happens at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Signed,
    Completed,
}

impl std::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithdrawalStatus::Pending => write!(f, "pending"),
            WithdrawalStatus::Signed => write!(f, "signed"),
            WithdrawalStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A burn-and-authorize withdrawal request.
///
/// `destination` and `amount` are immutable after creation; `status` and
/// `signature` are mutated only by the signing step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    /// Unique 256-bit nonce, `0x` + 64 hex, also the contract replay nonce.
    pub nonce: String,
    /// Host chain account that burned the funds.
    pub owner: String,
    /// External chain address that may claim the funds.
    pub destination: String,
    pub amount: u64,
    pub status: WithdrawalStatus,
    /// 65-byte recoverable secp256k1 signature once signed.
    pub signature: Option<Vec<u8>>,
    /// Consensus time (unix seconds) the request was created.
    pub created_at: u64,
    /// Consensus time the external claim was recorded, 0 until completed.
    pub completed_at: u64,
}
