// Copyright (c) Tablechain, Inc.
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Errors produced by the settlement bridge.
///
/// Three classes with very different handling:
/// - transient infrastructure errors (`TransientProviderError`, `RpcTimeout`)
///   never reach chain state; callers log them and try again next block;
/// - deterministic data-validity errors on an external record
///   (`InvalidRecipient`, `ZeroValueDeposit`, `DepositAmountOverflow`) are
///   converted by the ingestion paths into recorded skips so every validator
///   moves the cursor identically;
/// - user-input errors at entry points are rejected synchronously with no
///   state mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    // Transient Ethereum provider error, safe to retry next block
    #[error("transient provider error: {0}")]
    TransientProviderError(String),
    // Provider answered but the response is unusable
    #[error("provider error: {0}")]
    ProviderError(String),
    // The bounded per-call RPC timeout elapsed
    #[error("rpc call timed out after {0}s")]
    RpcTimeout(u64),
    // Connected to a chain with an unexpected chain id
    #[error("chain id mismatch: expected {expected}, got {actual}")]
    ChainIdMismatch { expected: u64, actual: u64 },

    // Recipient on a deposit record is neither bech32 nor recognizable hex
    #[error("invalid recipient address: {0}")]
    InvalidRecipient(String),
    // Zero-value deposits are never credited
    #[error("zero value deposit")]
    ZeroValueDeposit,
    // Amount does not fit the host chain's u64 balances
    #[error("deposit amount overflows u64: {0}")]
    DepositAmountOverflow(String),
    // Ledger refused the credit
    #[error("ledger error: {0}")]
    LedgerError(String),

    // Deposit at this index was already credited or skipped
    #[error("deposit already processed: {0}")]
    DepositAlreadyProcessed(String),
    // Manual processing asked for an index the contract does not have
    #[error("deposit index {index} not found at external height {height}")]
    DepositNotFound { index: u64, height: u64 },

    // Withdrawal destination is not a 0x-prefixed 20-byte address
    #[error("invalid destination address: {0}")]
    InvalidDestination(String),
    // Withdrawal amount must be positive
    #[error("withdrawal amount must be greater than zero")]
    InvalidAmount,
    // Owner balance cannot cover the burn
    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientFunds { have: u64, need: u64 },
    // No withdrawal request stored under this nonce
    #[error("withdrawal request not found: {0}")]
    WithdrawalNotFound(String),
    // Completion requires a prior signature
    #[error("withdrawal must be signed before completion (current status: {0})")]
    WithdrawalNotSigned(String),
    // Signer key is not 32 hex-decodable bytes
    #[error("invalid signer key: {0}")]
    InvalidSignerKey(String),
    // Signing backend failure
    #[error("signing failed: {0}")]
    SigningError(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl BridgeError {
    /// Short stable string identifying the error type, used for metrics labels.
    pub fn error_type(&self) -> &'static str {
        match self {
            BridgeError::TransientProviderError(_) => "transient_provider_error",
            BridgeError::ProviderError(_) => "provider_error",
            BridgeError::RpcTimeout(_) => "rpc_timeout",
            BridgeError::ChainIdMismatch { .. } => "chain_id_mismatch",
            BridgeError::InvalidRecipient(_) => "invalid_recipient",
            BridgeError::ZeroValueDeposit => "zero_value_deposit",
            BridgeError::DepositAmountOverflow(_) => "deposit_amount_overflow",
            BridgeError::LedgerError(_) => "ledger_error",
            BridgeError::DepositAlreadyProcessed(_) => "deposit_already_processed",
            BridgeError::DepositNotFound { .. } => "deposit_not_found",
            BridgeError::InvalidDestination(_) => "invalid_destination",
            BridgeError::InvalidAmount => "invalid_amount",
            BridgeError::InsufficientFunds { .. } => "insufficient_funds",
            BridgeError::WithdrawalNotFound(_) => "withdrawal_not_found",
            BridgeError::WithdrawalNotSigned(_) => "withdrawal_not_signed",
            BridgeError::InvalidSignerKey(_) => "invalid_signer_key",
            BridgeError::SigningError(_) => "signing_error",
            BridgeError::InternalError(_) => "internal_error",
        }
    }

    /// Transient errors must never become consensus-visible; ingestion paths
    /// treat them as "do nothing this block".
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BridgeError::TransientProviderError(_)
                | BridgeError::ProviderError(_)
                | BridgeError::RpcTimeout(_)
        )
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_type_labels_are_valid_prometheus_labels() {
        let errors = vec![
            BridgeError::TransientProviderError("x".to_string()),
            BridgeError::ProviderError("x".to_string()),
            BridgeError::RpcTimeout(10),
            BridgeError::ChainIdMismatch {
                expected: 8453,
                actual: 1,
            },
            BridgeError::InvalidRecipient("x".to_string()),
            BridgeError::ZeroValueDeposit,
            BridgeError::DepositAmountOverflow("x".to_string()),
            BridgeError::LedgerError("x".to_string()),
            BridgeError::DepositAlreadyProcessed("0xabc".to_string()),
            BridgeError::DepositNotFound {
                index: 7,
                height: 100,
            },
            BridgeError::InvalidDestination("x".to_string()),
            BridgeError::InvalidAmount,
            BridgeError::InsufficientFunds { have: 1, need: 2 },
            BridgeError::WithdrawalNotFound("0x1".to_string()),
            BridgeError::WithdrawalNotSigned("pending".to_string()),
            BridgeError::InvalidSignerKey("x".to_string()),
            BridgeError::SigningError("x".to_string()),
            BridgeError::InternalError("x".to_string()),
        ];

        for error in errors {
            let label = error.error_type();
            assert!(!label.is_empty());
            for c in label.chars() {
                assert!(
                    c.is_ascii_lowercase() || c == '_',
                    "label '{}' contains invalid character '{}'",
                    label,
                    c
                );
            }
            assert!(!label.starts_with('_'));
            assert!(!label.ends_with('_'));
        }
    }

    #[test]
    fn test_transient_classification() {
        assert!(BridgeError::TransientProviderError("boom".to_string()).is_transient());
        assert!(BridgeError::RpcTimeout(10).is_transient());
        assert!(BridgeError::ProviderError("bad response".to_string()).is_transient());

        // Data-validity and user-input errors are not transient: the engine
        // must convert them into recorded skips, never retry them.
        assert!(!BridgeError::ZeroValueDeposit.is_transient());
        assert!(!BridgeError::InvalidRecipient("???".to_string()).is_transient());
        assert!(!BridgeError::InsufficientFunds { have: 0, need: 1 }.is_transient());
    }

    #[test]
    fn test_error_type_payload_independence() {
        let err1 = BridgeError::TransientProviderError("short".to_string());
        let err2 = BridgeError::TransientProviderError("a much longer message".to_string());
        assert_eq!(err1.error_type(), err2.error_type());
    }

    #[test]
    fn test_display_messages() {
        let err = BridgeError::InsufficientFunds {
            have: 100,
            need: 500_000,
        };
        assert_eq!(
            err.to_string(),
            "insufficient balance: have 100, need 500000"
        );

        let err = BridgeError::DepositNotFound {
            index: 7,
            height: 4242,
        };
        assert!(err.to_string().contains("index 7"));
        assert!(err.to_string().contains("height 4242"));
    }
}
