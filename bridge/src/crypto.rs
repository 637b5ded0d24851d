// Copyright (c) Tablechain, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Withdrawal authorization signing.
//!
//! The L2 bridge contract releases funds against a signature over
//! `keccak256(destination ‖ amount ‖ nonce)` re-hashed with the standard
//! Ethereum signed-message prefix. The byte layout here must match the
//! contract's packed-encoding verification exactly; the signature is the only
//! artifact a user needs to claim externally.

use crate::error::{BridgeError, BridgeResult};
use ethers::core::k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use ethers::core::k256::elliptic_curve::sec1::ToEncodedPoint;
use ethers::types::{Address as EthAddress, H256, U256};
use ethers::utils::keccak256;

/// EIP-191 prefix for a 32-byte payload, as `eth_sign` and the contract's
/// signed-message helper apply it.
pub const ETH_SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Recoverable signature length: r (32) ‖ s (32) ‖ v (1).
pub const WITHDRAWAL_SIGNATURE_LENGTH: usize = 65;

/// Parse a `0x` + 64 hex withdrawal nonce into its 32-byte form.
pub fn parse_withdrawal_nonce(nonce: &str) -> BridgeResult<H256> {
    nonce
        .parse::<H256>()
        .map_err(|e| BridgeError::SigningError(format!("invalid nonce {}: {}", nonce, e)))
}

/// Packed message the contract verifies: destination (20) ‖ amount as
/// 32-byte big-endian ‖ nonce (32). No padding between fields.
pub fn withdrawal_auth_message(destination: &EthAddress, amount: u64, nonce: &H256) -> Vec<u8> {
    let mut amount_bytes = [0u8; 32];
    U256::from(amount).to_big_endian(&mut amount_bytes);

    let mut message = Vec::with_capacity(20 + 32 + 32);
    message.extend_from_slice(destination.as_bytes());
    message.extend_from_slice(&amount_bytes);
    message.extend_from_slice(nonce.as_bytes());
    message
}

/// Digest actually signed: the packed message hashed, then re-hashed under
/// the signed-message prefix.
pub fn withdrawal_auth_hash(destination: &EthAddress, amount: u64, nonce: &H256) -> [u8; 32] {
    let inner = keccak256(withdrawal_auth_message(destination, amount, nonce));
    let mut prefixed = Vec::with_capacity(ETH_SIGNED_MESSAGE_PREFIX.len() + 32);
    prefixed.extend_from_slice(ETH_SIGNED_MESSAGE_PREFIX);
    prefixed.extend_from_slice(&inner);
    keccak256(prefixed)
}

/// The validator's withdrawal signing key.
///
/// A single key by design; hardening to an m-of-n aggregate would replace
/// this type without changing the entry-point contracts.
pub struct WithdrawalSigner {
    key: SigningKey,
}

impl WithdrawalSigner {
    /// Parse a hex private key (0x prefix optional, 64 hex chars required).
    pub fn from_hex(key_hex: &str) -> BridgeResult<Self> {
        let stripped = key_hex.strip_prefix("0x").unwrap_or(key_hex);
        if stripped.len() != 64 {
            return Err(BridgeError::InvalidSignerKey(format!(
                "expected 64 hex characters, got {}",
                stripped.len()
            )));
        }
        let bytes = hex::decode(stripped)
            .map_err(|e| BridgeError::InvalidSignerKey(format!("bad hex: {}", e)))?;
        let key = SigningKey::from_slice(&bytes)
            .map_err(|e| BridgeError::InvalidSignerKey(e.to_string()))?;
        Ok(Self { key })
    }

    /// Ethereum address of the signing key, as the contract stores it.
    pub fn eth_address(&self) -> EthAddress {
        public_key_to_eth_address(self.key.verifying_key())
    }

    /// Produce the 65-byte recoverable authorization signature.
    ///
    /// RFC 6979 deterministic nonces make this reproducible: signing the same
    /// request twice yields identical bytes. The recovery byte is normalized
    /// to 27/28 as Ethereum verifiers expect.
    pub fn sign_withdrawal(
        &self,
        destination: &EthAddress,
        amount: u64,
        nonce: &H256,
    ) -> BridgeResult<Vec<u8>> {
        let digest = withdrawal_auth_hash(destination, amount, nonce);
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&digest)
            .map_err(|e| BridgeError::SigningError(e.to_string()))?;

        let mut bytes = Vec::with_capacity(WITHDRAWAL_SIGNATURE_LENGTH);
        bytes.extend_from_slice(signature.to_bytes().as_slice());
        bytes.push(27 + recovery_id.to_byte());
        Ok(bytes)
    }
}

/// Recover the signer address from a 65-byte authorization signature. Used by
/// tests and tooling to check a signature against the contract's formula.
pub fn recover_withdrawal_signer(
    destination: &EthAddress,
    amount: u64,
    nonce: &H256,
    signature: &[u8],
) -> BridgeResult<EthAddress> {
    if signature.len() != WITHDRAWAL_SIGNATURE_LENGTH {
        return Err(BridgeError::SigningError(format!(
            "expected {} signature bytes, got {}",
            WITHDRAWAL_SIGNATURE_LENGTH,
            signature.len()
        )));
    }
    let v = signature[64];
    let recovery_byte = if v >= 27 { v - 27 } else { v };
    let recovery_id = RecoveryId::from_byte(recovery_byte)
        .ok_or_else(|| BridgeError::SigningError(format!("invalid recovery byte {}", v)))?;
    let ecdsa_signature = EcdsaSignature::from_slice(&signature[..64])
        .map_err(|e| BridgeError::SigningError(e.to_string()))?;

    let digest = withdrawal_auth_hash(destination, amount, nonce);
    let verifying_key = VerifyingKey::recover_from_prehash(&digest, &ecdsa_signature, recovery_id)
        .map_err(|e| BridgeError::SigningError(format!("recovery failed: {}", e)))?;
    Ok(public_key_to_eth_address(&verifying_key))
}

fn public_key_to_eth_address(key: &VerifyingKey) -> EthAddress {
    let encoded = key.to_encoded_point(false);
    // Skip the 0x04 uncompressed prefix, hash the 64 coordinate bytes
    let hash = keccak256(&encoded.as_bytes()[1..]);
    EthAddress::from_slice(&hash[12..])
}
