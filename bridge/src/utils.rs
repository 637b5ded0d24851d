// Copyright (c) Tablechain, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Validator key tooling.

use crate::crypto::WithdrawalSigner;
use anyhow::{anyhow, Result};
use ethers::core::k256::ecdsa::SigningKey;
use ethers::core::rand::thread_rng;
use ethers::types::Address as EthAddress;
use std::path::Path;

/// Generate a fresh secp256k1 validator signing key and write it hex-encoded
/// to `path`. Returns the Ethereum address the L2 contract must be
/// configured with.
pub fn generate_validator_key_and_write_to_file(path: &Path) -> Result<EthAddress> {
    let key = SigningKey::random(&mut thread_rng());
    let key_hex = hex::encode(key.to_bytes());

    let signer = WithdrawalSigner::from_hex(&key_hex)
        .map_err(|e| anyhow!("generated key failed to round-trip: {}", e))?;
    let address = signer.eth_address();

    std::fs::write(path, &key_hex)
        .map_err(|e| anyhow!("failed to write key to {:?}: {}", path, e))?;

    tracing::debug!("validator key written to {:?}", path);
    tracing::debug!("ethereum address: {:?}", address);
    Ok(address)
}

/// Read a hex validator key file and report the Ethereum address it signs as.
pub fn examine_validator_key(path: &Path) -> Result<EthAddress> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read key from {:?}: {}", path, e))?;
    let signer = WithdrawalSigner::from_hex(contents.trim())
        .map_err(|e| anyhow!("invalid key in {:?}: {}", path, e))?;
    Ok(signer.eth_address())
}
