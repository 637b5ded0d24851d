// Copyright (c) Tablechain, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Settlement bridge between the Tablechain host chain and its
//! Ethereum-compatible L2.
//!
//! The host chain's state-machine engine embeds a [`BridgeModule`] and drives
//! it once per block via [`BridgeModule::end_block`]; users reach it through
//! the entry points on the same type. All state mutation is deterministic:
//! the only network I/O (the [`eth_client`] reader) sits below the layer
//! where state is touched, and every data-dependent failure is recorded as a
//! deterministic skip rather than retried.

pub mod abi;
pub mod config;
pub mod crypto;
pub mod deposit_scanner;
pub mod deposit_sync;
pub mod error;
pub mod eth_client;
pub mod events;
pub mod finality;
pub mod handler;
pub mod metrics;
pub mod store;
pub mod types;
pub mod utils;
pub mod withdrawal;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeResult};
pub use handler::BridgeModule;
pub use store::{Bank, BlockCtx, BridgeStore, SyncCursor};
pub use types::{DepositRecord, WithdrawalRequest, WithdrawalStatus};
