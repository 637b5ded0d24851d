// Copyright (c) Tablechain, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Command definitions for the bridge operator CLI.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tablechain-bridge-cli", about = "Tablechain settlement bridge tooling")]
pub struct Args {
    #[command(subcommand)]
    pub command: BridgeCommand,
}

#[derive(Subcommand)]
pub enum BridgeCommand {
    /// Generate a validator withdrawal-signing key and write it to a file
    CreateValidatorKey {
        #[arg(long)]
        path: PathBuf,
    },
    /// Print the Ethereum address a validator key file signs as
    ExamineKey {
        #[arg(long)]
        path: PathBuf,
    },
    /// Compute the deterministic safe L2 query height for a block timestamp
    SafeHeight {
        #[arg(long)]
        config_path: PathBuf,
        /// Consensus block time, unix seconds
        #[arg(long)]
        block_time: u64,
    },
    /// Query a deposit record from the L2 bridge contract
    ViewDeposit {
        #[arg(long)]
        config_path: PathBuf,
        #[arg(long)]
        index: u64,
        /// External height to pin the query to (default: current)
        #[arg(long)]
        height: Option<u64>,
    },
    /// Query the highest deposit index the contract has assigned
    HighestIndex {
        #[arg(long)]
        config_path: PathBuf,
        #[arg(long)]
        height: Option<u64>,
    },
    /// Sign a withdrawal authorization offline
    SignAuthorization {
        /// Path to the validator key file
        #[arg(long)]
        key_path: PathBuf,
        /// Destination address on the external chain (0x + 40 hex)
        #[arg(long)]
        destination: String,
        #[arg(long)]
        amount: u64,
        /// Withdrawal nonce: either the 0x + 64 hex form or a plain sequence
        /// number
        #[arg(long)]
        nonce: String,
    },
}
