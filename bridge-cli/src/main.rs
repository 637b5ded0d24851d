// Copyright (c) Tablechain, Inc.
// SPDX-License-Identifier: Apache-2.0

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::sync::Arc;
use tablechain_bridge::config::Config;
use tablechain_bridge::crypto::{parse_withdrawal_nonce, WithdrawalSigner};
use tablechain_bridge::eth_client::{EthClient, ExternalChainReader};
use tablechain_bridge::metrics::BridgeMetrics;
use tablechain_bridge::types::{format_withdrawal_nonce, validate_external_address};
use tablechain_bridge::utils::{examine_validator_key, generate_validator_key_and_write_to_file};
use tablechain_bridge::BridgeConfig;
use tablechain_bridge_cli::{Args, BridgeCommand};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    match args.command {
        BridgeCommand::CreateValidatorKey { path } => {
            let address = generate_validator_key_and_write_to_file(&path)?;
            println!("Validator key written to {}", path.display());
            println!("Ethereum address: {:?}", address);
        }
        BridgeCommand::ExamineKey { path } => {
            let address = examine_validator_key(&path)?;
            println!("Ethereum address: {:?}", address);
        }
        BridgeCommand::SafeHeight {
            config_path,
            block_time,
        } => {
            let config = BridgeConfig::load(&config_path).context("couldn't load bridge config")?;
            let clock = config.height_clock();
            println!("estimated tip: {}", clock.estimated_height(block_time));
            println!("safe height:   {}", clock.safe_height(block_time));
        }
        BridgeCommand::ViewDeposit {
            config_path,
            index,
            height,
        } => {
            let client = connect(&config_path).await?;
            match client.deposit_at_index(index, height).await? {
                Some(record) => {
                    println!("index:    {}", record.index);
                    println!("account:  {}", record.account);
                    println!("amount:   {}", record.amount);
                    println!("height:   {}", record.at_height);
                }
                None => println!("no deposit record at index {}", index),
            }
        }
        BridgeCommand::HighestIndex {
            config_path,
            height,
        } => {
            let client = connect(&config_path).await?;
            let highest = client.highest_deposit_index(height).await?;
            println!("highest deposit index: {}", highest);
        }
        BridgeCommand::SignAuthorization {
            key_path,
            destination,
            amount,
            nonce,
        } => {
            let key_hex = std::fs::read_to_string(&key_path)
                .with_context(|| format!("couldn't read key from {}", key_path.display()))?;
            let signer = WithdrawalSigner::from_hex(key_hex.trim())
                .map_err(|e| anyhow!("invalid key: {}", e))?;

            let destination = validate_external_address(&destination)
                .map_err(|e| anyhow!("invalid destination: {}", e))?;
            let nonce_hex = if nonce.starts_with("0x") {
                nonce
            } else {
                let seq: u64 = nonce.parse().context("nonce must be 0x hex or a number")?;
                format_withdrawal_nonce(seq)
            };
            let nonce_bytes =
                parse_withdrawal_nonce(&nonce_hex).map_err(|e| anyhow!("invalid nonce: {}", e))?;

            let signature = signer
                .sign_withdrawal(&destination, amount, &nonce_bytes)
                .map_err(|e| anyhow!("signing failed: {}", e))?;
            println!("signer:    {:?}", signer.eth_address());
            println!("nonce:     {}", nonce_hex);
            println!("signature: 0x{}", hex::encode(signature));
        }
    }

    Ok(())
}

async fn connect(config_path: &std::path::Path) -> Result<EthClient<ethers::providers::Http>> {
    let config = BridgeConfig::load(config_path).context("couldn't load bridge config")?;
    let metrics = Arc::new(BridgeMetrics::new_for_testing());
    EthClient::new(&config, metrics)
        .await
        .map_err(|e| anyhow!("failed to connect to L2: {}", e))
}
