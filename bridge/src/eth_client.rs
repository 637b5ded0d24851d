// Copyright (c) Tablechain, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Read-only query layer against the L2 bridge contract.
//!
//! Every call carries a bounded timeout and maps all transport failures to
//! the transient error class: the block hooks swallow those and try again
//! next block, so an unreachable L2 endpoint can never halt the chain.

use crate::abi::BridgeDeposits;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::metrics::BridgeMetrics;
use crate::types::DepositRecord;
use async_trait::async_trait;
use ethers::providers::{Http, JsonRpcClient, Middleware, Provider};
use ethers::types::{Address as EthAddress, BlockId, U256};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Read-only view of the L2 deposit ledger.
///
/// The engine and scanner depend on this trait rather than on a concrete
/// client so tests can substitute a deterministic in-memory chain.
#[async_trait]
pub trait ExternalChainReader: Send + Sync {
    /// The deposit record at `index` as of `at_height` (current height when
    /// `None`), or `Ok(None)` if the contract has no record there yet.
    async fn deposit_at_index(
        &self,
        index: u64,
        at_height: Option<u64>,
    ) -> BridgeResult<Option<DepositRecord>>;

    /// Highest deposit index the contract has assigned as of `at_height`.
    /// Indices start at 1, so this equals the record count.
    async fn highest_deposit_index(&self, at_height: Option<u64>) -> BridgeResult<u64>;

    /// Current external block height.
    async fn block_number(&self) -> BridgeResult<u64>;
}

pub struct EthClient<P> {
    provider: Arc<Provider<P>>,
    contract: BridgeDeposits<Provider<P>>,
    contract_address: EthAddress,
    expected_chain_id: Option<u64>,
    rpc_timeout: Duration,
    metrics: Arc<BridgeMetrics>,
}

impl EthClient<Http> {
    /// Connect to the configured L2 endpoint and validate the chain id.
    pub async fn new(config: &BridgeConfig, metrics: Arc<BridgeMetrics>) -> BridgeResult<Self> {
        let provider = Provider::<Http>::try_from(config.l2_rpc_url.as_str()).map_err(|e| {
            BridgeError::InternalError(format!("invalid l2 rpc url {}: {}", config.l2_rpc_url, e))
        })?;
        let client = Self::from_provider(
            provider,
            config.contract_address()?,
            config.expected_chain_id,
            config.rpc_timeout(),
            metrics,
        );
        client.describe().await?;
        Ok(client)
    }
}

impl<P> EthClient<P>
where
    P: JsonRpcClient + 'static,
{
    pub fn from_provider(
        provider: Provider<P>,
        contract_address: EthAddress,
        expected_chain_id: Option<u64>,
        rpc_timeout: Duration,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        let provider = Arc::new(provider);
        let contract = BridgeDeposits::new(contract_address, provider.clone());
        Self {
            provider,
            contract,
            contract_address,
            expected_chain_id,
            rpc_timeout,
            metrics,
        }
    }

    pub fn contract_address(&self) -> EthAddress {
        self.contract_address
    }

    // Validate chain identifier and log connection info
    async fn describe(&self) -> BridgeResult<()> {
        let chain_id = self
            .timed("eth_chainId", self.provider.get_chainid())
            .await?
            .as_u64();
        if let Some(expected) = self.expected_chain_id {
            if chain_id != expected {
                return Err(BridgeError::ChainIdMismatch {
                    expected,
                    actual: chain_id,
                });
            }
            info!("EthClient connected to chain {} (verified)", chain_id);
        } else {
            warn!(
                "EthClient connected to chain {} (no expected chain id set)",
                chain_id
            );
        }
        Ok(())
    }

    /// Run an RPC future under the bounded timeout, recording latency and
    /// mapping every failure into the transient class.
    async fn timed<T, E, F>(&self, method: &str, fut: F) -> BridgeResult<T>
    where
        E: std::fmt::Display,
        F: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let result = tokio::time::timeout(self.rpc_timeout, fut).await;
        self.metrics
            .l2_rpc_latency
            .with_label_values(&[method])
            .observe(started.elapsed().as_secs_f64());

        let out = match result {
            Err(_) => Err(BridgeError::RpcTimeout(self.rpc_timeout.as_secs())),
            Ok(Err(e)) => Err(BridgeError::TransientProviderError(format!(
                "{}: {}",
                method, e
            ))),
            Ok(Ok(value)) => Ok(value),
        };
        if let Err(e) = &out {
            self.metrics
                .l2_rpc_errors
                .with_label_values(&[e.error_type()])
                .inc();
        }
        out
    }

    async fn resolve_height(&self, at_height: Option<u64>) -> BridgeResult<u64> {
        match at_height {
            Some(height) => Ok(height),
            None => self.block_number().await,
        }
    }
}

#[async_trait]
impl<P> ExternalChainReader for EthClient<P>
where
    P: JsonRpcClient + 'static,
{
    async fn deposit_at_index(
        &self,
        index: u64,
        at_height: Option<u64>,
    ) -> BridgeResult<Option<DepositRecord>> {
        let height = self.resolve_height(at_height).await?;
        let call = self
            .contract
            .deposits(U256::from(index))
            .block(BlockId::from(height));
        let (account, amount) = self.timed("eth_call/deposits", call.call()).await?;

        // The contract stores records in a mapping: a missing index decodes
        // to default values, never a revert.
        if account.is_empty() {
            debug!(index, height, "no deposit record at index");
            return Ok(None);
        }
        Ok(Some(DepositRecord {
            index,
            account,
            amount,
            at_height: height,
        }))
    }

    async fn highest_deposit_index(&self, at_height: Option<u64>) -> BridgeResult<u64> {
        let height = self.resolve_height(at_height).await?;
        let call = self.contract.deposit_count().block(BlockId::from(height));
        let count = self.timed("eth_call/depositCount", call.call()).await?;
        Ok(count.as_u64())
    }

    async fn block_number(&self) -> BridgeResult<u64> {
        let number = self
            .timed("eth_blockNumber", self.provider.get_block_number())
            .await?;
        Ok(number.as_u64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::abi::Token;
    use ethers::providers::MockProvider;
    use ethers::types::{Bytes, U64};

    fn mocked_client() -> (EthClient<MockProvider>, MockProvider) {
        let (provider, mock) = Provider::mocked();
        let client = EthClient::from_provider(
            provider,
            EthAddress::repeat_byte(0xcc),
            None,
            Duration::from_secs(1),
            Arc::new(BridgeMetrics::new_for_testing()),
        );
        (client, mock)
    }

    fn encode_deposit(account: &str, amount: u64) -> Bytes {
        Bytes::from(ethers::abi::encode(&[
            Token::String(account.to_string()),
            Token::Uint(U256::from(amount)),
        ]))
    }

    #[tokio::test]
    async fn test_deposit_at_index_found() {
        let (client, mock) = mocked_client();
        mock.push::<Bytes, _>(encode_deposit("b52testaccount", 1_000_000))
            .unwrap();

        let record = client.deposit_at_index(5, Some(777)).await.unwrap();
        let record = record.expect("record should exist");
        assert_eq!(record.index, 5);
        assert_eq!(record.account, "b52testaccount");
        assert_eq!(record.amount, U256::from(1_000_000u64));
        assert_eq!(record.at_height, 777);
    }

    #[tokio::test]
    async fn test_deposit_at_index_empty_account_is_not_found() {
        let (client, mock) = mocked_client();
        mock.push::<Bytes, _>(encode_deposit("", 0)).unwrap();

        let record = client.deposit_at_index(7, Some(777)).await.unwrap();
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn test_deposit_at_index_resolves_current_height() {
        let (client, mock) = mocked_client();
        // Responses pop LIFO: push eth_call result first, block number second
        mock.push::<Bytes, _>(encode_deposit("b52testaccount", 42))
            .unwrap();
        mock.push(U64::from(900)).unwrap();

        let record = client.deposit_at_index(1, None).await.unwrap().unwrap();
        assert_eq!(record.at_height, 900);
    }

    #[tokio::test]
    async fn test_rpc_error_maps_to_transient() {
        let (client, _mock) = mocked_client();
        // Nothing pushed: the mock provider errors out
        let err = client.deposit_at_index(1, Some(10)).await.unwrap_err();
        assert!(err.is_transient(), "unexpected error class: {:?}", err);
    }

    #[tokio::test]
    async fn test_highest_deposit_index() {
        let (client, mock) = mocked_client();
        mock.push::<Bytes, _>(Bytes::from(ethers::abi::encode(&[Token::Uint(U256::from(
            12u64,
        ))])))
        .unwrap();

        let highest = client.highest_deposit_index(Some(500)).await.unwrap();
        assert_eq!(highest, 12);
    }

    #[tokio::test]
    async fn test_block_number() {
        let (client, mock) = mocked_client();
        mock.push(U64::from(31_337)).unwrap();
        assert_eq!(client.block_number().await.unwrap(), 31_337);
    }

    #[tokio::test]
    async fn test_describe_chain_id_mismatch() {
        let (provider, mock) = Provider::mocked();
        let client = EthClient::from_provider(
            provider,
            EthAddress::repeat_byte(0xcc),
            Some(8453),
            Duration::from_secs(1),
            Arc::new(BridgeMetrics::new_for_testing()),
        );
        mock.push(U256::from(1u64)).unwrap();

        let err = client.describe().await.unwrap_err();
        assert_eq!(
            err,
            BridgeError::ChainIdMismatch {
                expected: 8453,
                actual: 1
            }
        );
    }
}
