use std::sync::Arc;

use alloy_primitives::{Address, TxHash, U256};
use alloy_provider::DynProvider;
use alloy_sol_types::sol;
use anyhow::anyhow;
use async_trait::async_trait;
use opentelemetry::KeyValue;
use tracing::warn;

use crate::metrics::Metrics;
use crate::models::errors::ChainError;
use crate::utils::retry::{RetryConfig, retry};

sol! {
    #[sol(rpc)]
    interface IERC721 {
        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);

        function tokenURI(uint256 tokenId) external view returns (string memory);
        function burn(uint256 tokenId) external;
        function transferFrom(address from, address to, uint256 tokenId) external;
    }
}

/// Chain-side operations on an ERC-721 contract. The workflow and the burn
/// strategy depend on this seam so they can run against a mock in tests.
#[async_trait]
pub trait TokenContract: Send + Sync {
    /// Read the token's metadata locator.
    async fn token_uri(&self, contract: Address, token_id: U256) -> Result<String, ChainError>;

    /// Call the contract's native single-token destruction method.
    async fn burn(&self, contract: Address, token_id: U256) -> Result<TxHash, ChainError>;

    /// Transfer the token out of the monitored wallet.
    async fn transfer(
        &self,
        contract: Address,
        from: Address,
        to: Address,
        token_id: U256,
    ) -> Result<TxHash, ChainError>;

    /// Whether a signing credential was configured at startup. Write calls
    /// fail with `ChainError::NoSigner` when this is false.
    fn has_signer(&self) -> bool;
}

/// `TokenContract` backed by an alloy provider. Reads are retried with the
/// usual backoff; writes are single-shot since a transaction that reverts
/// will not succeed on a resend.
pub struct RpcTokenClient {
    provider: DynProvider,
    has_signer: bool,
    retry_config: RetryConfig,
    metrics: Option<Arc<Metrics>>,
}

impl RpcTokenClient {
    pub fn new(provider: DynProvider, has_signer: bool, metrics: Option<Arc<Metrics>>) -> Self {
        Self {
            provider,
            has_signer,
            retry_config: RetryConfig::default(),
            metrics,
        }
    }

    fn record_request(&self, method: &'static str, failed: bool) {
        if let Some(metrics) = &self.metrics {
            metrics
                .rpc_requests
                .add(1, &[KeyValue::new("method", method)]);
            if failed {
                metrics.rpc_errors.add(1, &[KeyValue::new("method", method)]);
            }
        }
    }
}

#[async_trait]
impl TokenContract for RpcTokenClient {
    async fn token_uri(&self, contract: Address, token_id: U256) -> Result<String, ChainError> {
        let erc721 = IERC721::new(contract, self.provider.clone());

        retry(
            || async {
                let result = erc721.tokenURI(token_id).call().await;
                self.record_request("token_uri", result.is_err());
                result.map_err(|e| {
                    warn!("tokenURI call failed for {contract}#{token_id}: {e}");
                    anyhow!("{e}")
                })
            },
            &self.retry_config,
            "token_uri",
        )
        .await
        .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn burn(&self, contract: Address, token_id: U256) -> Result<TxHash, ChainError> {
        if !self.has_signer {
            return Err(ChainError::NoSigner);
        }

        let erc721 = IERC721::new(contract, self.provider.clone());
        let pending = erc721
            .burn(token_id)
            .send()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        self.record_request("burn", false);

        pending
            .watch()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn transfer(
        &self,
        contract: Address,
        from: Address,
        to: Address,
        token_id: U256,
    ) -> Result<TxHash, ChainError> {
        if !self.has_signer {
            return Err(ChainError::NoSigner);
        }

        let erc721 = IERC721::new(contract, self.provider.clone());
        let pending = erc721
            .transferFrom(from, to, token_id)
            .send()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        self.record_request("transfer_from", false);

        pending
            .watch()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    fn has_signer(&self) -> bool {
        self.has_signer
    }
}
