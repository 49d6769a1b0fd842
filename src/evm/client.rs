use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::http::reqwest;
use async_trait::async_trait;

use crate::error::ChainError;
use crate::model::ChainMetadata;

/// The two read calls the balance engine needs from an EVM chain.
#[async_trait]
pub trait EvmRpc: Send + Sync {
    /// `eth_call` at the latest block.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError>;

    /// `eth_getBalance` at the latest block.
    async fn native_balance(&self, holder: Address) -> Result<U256, ChainError>;
}

// ── Provider-backed client ───────────────────────────────────────────

/// alloy HTTP provider for one chain.
pub struct AlloyEvmClient {
    chain: String,
    provider: DynProvider,
}

impl AlloyEvmClient {
    pub fn connect(chain: &ChainMetadata) -> Result<Self, ChainError> {
        let url = chain.rpc_url().ok_or_else(|| ChainError::NoRpcUrl {
            chain: chain.name.clone(),
        })?;
        let parsed: reqwest::Url = url.parse().map_err(|e| ChainError::InvalidRpcUrl {
            chain: chain.name.clone(),
            url: url.to_string(),
            reason: format!("{e}"),
        })?;
        let provider = ProviderBuilder::new().connect_http(parsed).erased();
        Ok(AlloyEvmClient {
            chain: chain.name.clone(),
            provider,
        })
    }
}

#[async_trait]
impl EvmRpc for AlloyEvmClient {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        let tx = TransactionRequest::default().with_to(to).with_input(data);
        self.provider
            .call(tx)
            .await
            .map_err(|e| ChainError::rpc(&self.chain, format!("eth_call to {to}: {e}")))
    }

    async fn native_balance(&self, holder: Address) -> Result<U256, ChainError> {
        self.provider
            .get_balance(holder)
            .await
            .map_err(|e| ChainError::rpc(&self.chain, format!("eth_getBalance: {e}")))
    }
}
