//! Per-token balance queries for everything the batch paths could not cover.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::classify::{self, EvmStrategy, SealevelStrategy};
use crate::error::ChainError;
use crate::evm::{EvmRpc, IERC20, ITokenRouter};
use crate::model::balance::{self, PartialBalances};
use crate::model::{BalanceMap, ProtocolFamily, TokenDescriptor};
use crate::pool::ConnectionPool;
use crate::sealevel::AccountFilter;

/// Balance of a single token, queried on its own.
#[async_trait]
pub trait FallbackFetcher: Send + Sync {
    async fn balance_of(&self, token: &TokenDescriptor, holder: &str) -> Result<U256, ChainError>;
}

// ── RPC-backed fallback ──────────────────────────────────────────────

/// Queries each token directly through the connection pool.
pub struct RpcFallback {
    pool: Arc<ConnectionPool>,
}

impl RpcFallback {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        RpcFallback { pool }
    }

    async fn evm_balance(&self, token: &TokenDescriptor, holder: &str) -> Result<U256, ChainError> {
        let chain = self.pool.chain(&token.chain)?;
        let holder: Address = holder.parse().map_err(|_| ChainError::InvalidHolder {
            address: holder.to_string(),
            family: ProtocolFamily::Evm.to_string(),
        })?;
        let client = self.pool.evm(chain)?;
        let name = chain.name.as_str();

        let target = match classify::classify_evm(token) {
            EvmStrategy::Native => return client.native_balance(holder).await,
            EvmStrategy::FungibleBatchable(address) => address,
            EvmStrategy::LockboxWrapped(router) => wrapped_token(client.as_ref(), name, router).await?,
            // Plain tokens without a batch strategy still answer balanceOf.
            EvmStrategy::Unsupported => token
                .collateral()
                .unwrap_or(&token.address)
                .trim()
                .parse()
                .map_err(|_| ChainError::UnsupportedToken {
                    key: token.key().to_string(),
                    family: ProtocolFamily::Evm.to_string(),
                })?,
        };

        balance_of(client.as_ref(), name, target, holder).await
    }

    async fn sealevel_balance(&self, token: &TokenDescriptor, holder: &str) -> Result<U256, ChainError> {
        let chain = self.pool.chain(&token.chain)?;
        let client = self.pool.sealevel(chain)?;

        match classify::classify_sealevel(token) {
            SealevelStrategy::Native => Ok(U256::from(client.native_balance(holder).await?)),
            SealevelStrategy::SplLike { mint, .. } => {
                let accounts = client
                    .token_accounts_by_owner(holder, AccountFilter::Mint(mint))
                    .await?;
                Ok(accounts
                    .iter()
                    .fold(U256::ZERO, |total, account| total.saturating_add(account.amount)))
            }
            SealevelStrategy::Unsupported => Err(ChainError::UnsupportedToken {
                key: token.key().to_string(),
                family: ProtocolFamily::Sealevel.to_string(),
            }),
        }
    }
}

#[async_trait]
impl FallbackFetcher for RpcFallback {
    async fn balance_of(&self, token: &TokenDescriptor, holder: &str) -> Result<U256, ChainError> {
        match token.protocol {
            ProtocolFamily::Evm => self.evm_balance(token, holder).await,
            ProtocolFamily::Sealevel => self.sealevel_balance(token, holder).await,
            ProtocolFamily::Other => Err(ChainError::UnsupportedToken {
                key: token.key().to_string(),
                family: ProtocolFamily::Other.to_string(),
            }),
        }
    }
}

async fn wrapped_token(client: &dyn EvmRpc, chain: &str, router: Address) -> Result<Address, ChainError> {
    let raw = client
        .call(router, ITokenRouter::wrappedTokenCall {}.abi_encode().into())
        .await?;
    ITokenRouter::wrappedTokenCall::abi_decode_returns(&raw)
        .map_err(|e| ChainError::decode(chain, "wrappedToken() result", e))
}

async fn balance_of(client: &dyn EvmRpc, chain: &str, token: Address, holder: Address) -> Result<U256, ChainError> {
    let raw = client
        .call(token, IERC20::balanceOfCall { account: holder }.abi_encode().into())
        .await?;
    IERC20::balanceOfCall::abi_decode_returns(&raw)
        .map_err(|e| ChainError::decode(chain, "balanceOf() result", e))
}

// ── Fan-out ──────────────────────────────────────────────────────────

/// Query one token, turning any failure into an empty contribution.
pub async fn fetch_one(fetcher: &dyn FallbackFetcher, token: &TokenDescriptor, holder: &str) -> PartialBalances {
    let key = token.key();
    let amount = fetcher.balance_of(token, holder).await?;
    debug!(%key, %amount, "fallback balance");
    Ok(BalanceMap::from([(key, amount)]))
}

/// Query every token concurrently, one task each, and merge.
pub async fn fetch_many(
    fetcher: Arc<dyn FallbackFetcher>,
    tokens: Vec<TokenDescriptor>,
    holder: Arc<str>,
) -> BalanceMap {
    let mut tasks = JoinSet::new();
    for token in tokens {
        let fetcher = fetcher.clone();
        let holder = holder.clone();
        tasks.spawn(async move { fetch_one(fetcher.as_ref(), &token, &holder).await });
    }

    let mut partials = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(partial) => partials.push(partial),
            Err(e) => warn!("fallback task aborted: {e}"),
        }
    }
    balance::merge_partials(partials)
}
