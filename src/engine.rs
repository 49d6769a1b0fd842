//! Orchestrates one balance fetch across every chain and protocol family.

use std::sync::Arc;
use std::time::Instant;

use alloy::primitives::Address;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::ChainError;
use crate::evm;
use crate::fallback::{self, FallbackFetcher, RpcFallback};
use crate::group::{self, EvmChainGroup, FetchPlan, SealevelChainGroup};
use crate::model::balance::{self, PartialBalances};
use crate::model::{BalanceMap, HolderAddresses, ProtocolFamily, TokenDescriptor};
use crate::pool::ConnectionPool;
use crate::sealevel;

/// Entry point of the balance aggregation engine.
///
/// Cheap to clone; every clone shares the same connection pool.
#[derive(Clone)]
pub struct BalanceEngine {
    pool: Arc<ConnectionPool>,
    fallback: Arc<dyn FallbackFetcher>,
}

impl BalanceEngine {
    /// Engine whose fallback path queries through the same pool.
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        let fallback = Arc::new(RpcFallback::new(pool.clone()));
        BalanceEngine { pool, fallback }
    }

    pub fn with_fallback(pool: Arc<ConnectionPool>, fallback: Arc<dyn FallbackFetcher>) -> Self {
        BalanceEngine { pool, fallback }
    }

    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// Classify, group and plan without touching the network.
    pub fn plan(&self, tokens: &[TokenDescriptor], holders: &HolderAddresses) -> FetchPlan {
        group::plan_fetch(tokens, self.pool.registry(), holders)
    }

    /// Fetch every balance that can be fetched.
    ///
    /// Never fails. Tokens whose balance could not be determined are simply
    /// missing from the returned map; families without a holder address are
    /// skipped.
    pub async fn fetch_balances(&self, tokens: &[TokenDescriptor], holders: &HolderAddresses) -> BalanceMap {
        let started = Instant::now();
        let plan = self.plan(tokens, holders);
        debug!(
            evm_groups = plan.evm_groups.len(),
            sealevel_groups = plan.sealevel_groups.len(),
            fallback = plan.fallback.len(),
            "fetch planned"
        );

        let mut tasks: JoinSet<PartialBalances> = JoinSet::new();
        let task_count = plan.task_count();

        if !plan.evm_groups.is_empty() {
            if let Some(holder) = evm_holder(holders) {
                for group in plan.evm_groups {
                    let engine = self.clone();
                    tasks.spawn(async move { Ok(engine.run_evm_group(group, holder).await) });
                }
            }
        }

        if let Some(owner) = holders.get(ProtocolFamily::Sealevel) {
            for group in plan.sealevel_groups {
                let owner = owner.to_string();
                let engine = self.clone();
                tasks.spawn(async move { engine.run_sealevel_group(group, owner).await });
            }
        }

        for token in plan.fallback {
            let Some(holder) = holders.get(token.protocol) else {
                continue;
            };
            let holder = holder.to_string();
            let fetcher = self.fallback.clone();
            tasks.spawn(async move { fallback::fetch_one(fetcher.as_ref(), &token, &holder).await });
        }

        let mut partials = Vec::with_capacity(task_count);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(partial) => partials.push(partial),
                Err(e) => warn!("balance task aborted: {e}"),
            }
        }
        let balances = balance::merge_partials(partials);

        info!(
            tokens = tokens.len(),
            tasks = task_count,
            balances = balances.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "balance fetch complete"
        );
        balances
    }

    /// One EVM chain group. A chain-level failure sends every token of the
    /// group through the fallback path; unresolved lockboxes go there too.
    async fn run_evm_group(&self, group: EvmChainGroup, holder: Address) -> BalanceMap {
        let chain = group.chain.name.clone();
        let holder_str = Arc::<str>::from(format!("{holder}"));

        let outcome = match self.pool.evm(&group.chain) {
            Ok(client) => evm::fetch::fetch_group(client.as_ref(), &group, holder).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(outcome) => {
                let mut balances = outcome.balances;
                if !outcome.unresolved.is_empty() {
                    let retry: Vec<TokenDescriptor> = group
                        .tokens
                        .into_iter()
                        .filter(|t| outcome.unresolved.contains(&t.key()))
                        .collect();
                    debug!(chain = %chain, tokens = retry.len(), "unresolved lockboxes to fallback");
                    let fetched = fallback::fetch_many(self.fallback.clone(), retry, holder_str).await;
                    balance::extend_balances(&mut balances, fetched);
                }
                balances
            }
            Err(e) => {
                warn!(chain = %chain, tokens = group.tokens.len(), "batch failed, falling back per token: {e}");
                fallback::fetch_many(self.fallback.clone(), group.tokens, holder_str).await
            }
        }
    }

    async fn run_sealevel_group(&self, group: SealevelChainGroup, owner: String) -> PartialBalances {
        if group.is_empty() {
            return Ok(BalanceMap::new());
        }
        let client = self.pool.sealevel(&group.chain)?;
        Ok(sealevel::fetch::fetch_group(client.as_ref(), &group, &owner).await)
    }
}

fn evm_holder(holders: &HolderAddresses) -> Option<Address> {
    let raw = holders.get(ProtocolFamily::Evm)?;
    match raw.parse() {
        Ok(address) => Some(address),
        Err(_) => {
            let e = ChainError::InvalidHolder {
                address: raw.to_string(),
                family: ProtocolFamily::Evm.to_string(),
            };
            warn!("skipping evm chain groups: {e}");
            None
        }
    }
}
