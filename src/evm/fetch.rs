use alloy::primitives::Address;
use alloy::sol_types::SolCall;
use tracing::debug;

use crate::error::ChainError;
use crate::group::{Erc20Call, EvmChainGroup};
use crate::model::{BalanceMap, TokenKey};

use super::IERC20;
use super::client::EvmRpc;
use super::lockbox;
use super::multicall::{self, BatchCall};

/// Balances of one EVM chain group plus the keys that still need a
/// per-token query.
#[derive(Debug, Default)]
pub struct GroupOutcome {
    pub balances: BalanceMap,
    pub unresolved: Vec<TokenKey>,
}

/// Fetch one EVM chain group: resolve lockboxes (if any), then one
/// `balanceOf` batch covering plain and resolved tokens.
///
/// An `Err` means the balance batch itself failed and nothing on this chain
/// was fetched; the caller falls back per token for the whole group.
pub async fn fetch_group(
    client: &dyn EvmRpc,
    group: &EvmChainGroup,
    holder: Address,
) -> Result<GroupOutcome, ChainError> {
    let chain = group.chain.name.as_str();

    let resolution =
        lockbox::resolve_lockboxes(client, chain, group.batch_contract, &group.lockbox_calls).await;

    let balance_calls: Vec<&Erc20Call> = group
        .erc20_calls
        .iter()
        .chain(resolution.resolved.iter())
        .collect();
    let requests: Vec<BatchCall> = balance_calls
        .iter()
        .map(|c| BatchCall::new(c.address, IERC20::balanceOfCall { account: holder }))
        .collect();

    let results = multicall::aggregate(client, chain, group.batch_contract, &requests).await?;

    let mut balances = BalanceMap::new();
    for (call, result) in balance_calls.iter().zip(&results) {
        let Some(data) = result.data() else {
            debug!(chain, key = %call.key, "balanceOf reverted");
            continue;
        };
        match IERC20::balanceOfCall::abi_decode_returns(data) {
            Ok(amount) => {
                balances.insert(call.key.clone(), amount);
            }
            Err(e) => debug!(chain, key = %call.key, "undecodable balanceOf result: {e}"),
        }
    }

    debug!(
        chain,
        batched = requests.len(),
        resolved = balances.len(),
        unresolved = resolution.unresolved.len(),
        "evm group fetched"
    );

    Ok(GroupOutcome {
        balances,
        unresolved: resolution.unresolved,
    })
}
