use std::collections::HashMap;

use alloy::primitives::U256;
use tracing::debug;

use crate::error::ChainError;
use crate::group::{MintRequest, SealevelChainGroup};
use crate::model::balance::{self, BalanceMap, PartialBalances};
use crate::model::TokenKey;

use super::{AccountFilter, SealevelRpc, TokenProgram};

/// Fetch every balance of one Sealevel chain group.
///
/// At most three calls run concurrently: one account listing per token
/// program present in the group and one native balance call. Each fails on
/// its own; a failure only empties that call's contribution.
pub async fn fetch_group(client: &dyn SealevelRpc, group: &SealevelChainGroup, owner: &str) -> BalanceMap {
    let chain = group.chain.name.as_str();

    let (legacy, token2022, native) = tokio::join!(
        list_program(client, chain, owner, TokenProgram::Legacy, group.mints(TokenProgram::Legacy)),
        list_program(client, chain, owner, TokenProgram::Token2022, group.mints(TokenProgram::Token2022)),
        native_balances(client, owner, &group.native_tokens),
    );

    balance::merge_partials([legacy, token2022, native])
}

async fn list_program(
    client: &dyn SealevelRpc,
    chain: &str,
    owner: &str,
    program: TokenProgram,
    requests: &[MintRequest],
) -> PartialBalances {
    if requests.is_empty() {
        return Ok(BalanceMap::new());
    }

    let by_mint = index_by_mint(requests);
    let accounts = client
        .token_accounts_by_owner(owner, AccountFilter::Program(program))
        .await?;
    debug!(chain, %program, accounts = accounts.len(), "token accounts listed");

    // Several accounts of one mint add up.
    let mut amounts: HashMap<&str, U256> = HashMap::new();
    for account in &accounts {
        if by_mint.contains_key(account.mint.as_str()) {
            let total = amounts.entry(account.mint.as_str()).or_default();
            *total = total.saturating_add(account.amount);
        }
    }

    let mut balances = BalanceMap::new();
    for (mint, amount) in amounts {
        for key in &by_mint[mint] {
            balances.insert(key.clone(), amount);
        }
    }
    Ok(balances)
}

/// Mint → every requested key backed by it. A plain SPL entry and a
/// collateral router over the same mint share one amount.
fn index_by_mint(requests: &[MintRequest]) -> HashMap<String, Vec<TokenKey>> {
    let mut by_mint: HashMap<String, Vec<TokenKey>> = HashMap::new();
    for request in requests {
        by_mint
            .entry(request.mint.to_string())
            .or_default()
            .push(request.key.clone());
    }
    by_mint
}

async fn native_balances(client: &dyn SealevelRpc, owner: &str, keys: &[TokenKey]) -> Result<BalanceMap, ChainError> {
    if keys.is_empty() {
        return Ok(BalanceMap::new());
    }
    let lamports = U256::from(client.native_balance(owner).await?);
    Ok(keys.iter().map(|key| (key.clone(), lamports)).collect())
}
