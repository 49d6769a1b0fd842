//! First phase of fetching lockbox-wrapped tokens: find out which ERC20 each
//! router actually holds, so its balance can join the regular balance batch.

use alloy::primitives::Address;
use alloy::sol_types::SolCall;
use tracing::{debug, warn};

use crate::group::{Erc20Call, LockboxCall};
use crate::model::TokenKey;

use super::ITokenRouter;
use super::client::EvmRpc;
use super::multicall::{self, BatchCall};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct LockboxResolution {
    /// `balanceOf` targets for routers whose underlying token was found.
    pub resolved: Vec<Erc20Call>,
    /// Keys the batch path gave up on; these go to the fallback path.
    pub unresolved: Vec<TokenKey>,
}

/// Batch-call `wrappedToken()` on every router.
///
/// Never fails: a chain-level error marks every lockbox unresolved, a failed
/// or empty sub-call marks only its own key.
pub async fn resolve_lockboxes(
    client: &dyn EvmRpc,
    chain: &str,
    batch_contract: Address,
    calls: &[LockboxCall],
) -> LockboxResolution {
    let mut resolution = LockboxResolution::default();
    if calls.is_empty() {
        return resolution;
    }

    let requests: Vec<BatchCall> = calls
        .iter()
        .map(|c| BatchCall::new(c.router, ITokenRouter::wrappedTokenCall {}))
        .collect();

    let results = match multicall::aggregate(client, chain, batch_contract, &requests).await {
        Ok(results) => results,
        Err(e) => {
            warn!(chain, lockboxes = calls.len(), "lockbox resolution failed: {e}");
            resolution.unresolved = calls.iter().map(|c| c.key.clone()).collect();
            return resolution;
        }
    };

    for (call, result) in calls.iter().zip(&results) {
        let underlying = result
            .data()
            .and_then(|data| ITokenRouter::wrappedTokenCall::abi_decode_returns(data).ok())
            .filter(|address| !address.is_zero());

        match underlying {
            Some(address) => resolution.resolved.push(Erc20Call {
                address,
                key: call.key.clone(),
            }),
            None => {
                debug!(chain, key = %call.key, router = %call.router, "lockbox underlying not resolved");
                resolution.unresolved.push(call.key.clone());
            }
        }
    }

    resolution
}
