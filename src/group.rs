//! Partitions a flat token list into per-chain batch groups plus a residual
//! list of tokens that must be queried one at a time.

use std::collections::BTreeMap;

use alloy::primitives::Address;
use solana_pubkey::Pubkey;
use tracing::debug;

use crate::classify::{self, EvmStrategy, SealevelStrategy};
use crate::model::{ChainMetadata, ChainRegistry, HolderAddresses, ProtocolFamily, TokenDescriptor, TokenKey};
use crate::sealevel::TokenProgram;

// ── EVM groups ───────────────────────────────────────────────────────

/// `balanceOf(holder)` against `address`, answering for `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Erc20Call {
    pub address: Address,
    pub key: TokenKey,
}

/// `wrappedToken()` against a lockbox router, answering for `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockboxCall {
    pub router: Address,
    pub key: TokenKey,
}

/// Everything batched on one EVM chain in one fetch.
#[derive(Debug, Clone)]
pub struct EvmChainGroup {
    pub chain: ChainMetadata,
    pub chain_id: u64,
    pub batch_contract: Address,
    /// Every token routed into this group, for whole-group fallback.
    pub tokens: Vec<TokenDescriptor>,
    pub erc20_calls: Vec<Erc20Call>,
    pub lockbox_calls: Vec<LockboxCall>,
}

#[derive(Debug, Default)]
pub struct EvmPlan {
    pub groups: BTreeMap<u64, EvmChainGroup>,
    pub fallback: Vec<TokenDescriptor>,
}

/// Group EVM-family tokens by chain id. Tokens of other families are ignored.
pub fn group_evm(tokens: &[TokenDescriptor], registry: &ChainRegistry) -> EvmPlan {
    let mut plan = EvmPlan::default();

    for token in tokens.iter().filter(|t| t.protocol == ProtocolFamily::Evm) {
        let key = token.key();
        let strategy = classify::classify_evm(token);

        let batchable = matches!(
            strategy,
            EvmStrategy::FungibleBatchable(_) | EvmStrategy::LockboxWrapped(_)
        );
        if !batchable {
            debug!(%key, ?strategy, "routing to fallback");
            plan.fallback.push(token.clone());
            continue;
        }

        let Some(chain) = registry.get(&token.chain) else {
            debug!(%key, "chain not in registry, routing to fallback");
            plan.fallback.push(token.clone());
            continue;
        };
        let (Some(chain_id), Some(batch_contract)) = (chain.chain_id, chain.batch_contract()) else {
            debug!(%key, "chain has no chain id or batch contract, routing to fallback");
            plan.fallback.push(token.clone());
            continue;
        };

        let group = plan.groups.entry(chain_id).or_insert_with(|| EvmChainGroup {
            chain: chain.clone(),
            chain_id,
            batch_contract,
            tokens: Vec::new(),
            erc20_calls: Vec::new(),
            lockbox_calls: Vec::new(),
        });

        group.tokens.push(token.clone());
        match strategy {
            EvmStrategy::FungibleBatchable(address) => {
                group.erc20_calls.push(Erc20Call { address, key })
            }
            EvmStrategy::LockboxWrapped(router) => {
                group.lockbox_calls.push(LockboxCall { router, key })
            }
            EvmStrategy::Native | EvmStrategy::Unsupported => {}
        }
    }

    plan
}

// ── Sealevel groups ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintRequest {
    pub mint: Pubkey,
    pub key: TokenKey,
}

/// Everything fetched by account listing on one Sealevel chain.
#[derive(Debug, Clone)]
pub struct SealevelChainGroup {
    pub chain: ChainMetadata,
    pub spl_tokens: Vec<MintRequest>,
    pub spl2022_tokens: Vec<MintRequest>,
    pub native_tokens: Vec<TokenKey>,
}

impl SealevelChainGroup {
    fn new(chain: ChainMetadata) -> Self {
        SealevelChainGroup {
            chain,
            spl_tokens: Vec::new(),
            spl2022_tokens: Vec::new(),
            native_tokens: Vec::new(),
        }
    }

    pub fn mints(&self, program: TokenProgram) -> &[MintRequest] {
        match program {
            TokenProgram::Legacy => &self.spl_tokens,
            TokenProgram::Token2022 => &self.spl2022_tokens,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.spl_tokens.is_empty() && self.spl2022_tokens.is_empty() && self.native_tokens.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct SealevelPlan {
    pub groups: BTreeMap<String, SealevelChainGroup>,
    pub fallback: Vec<TokenDescriptor>,
}

/// Group Sealevel-family tokens by chain name. Tokens of other families are
/// ignored.
pub fn group_sealevel(tokens: &[TokenDescriptor], registry: &ChainRegistry) -> SealevelPlan {
    let mut plan = SealevelPlan::default();

    for token in tokens.iter().filter(|t| t.protocol == ProtocolFamily::Sealevel) {
        let key = token.key();
        let strategy = classify::classify_sealevel(token);

        if strategy == SealevelStrategy::Unsupported {
            debug!(%key, "unsupported sealevel token, routing to fallback");
            plan.fallback.push(token.clone());
            continue;
        }
        let Some(chain) = registry.get(&token.chain) else {
            debug!(%key, "chain not in registry, routing to fallback");
            plan.fallback.push(token.clone());
            continue;
        };

        let group = plan
            .groups
            .entry(chain.name.clone())
            .or_insert_with(|| SealevelChainGroup::new(chain.clone()));

        match strategy {
            SealevelStrategy::Native => group.native_tokens.push(key),
            SealevelStrategy::SplLike { mint, program } => {
                let request = MintRequest { mint, key };
                match program {
                    TokenProgram::Legacy => group.spl_tokens.push(request),
                    TokenProgram::Token2022 => group.spl2022_tokens.push(request),
                }
            }
            SealevelStrategy::Unsupported => {}
        }
    }

    plan
}

// ── Full plan ────────────────────────────────────────────────────────

/// Every task of one fetch, with families lacking a holder address removed.
#[derive(Debug, Default)]
pub struct FetchPlan {
    pub evm_groups: Vec<EvmChainGroup>,
    pub sealevel_groups: Vec<SealevelChainGroup>,
    pub fallback: Vec<TokenDescriptor>,
}

impl FetchPlan {
    pub fn task_count(&self) -> usize {
        self.evm_groups.len() + self.sealevel_groups.len() + self.fallback.len()
    }
}

pub fn plan_fetch(
    tokens: &[TokenDescriptor],
    registry: &ChainRegistry,
    holders: &HolderAddresses,
) -> FetchPlan {
    let mut plan = FetchPlan::default();

    if holders.get(ProtocolFamily::Evm).is_some() {
        let evm = group_evm(tokens, registry);
        plan.evm_groups.extend(evm.groups.into_values());
        plan.fallback.extend(evm.fallback);
    }

    if holders.get(ProtocolFamily::Sealevel).is_some() {
        let sealevel = group_sealevel(tokens, registry);
        plan.sealevel_groups.extend(sealevel.groups.into_values());
        plan.fallback.extend(sealevel.fallback);
    }

    if holders.get(ProtocolFamily::Other).is_some() {
        plan.fallback.extend(
            tokens
                .iter()
                .filter(|t| t.protocol == ProtocolFamily::Other)
                .cloned(),
        );
    }

    plan
}
