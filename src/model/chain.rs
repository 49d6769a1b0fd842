use std::collections::BTreeMap;

use alloy::primitives::Address;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::evm::multicall::DEFAULT_BATCH_CONTRACT;

// ── Protocol family ──────────────────────────────────────────────────

/// Execution-protocol family a chain (and every token on it) belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolFamily {
    #[serde(alias = "ethereum")]
    Evm,
    Sealevel,
    #[serde(other)]
    Other,
}

impl std::fmt::Display for ProtocolFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProtocolFamily::Evm => "evm",
            ProtocolFamily::Sealevel => "sealevel",
            ProtocolFamily::Other => "other",
        };
        f.write_str(s)
    }
}

// ── Chain metadata ───────────────────────────────────────────────────

/// Registry entry for one chain.
///
/// In JSON:
/// - EVM chain: `{"name": "ethereum", "protocol": "evm", "chain_id": 1, "rpc_urls": ["https://eth.llamarpc.com"]}`
/// - Sealevel chain: `{"name": "solanamainnet", "protocol": "sealevel", "rpc_urls": ["https://api.mainnet-beta.solana.com"]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChainMetadata {
    /// Registry name (e.g. "ethereum", "base", "solanamainnet").
    pub name: String,
    pub protocol: ProtocolFamily,
    /// EVM chain ID. EVM tokens on a chain without one are never batched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// JSON-RPC endpoints; the first one is used.
    #[serde(default)]
    pub rpc_urls: Vec<String>,
    /// Override for the Multicall3 deployment on this chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_contract: Option<String>,
    /// Route every token on this chain through per-token calls.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disable_batch: bool,
}

impl ChainMetadata {
    /// EVM chain with chain_id + rpc_url.
    pub fn evm(name: impl Into<String>, chain_id: u64, rpc_url: impl Into<String>) -> Self {
        ChainMetadata {
            name: name.into(),
            protocol: ProtocolFamily::Evm,
            chain_id: Some(chain_id),
            rpc_urls: vec![rpc_url.into()],
            batch_contract: None,
            disable_batch: false,
        }
    }

    pub fn sealevel(name: impl Into<String>, rpc_url: impl Into<String>) -> Self {
        ChainMetadata {
            name: name.into(),
            protocol: ProtocolFamily::Sealevel,
            chain_id: None,
            rpc_urls: vec![rpc_url.into()],
            batch_contract: None,
            disable_batch: false,
        }
    }

    pub fn with_batch_contract(mut self, address: impl Into<String>) -> Self {
        self.batch_contract = Some(address.into());
        self
    }

    pub fn without_batch(mut self) -> Self {
        self.disable_batch = true;
        self
    }

    pub fn rpc_url(&self) -> Option<&str> {
        self.rpc_urls.first().map(String::as_str)
    }

    /// Address of the batch-call contract to use, or `None` when batching is
    /// off for this chain. An unparseable override disables batching rather
    /// than silently falling back to the canonical deployment.
    pub fn batch_contract(&self) -> Option<Address> {
        if self.disable_batch {
            return None;
        }
        match &self.batch_contract {
            Some(raw) => raw.trim().parse().ok(),
            None => Some(DEFAULT_BATCH_CONTRACT),
        }
    }
}

// ── Known chains ─────────────────────────────────────────────────────

impl ChainMetadata {
    pub fn ethereum() -> Self {
        Self::evm("ethereum", 1, "https://eth.llamarpc.com")
    }
    pub fn arbitrum() -> Self {
        Self::evm("arbitrum", 42161, "https://arb1.arbitrum.io/rpc")
    }
    pub fn optimism() -> Self {
        Self::evm("optimism", 10, "https://mainnet.optimism.io")
    }
    pub fn base() -> Self {
        Self::evm("base", 8453, "https://mainnet.base.org")
    }
    pub fn solanamainnet() -> Self {
        Self::sealevel("solanamainnet", "https://api.mainnet-beta.solana.com")
    }

    /// Look up a built-in chain by name.
    pub fn known(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "ethereum" => Some(Self::ethereum()),
            "arbitrum" => Some(Self::arbitrum()),
            "optimism" => Some(Self::optimism()),
            "base" => Some(Self::base()),
            "solanamainnet" => Some(Self::solanamainnet()),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChainMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

// ── Registry ─────────────────────────────────────────────────────────

/// Chain metadata by name. Owned by the caller, read-only for the engine.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: BTreeMap<String, ChainMetadata>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a chain, returning the previous entry.
    pub fn insert(&mut self, chain: ChainMetadata) -> Option<ChainMetadata> {
        self.chains.insert(chain.name.clone(), chain)
    }

    pub fn get(&self, name: &str) -> Option<&ChainMetadata> {
        self.chains.get(name)
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainMetadata> {
        self.chains.values()
    }
}

impl FromIterator<ChainMetadata> for ChainRegistry {
    fn from_iter<I: IntoIterator<Item = ChainMetadata>>(iter: I) -> Self {
        let mut registry = ChainRegistry::new();
        for chain in iter {
            registry.insert(chain);
        }
        registry
    }
}
