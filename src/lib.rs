//! Cross-chain token balance aggregation.
//!
//! Given a list of token descriptors and one holder address per protocol
//! family, [`BalanceEngine::fetch_balances`] returns every balance it could
//! determine, using as few RPC round-trips as possible: one Multicall3 batch
//! per EVM chain (two when lockbox routers are involved), up to three account
//! listings per Sealevel chain, and a per-token fallback for everything else.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod evm;
pub mod fallback;
pub mod group;
pub mod model;
pub mod pool;
pub mod sealevel;

pub use engine::BalanceEngine;
pub use error::ChainError;
pub use fallback::{FallbackFetcher, RpcFallback};
pub use model::{
    BalanceMap, ChainMetadata, ChainRegistry, HolderAddresses, ProtocolFamily, TokenDescriptor,
    TokenKey, TokenStandard,
};
pub use pool::ConnectionPool;
