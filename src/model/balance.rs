use std::collections::{BTreeMap, BTreeSet, HashMap};

use alloy::primitives::U256;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ChainError;

use super::chain::ProtocolFamily;
use super::token::{TokenDescriptor, TokenKey};

/// Raw on-chain balances by token key. A missing key means "not resolved",
/// never zero.
pub type BalanceMap = HashMap<TokenKey, U256>;

/// Outcome of one independent fetch task.
pub type PartialBalances = Result<BalanceMap, ChainError>;

/// Fold task outcomes into one map: errors are logged and dropped, successful
/// maps are unioned. On a key collision the later map wins.
pub fn merge_partials<I>(partials: I) -> BalanceMap
where
    I: IntoIterator<Item = PartialBalances>,
{
    let mut merged = BalanceMap::new();
    for partial in partials {
        match partial {
            Ok(map) => extend_balances(&mut merged, map),
            Err(e) => warn!("balance task failed: {e}"),
        }
    }
    merged
}

/// Union `from` into `into`, last write wins.
pub fn extend_balances(into: &mut BalanceMap, from: BalanceMap) {
    for (key, amount) in from {
        if let Some(previous) = into.insert(key.clone(), amount) {
            if previous != amount {
                debug!(%key, %previous, %amount, "balance key written twice in one fetch");
            }
        }
    }
}

/// Render a balance map as sorted `key → decimal string`, the JSON shape the
/// CLI prints.
pub fn to_decimal_strings(balances: &BalanceMap) -> BTreeMap<String, String> {
    balances
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Distinct keys of `tokens` with no entry in `balances`. Descriptors that
/// share a key count once.
pub fn missing_keys(tokens: &[TokenDescriptor], balances: &BalanceMap) -> BTreeSet<TokenKey> {
    tokens
        .iter()
        .map(TokenDescriptor::key)
        .filter(|key| !balances.contains_key(key))
        .collect()
}

// ── Holder addresses ─────────────────────────────────────────────────

/// Currently known holder address per protocol family. A family without an
/// entry is skipped entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct HolderAddresses(BTreeMap<ProtocolFamily, String>);

impl HolderAddresses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, family: ProtocolFamily, address: impl Into<String>) -> Self {
        self.set(family, address);
        self
    }

    /// Set the address for a family; blank addresses clear the entry.
    pub fn set(&mut self, family: ProtocolFamily, address: impl Into<String>) {
        let address = address.into();
        let trimmed = address.trim();
        if trimmed.is_empty() {
            self.0.remove(&family);
        } else {
            self.0.insert(family, trimmed.to_string());
        }
    }

    pub fn get(&self, family: ProtocolFamily) -> Option<&str> {
        self.0.get(&family).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> TokenKey {
        TokenKey::new("ethereum", s, ProtocolFamily::Evm)
    }

    #[test]
    fn test_merge_drops_errors_and_unions() {
        let a: BalanceMap = [(key("0xa"), U256::from(1))].into_iter().collect();
        let b: BalanceMap = [(key("0xb"), U256::from(2)), (key("0xa"), U256::from(3))]
            .into_iter()
            .collect();
        let merged = merge_partials(vec![
            Ok(a),
            Err(ChainError::rpc("ethereum", "boom")),
            Ok(b),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[&key("0xa")], U256::from(3));
        assert_eq!(merged[&key("0xb")], U256::from(2));
    }

    #[test]
    fn test_missing_keys_counts_shared_keys_once() {
        use crate::model::TokenStandard;

        let token = |standard, address: &str| {
            TokenDescriptor::new("ethereum", ProtocolFamily::Evm, standard, address)
        };
        // Same address under two standards, one key
        let tokens = vec![
            token(TokenStandard::EvmHypSynthetic, "0xa"),
            token(TokenStandard::Erc20, "0xA"),
            token(TokenStandard::EvmHypSynthetic, "0xb"),
            token(TokenStandard::EvmHypSynthetic, "0xc"),
        ];
        let balances: BalanceMap = [(key("0xa"), U256::from(1))].into_iter().collect();

        let missing = missing_keys(&tokens, &balances);
        assert_eq!(missing.into_iter().collect::<Vec<_>>(), vec![key("0xb"), key("0xc")]);

        let all: BalanceMap = [key("0xa"), key("0xb"), key("0xc")]
            .into_iter()
            .map(|k| (k, U256::ZERO))
            .collect();
        // tokens.len() - all.len() would report 1
        assert!(missing_keys(&tokens, &all).is_empty());
    }

    #[test]
    fn test_holders_blank_clears() {
        let mut holders = HolderAddresses::new().with(ProtocolFamily::Evm, "0x123");
        assert_eq!(holders.get(ProtocolFamily::Evm), Some("0x123"));
        holders.set(ProtocolFamily::Evm, "  ");
        assert_eq!(holders.get(ProtocolFamily::Evm), None);
        assert!(holders.is_empty());
    }

    #[test]
    fn test_decimal_rendering() {
        let map: BalanceMap = [(key("0xA"), U256::from(10).pow(U256::from(20)))]
            .into_iter()
            .collect();
        let rendered = to_decimal_strings(&map);
        assert_eq!(
            rendered.get("ethereum:0xa").map(String::as_str),
            Some("100000000000000000000")
        );
    }
}
