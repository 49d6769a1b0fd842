use std::collections::BTreeSet;
use std::path::Path;

use alloy::primitives::Address;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ChainMetadata, ChainRegistry, HolderAddresses, ProtocolFamily, TokenDescriptor};

pub const EVM_HOLDER_ENV: &str = "BALANCE_SCAN_EVM_HOLDER";
pub const SEALEVEL_HOLDER_ENV: &str = "BALANCE_SCAN_SEALEVEL_HOLDER";

/// A scan file: chains, tokens and the wallet to query.
///
/// Chains referenced by tokens but not listed fall back to the built-in
/// metadata for `ethereum`, `arbitrum`, `optimism`, `base` and
/// `solanamainnet`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ScanConfig {
    #[serde(default)]
    pub chains: Vec<ChainMetadata>,
    pub tokens: Vec<TokenDescriptor>,
    /// Holder address per protocol family, e.g. `{"evm": "0x...", "sealevel": "..."}`.
    #[serde(default)]
    pub holders: HolderAddresses,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate chain `{chain}`")]
    DuplicateChain { chain: String },

    #[error("Chain `{chain}` has an invalid batch contract `{address}`")]
    InvalidBatchContract { chain: String, address: String },

    #[error("Token `{key}` is on unknown chain `{chain}`")]
    UnknownChain { key: String, chain: String },

    #[error("Token `{key}` is {token} but chain `{chain}` is {chain_family}")]
    FamilyMismatch {
        key: String,
        token: ProtocolFamily,
        chain: String,
        chain_family: ProtocolFamily,
    },
}

impl ScanConfig {
    /// Registry of every listed chain plus built-in chains referenced by
    /// tokens. Listed chains take precedence.
    pub fn registry(&self) -> ChainRegistry {
        let mut registry: ChainRegistry = self.chains.iter().cloned().collect();
        for token in &self.tokens {
            if registry.get(&token.chain).is_none() {
                if let Some(known) = ChainMetadata::known(&token.chain) {
                    registry.insert(known);
                }
            }
        }
        registry
    }

    /// Apply holder overrides from the environment, then from explicit values
    /// (e.g. CLI flags). Later sources win; blank values clear the entry.
    pub fn apply_holder_overrides(&mut self, evm: Option<&str>, sealevel: Option<&str>) {
        for (family, var) in [
            (ProtocolFamily::Evm, EVM_HOLDER_ENV),
            (ProtocolFamily::Sealevel, SEALEVEL_HOLDER_ENV),
        ] {
            if let Ok(value) = std::env::var(var) {
                self.holders.set(family, value);
            }
        }
        if let Some(evm) = evm {
            self.holders.set(ProtocolFamily::Evm, evm);
        }
        if let Some(sealevel) = sealevel {
            self.holders.set(ProtocolFamily::Sealevel, sealevel);
        }
    }
}

/// Load and fully validate a scan file.
pub fn load_and_validate(path: &Path) -> Result<ScanConfig, Vec<ConfigError>> {
    let contents = std::fs::read_to_string(path).map_err(|e| vec![ConfigError::Io(e)])?;
    let config: ScanConfig =
        serde_json::from_str(&contents).map_err(|e| vec![ConfigError::Json(e)])?;
    validate(&config)?;
    Ok(config)
}

/// Validate a scan file, collecting all errors.
pub fn validate(config: &ScanConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let mut seen = BTreeSet::new();
    for chain in &config.chains {
        if !seen.insert(chain.name.as_str()) {
            errors.push(ConfigError::DuplicateChain {
                chain: chain.name.clone(),
            });
        }
        if let Some(raw) = &chain.batch_contract {
            if raw.trim().parse::<Address>().is_err() {
                errors.push(ConfigError::InvalidBatchContract {
                    chain: chain.name.clone(),
                    address: raw.clone(),
                });
            }
        }
    }

    let registry = config.registry();
    for token in &config.tokens {
        match registry.get(&token.chain) {
            None => errors.push(ConfigError::UnknownChain {
                key: token.key().to_string(),
                chain: token.chain.clone(),
            }),
            Some(chain) if chain.protocol != token.protocol => {
                errors.push(ConfigError::FamilyMismatch {
                    key: token.key().to_string(),
                    token: token.protocol,
                    chain: chain.name.clone(),
                    chain_family: chain.protocol,
                })
            }
            Some(_) => {}
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Load a scan file for a command, turning validation errors into one
/// `anyhow` error.
pub fn load(path: &Path) -> anyhow::Result<ScanConfig> {
    load_and_validate(path).map_err(|errors| {
        let lines: Vec<String> = errors
            .iter()
            .enumerate()
            .map(|(i, e)| format!("  {}. {}", i + 1, e))
            .collect();
        anyhow::anyhow!(
            "{} is invalid ({} error(s)):\n{}",
            path.display(),
            errors.len(),
            lines.join("\n")
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TokenStandard;

    const SCAN: &str = r#"{
        "chains": [
            {"name": "ethereum", "protocol": "evm", "chain_id": 1, "rpc_urls": ["http://localhost:8545"]}
        ],
        "tokens": [
            {"chain": "ethereum", "protocol": "evm", "standard": "EvmHypSynthetic", "address": "0x00000000000000000000000000000000000000aa"},
            {"chain": "solanamainnet", "protocol": "sealevel", "standard": "SealevelSpl", "address": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"}
        ],
        "holders": {"evm": "0x0000000000000000000000000000000000000001"}
    }"#;

    #[test]
    fn test_parse_and_registry() {
        let config: ScanConfig = serde_json::from_str(SCAN).unwrap();
        assert!(validate(&config).is_ok());

        let registry = config.registry();
        assert_eq!(registry.len(), 2);
        // Listed chain wins over the built-in one
        assert_eq!(
            registry.get("ethereum").unwrap().rpc_url(),
            Some("http://localhost:8545")
        );
        assert_eq!(
            registry.get("solanamainnet").unwrap().protocol,
            ProtocolFamily::Sealevel
        );
        assert_eq!(
            config.holders.get(ProtocolFamily::Evm),
            Some("0x0000000000000000000000000000000000000001")
        );
        assert_eq!(config.tokens[0].standard, TokenStandard::EvmHypSynthetic);
    }

    #[test]
    fn test_validation_collects_errors() {
        let config = ScanConfig {
            chains: vec![
                ChainMetadata::ethereum().with_batch_contract("not-an-address"),
                ChainMetadata::ethereum(),
            ],
            tokens: vec![
                TokenDescriptor::new("nowhere", ProtocolFamily::Evm, TokenStandard::Erc20, "0x1"),
                TokenDescriptor::new(
                    "ethereum",
                    ProtocolFamily::Sealevel,
                    TokenStandard::SealevelSpl,
                    "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
                ),
            ],
            holders: HolderAddresses::new(),
        };

        let errors = validate(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| matches!(e, ConfigError::InvalidBatchContract { .. })));
        assert!(errors.iter().any(|e| matches!(e, ConfigError::DuplicateChain { .. })));
        assert!(errors.iter().any(|e| matches!(e, ConfigError::UnknownChain { .. })));
        assert!(errors.iter().any(|e| matches!(e, ConfigError::FamilyMismatch { .. })));
    }

    #[test]
    fn test_explicit_holder_overrides() {
        let mut config: ScanConfig = serde_json::from_str(SCAN).unwrap();
        config.apply_holder_overrides(Some(""), Some("Holder111"));
        assert_eq!(config.holders.get(ProtocolFamily::Evm), None);
        assert_eq!(config.holders.get(ProtocolFamily::Sealevel), Some("Holder111"));
    }
}
