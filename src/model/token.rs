use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::chain::ProtocolFamily;

// ── Token standard ───────────────────────────────────────────────────

/// On-chain standard of a token as tagged by the token registry.
///
/// Tags that this crate does not know deserialize into [`TokenStandard::Unknown`]
/// so that a registry update never breaks loading; such tokens are only ever
/// queried through the fallback path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum TokenStandard {
    // EVM
    #[serde(rename = "ERC20")]
    Erc20,
    #[serde(rename = "ERC721")]
    Erc721,
    EvmNative,
    EvmHypNative,
    EvmHypCollateral,
    EvmHypOwnerCollateral,
    EvmHypRebaseCollateral,
    EvmHypCollateralFiat,
    EvmHypSynthetic,
    EvmHypSyntheticRebase,
    #[serde(rename = "EvmHypXERC20")]
    EvmHypXerc20,
    #[serde(rename = "EvmHypXERC20Lockbox")]
    EvmHypXerc20Lockbox,
    #[serde(rename = "EvmHypVSXERC20")]
    EvmHypVsXerc20,
    #[serde(rename = "EvmHypVSXERC20Lockbox")]
    EvmHypVsXerc20Lockbox,

    // Sealevel
    SealevelSpl,
    SealevelSpl2022,
    SealevelNative,
    SealevelHypNative,
    SealevelHypCollateral,
    SealevelHypSynthetic,

    // Cosmos and CosmWasm
    CosmosIcs20,
    CosmosIcs721,
    CosmosNative,
    CosmosFactory,
    #[serde(rename = "CW20")]
    Cw20,
    #[serde(rename = "CWNative")]
    CwNative,
    #[serde(rename = "CW721")]
    Cw721,
    CwHypNative,
    CwHypCollateral,
    CwHypSynthetic,

    #[serde(other)]
    Unknown,
}

/// How a standard behaves for balance purposes, independent of protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardKind {
    /// The chain's gas asset.
    Native,
    /// A router that holds an underlying token through a lockbox.
    Lockbox,
    /// A token minted by the bridge itself.
    Synthetic,
    /// A plain fungible token (or a router over one).
    Plain,
    /// Anything the balance engine has no batch strategy for.
    Opaque,
}

impl TokenStandard {
    /// Protocol family this standard is defined on, `None` for unknown tags.
    pub fn family(&self) -> Option<ProtocolFamily> {
        use TokenStandard::*;
        match self {
            Erc20 | Erc721 | EvmNative | EvmHypNative | EvmHypCollateral
            | EvmHypOwnerCollateral | EvmHypRebaseCollateral | EvmHypCollateralFiat
            | EvmHypSynthetic | EvmHypSyntheticRebase | EvmHypXerc20 | EvmHypXerc20Lockbox
            | EvmHypVsXerc20 | EvmHypVsXerc20Lockbox => Some(ProtocolFamily::Evm),
            SealevelSpl | SealevelSpl2022 | SealevelNative | SealevelHypNative
            | SealevelHypCollateral | SealevelHypSynthetic => Some(ProtocolFamily::Sealevel),
            CosmosIcs20 | CosmosIcs721 | CosmosNative | CosmosFactory | Cw20 | CwNative
            | Cw721 | CwHypNative | CwHypCollateral | CwHypSynthetic => {
                Some(ProtocolFamily::Other)
            }
            Unknown => None,
        }
    }

    pub fn kind(&self) -> StandardKind {
        use TokenStandard::*;
        match self {
            EvmNative | EvmHypNative | SealevelNative | SealevelHypNative | CosmosNative
            | CwNative | CwHypNative => StandardKind::Native,
            EvmHypXerc20Lockbox | EvmHypVsXerc20Lockbox => StandardKind::Lockbox,
            EvmHypSynthetic | EvmHypSyntheticRebase | SealevelHypSynthetic | CwHypSynthetic => {
                StandardKind::Synthetic
            }
            Erc20 | EvmHypCollateral | EvmHypOwnerCollateral | EvmHypRebaseCollateral
            | EvmHypCollateralFiat | EvmHypXerc20 | EvmHypVsXerc20 | SealevelSpl
            | SealevelSpl2022 | SealevelHypCollateral | CosmosIcs20 | CosmosFactory | Cw20
            | CwHypCollateral => StandardKind::Plain,
            Erc721 | CosmosIcs721 | Cw721 | Unknown => StandardKind::Opaque,
        }
    }
}

// ── Token descriptor ─────────────────────────────────────────────────

/// A token as supplied by the caller's registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TokenDescriptor {
    /// Chain registry name.
    pub chain: String,
    pub protocol: ProtocolFamily,
    pub standard: TokenStandard,
    /// Token (or router) address on `chain`.
    pub address: String,
    /// Underlying token held by a collateral router.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collateral_address: Option<String>,
}

impl TokenDescriptor {
    pub fn new(
        chain: impl Into<String>,
        protocol: ProtocolFamily,
        standard: TokenStandard,
        address: impl Into<String>,
    ) -> Self {
        TokenDescriptor {
            chain: chain.into(),
            protocol,
            standard,
            address: address.into(),
            collateral_address: None,
        }
    }

    pub fn with_collateral(mut self, address: impl Into<String>) -> Self {
        self.collateral_address = Some(address.into());
        self
    }

    /// Collateral address, ignoring empty strings.
    pub fn collateral(&self) -> Option<&str> {
        self.collateral_address
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn key(&self) -> TokenKey {
        TokenKey::new(&self.chain, &self.address, self.protocol)
    }
}

// ── Token key ────────────────────────────────────────────────────────

/// `chain:address` with the address normalized for its protocol family.
/// EVM hex is case-insensitive so it is lowercased; base58 and bech32 are
/// kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenKey(String);

impl TokenKey {
    pub fn new(chain: &str, address: &str, protocol: ProtocolFamily) -> Self {
        TokenKey(format!("{}:{}", chain, normalize_address(address, protocol)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TokenKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn normalize_address(address: &str, protocol: ProtocolFamily) -> String {
    let trimmed = address.trim();
    match protocol {
        ProtocolFamily::Evm => trimmed.to_lowercase(),
        ProtocolFamily::Sealevel | ProtocolFamily::Other => trimmed.to_string(),
    }
}
