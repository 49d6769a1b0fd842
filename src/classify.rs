//! Maps a token descriptor to the strategy used to fetch its balance.
//!
//! Pure and infallible: anything that cannot be classified (unknown standard,
//! standard from another protocol family, unparseable address) becomes
//! `Unsupported` and is later queried one-by-one through the fallback path.

use std::str::FromStr;

use alloy::primitives::Address;
use solana_pubkey::Pubkey;

use crate::model::chain::ProtocolFamily;
use crate::model::token::{StandardKind, TokenDescriptor, TokenStandard};
use crate::sealevel::TokenProgram;
use crate::sealevel::pda;

// ── Strategies ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvmStrategy {
    /// Gas asset, needs `eth_getBalance`.
    Native,
    /// `balanceOf(holder)` against this ERC20.
    FungibleBatchable(Address),
    /// Router whose underlying ERC20 must be looked up first.
    LockboxWrapped(Address),
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SealevelStrategy {
    Native,
    SplLike { mint: Pubkey, program: TokenProgram },
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Evm(EvmStrategy),
    Sealevel(SealevelStrategy),
    /// Protocol family without a batch path.
    Other,
}

pub fn classify(token: &TokenDescriptor) -> Strategy {
    match token.protocol {
        ProtocolFamily::Evm => Strategy::Evm(classify_evm(token)),
        ProtocolFamily::Sealevel => Strategy::Sealevel(classify_sealevel(token)),
        ProtocolFamily::Other => Strategy::Other,
    }
}

// ── EVM ──────────────────────────────────────────────────────────────

pub fn classify_evm(token: &TokenDescriptor) -> EvmStrategy {
    if token.standard.family() != Some(ProtocolFamily::Evm) {
        return EvmStrategy::Unsupported;
    }

    match token.standard.kind() {
        StandardKind::Native => EvmStrategy::Native,
        StandardKind::Lockbox => parse_evm(&token.address)
            .map(EvmStrategy::LockboxWrapped)
            .unwrap_or(EvmStrategy::Unsupported),
        kind @ (StandardKind::Synthetic | StandardKind::Plain | StandardKind::Opaque) => {
            if let Some(collateral) = token.collateral() {
                return parse_evm(collateral)
                    .map(EvmStrategy::FungibleBatchable)
                    .unwrap_or(EvmStrategy::Unsupported);
            }
            match kind {
                StandardKind::Synthetic => parse_evm(&token.address)
                    .map(EvmStrategy::FungibleBatchable)
                    .unwrap_or(EvmStrategy::Unsupported),
                _ => EvmStrategy::Unsupported,
            }
        }
    }
}

fn parse_evm(address: &str) -> Option<Address> {
    address.trim().parse().ok()
}

// ── Sealevel ─────────────────────────────────────────────────────────

pub fn classify_sealevel(token: &TokenDescriptor) -> SealevelStrategy {
    match token.standard {
        TokenStandard::SealevelNative | TokenStandard::SealevelHypNative => {
            SealevelStrategy::Native
        }
        TokenStandard::SealevelSpl => spl_like(&token.address, TokenProgram::Legacy),
        TokenStandard::SealevelSpl2022 => spl_like(&token.address, TokenProgram::Token2022),
        TokenStandard::SealevelHypCollateral => match token.collateral() {
            Some(collateral) => spl_like(collateral, TokenProgram::Legacy),
            None => SealevelStrategy::Unsupported,
        },
        TokenStandard::SealevelHypSynthetic => parse_sealevel(&token.address)
            .and_then(|program| pda::synthetic_mint(&program))
            .map(|mint| SealevelStrategy::SplLike {
                mint,
                program: TokenProgram::Token2022,
            })
            .unwrap_or(SealevelStrategy::Unsupported),
        _ => SealevelStrategy::Unsupported,
    }
}

fn spl_like(mint: &str, program: TokenProgram) -> SealevelStrategy {
    match parse_sealevel(mint) {
        Some(mint) => SealevelStrategy::SplLike { mint, program },
        None => SealevelStrategy::Unsupported,
    }
}

fn parse_sealevel(address: &str) -> Option<Pubkey> {
    Pubkey::from_str(address.trim()).ok()
}
