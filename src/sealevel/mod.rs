pub mod client;
pub mod fetch;
pub mod pda;

use solana_pubkey::Pubkey;

pub use client::{AccountFilter, SealevelRpc, SolanaRpcClient, TokenAccountBalance};

/// SPL token program owning a mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenProgram {
    Legacy,
    Token2022,
}

impl TokenProgram {
    pub fn id(&self) -> Pubkey {
        match self {
            TokenProgram::Legacy => spl_token::id(),
            TokenProgram::Token2022 => spl_token_2022::id(),
        }
    }
}

impl std::fmt::Display for TokenProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenProgram::Legacy => f.write_str("spl-token"),
            TokenProgram::Token2022 => f.write_str("spl-token-2022"),
        }
    }
}
