use std::str::FromStr;

use alloy::primitives::U256;
use async_trait::async_trait;
use solana_account_decoder_client_types::UiAccountData;
use solana_account_decoder_client_types::token::UiTokenAccount;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_request::TokenAccountsFilter;
use solana_client::rpc_response::RpcKeyedAccount;
use solana_pubkey::Pubkey;
use tracing::debug;

use crate::error::ChainError;
use crate::model::ProtocolFamily;

use super::TokenProgram;

// ── Client interface ─────────────────────────────────────────────────

/// Which token accounts a listing call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountFilter {
    Program(TokenProgram),
    Mint(Pubkey),
}

impl From<AccountFilter> for TokenAccountsFilter {
    fn from(filter: AccountFilter) -> Self {
        match filter {
            AccountFilter::Program(program) => TokenAccountsFilter::ProgramId(program.id()),
            AccountFilter::Mint(mint) => TokenAccountsFilter::Mint(mint),
        }
    }
}

/// One token account from a jsonParsed listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAccountBalance {
    /// Base58 mint address.
    pub mint: String,
    /// Raw amount, no decimal scaling.
    pub amount: U256,
}

/// The two read calls the balance engine needs from a Sealevel chain.
#[async_trait]
pub trait SealevelRpc: Send + Sync {
    /// `getTokenAccountsByOwner` with jsonParsed encoding.
    async fn token_accounts_by_owner(
        &self,
        owner: &str,
        filter: AccountFilter,
    ) -> Result<Vec<TokenAccountBalance>, ChainError>;

    /// `getBalance` in lamports.
    async fn native_balance(&self, owner: &str) -> Result<u64, ChainError>;
}

// ── Solana RPC client ────────────────────────────────────────────────

/// [`SealevelRpc`] over the nonblocking Solana `RpcClient`.
pub struct SolanaRpcClient {
    chain: String,
    rpc: RpcClient,
}

impl SolanaRpcClient {
    pub fn new(chain: impl Into<String>, url: impl Into<String>) -> Self {
        SolanaRpcClient {
            chain: chain.into(),
            rpc: RpcClient::new(url.into()),
        }
    }

    fn owner(&self, owner: &str) -> Result<Pubkey, ChainError> {
        Pubkey::from_str(owner.trim()).map_err(|_| ChainError::InvalidHolder {
            address: owner.to_string(),
            family: ProtocolFamily::Sealevel.to_string(),
        })
    }
}

#[async_trait]
impl SealevelRpc for SolanaRpcClient {
    async fn token_accounts_by_owner(
        &self,
        owner: &str,
        filter: AccountFilter,
    ) -> Result<Vec<TokenAccountBalance>, ChainError> {
        let owner = self.owner(owner)?;
        let accounts = self
            .rpc
            .get_token_accounts_by_owner(&owner, filter.into())
            .await
            .map_err(|e| ChainError::rpc(&self.chain, format!("getTokenAccountsByOwner: {e}")))?;
        Ok(accounts
            .into_iter()
            .filter_map(|keyed| token_account_balance(&self.chain, keyed))
            .collect())
    }

    async fn native_balance(&self, owner: &str) -> Result<u64, ChainError> {
        let owner = self.owner(owner)?;
        self.rpc
            .get_balance(&owner)
            .await
            .map_err(|e| ChainError::rpc(&self.chain, format!("getBalance: {e}")))
    }
}

/// Mint and raw amount of a jsonParsed token account. Accounts that did not
/// come back parsed, or whose amount is not a decimal integer, are skipped.
fn token_account_balance(chain: &str, keyed: RpcKeyedAccount) -> Option<TokenAccountBalance> {
    let UiAccountData::Json(parsed) = keyed.account.data else {
        debug!(chain, account = %keyed.pubkey, "skipping token account without parsed data");
        return None;
    };
    let info = parsed.parsed.get("info")?.clone();
    let token: UiTokenAccount = match serde_json::from_value(info) {
        Ok(token) => token,
        Err(e) => {
            debug!(chain, account = %keyed.pubkey, "skipping unparsed token account: {e}");
            return None;
        }
    };
    match token.token_amount.amount.parse::<U256>() {
        Ok(amount) => Some(TokenAccountBalance {
            mint: token.mint,
            amount,
        }),
        Err(e) => {
            debug!(chain, account = %keyed.pubkey, "bad token amount: {e}");
            None
        }
    }
}
