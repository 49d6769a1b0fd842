use thiserror::Error;

/// Failure of a single network-bound task inside a balance fetch.
///
/// None of these ever escape [`crate::engine::BalanceEngine::fetch_balances`];
/// they are logged at the task boundary and turned into missing map entries.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("RPC request to `{chain}` failed: {reason}")]
    Rpc { chain: String, reason: String },

    #[error("Invalid RPC URL `{url}` for chain `{chain}`: {reason}")]
    InvalidRpcUrl {
        chain: String,
        url: String,
        reason: String,
    },

    #[error("Chain `{chain}` has no RPC URL configured")]
    NoRpcUrl { chain: String },

    #[error("Chain `{chain}` is not in the chain registry")]
    UnknownChain { chain: String },

    #[error("Batch contract {contract} on `{chain}` returned no data (not deployed?)")]
    BatchUnavailable { chain: String, contract: String },

    #[error("Batch on `{chain}` returned {actual} results for {expected} calls")]
    BatchMisaligned {
        chain: String,
        expected: usize,
        actual: usize,
    },

    #[error("Could not decode {what} from `{chain}`: {reason}")]
    Decode {
        chain: String,
        what: &'static str,
        reason: String,
    },

    #[error("Token `{key}` cannot be queried by the {family} fallback")]
    UnsupportedToken { key: String, family: String },

    #[error("Holder address `{address}` is not valid for {family}")]
    InvalidHolder { address: String, family: String },
}

impl ChainError {
    pub fn rpc(chain: impl Into<String>, reason: impl ToString) -> Self {
        ChainError::Rpc {
            chain: chain.into(),
            reason: reason.to_string(),
        }
    }

    pub fn decode(chain: impl Into<String>, what: &'static str, reason: impl ToString) -> Self {
        ChainError::Decode {
            chain: chain.into(),
            what,
            reason: reason.to_string(),
        }
    }
}
