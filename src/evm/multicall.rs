//! Multicall3 `aggregate3` batch codec.
//!
//! Every sub-call is sent with `allowFailure = true`, so a reverting call
//! comes back as `success: false` instead of aborting the batch. Results are
//! index-aligned with the request list; a response of any other length is
//! treated as a failure of the whole batch.

use alloy::primitives::{Address, Bytes, address};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::error::ChainError;

use super::client::EvmRpc;

/// Canonical Multicall3 deployment, identical on every chain that has one.
pub const DEFAULT_BATCH_CONTRACT: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

sol! {
    #[allow(missing_docs)]
    interface IMulticall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct CallResult {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls) external payable returns (CallResult[] memory returnData);
    }
}

/// One sub-call of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCall {
    pub target: Address,
    pub call_data: Bytes,
}

impl BatchCall {
    pub fn new(target: Address, call: impl SolCall) -> Self {
        BatchCall {
            target,
            call_data: call.abi_encode().into(),
        }
    }
}

/// Outcome of one sub-call, at the same index as its [`BatchCall`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCallResult {
    pub success: bool,
    pub return_data: Bytes,
}

impl BatchCallResult {
    /// Return data of a successful, non-empty sub-call.
    pub fn data(&self) -> Option<&[u8]> {
        (self.success && !self.return_data.is_empty()).then_some(self.return_data.as_ref())
    }
}

pub fn encode_batch(calls: &[BatchCall]) -> Bytes {
    let calls = calls
        .iter()
        .map(|c| IMulticall3::Call3 {
            target: c.target,
            allowFailure: true,
            callData: c.call_data.clone(),
        })
        .collect();
    IMulticall3::aggregate3Call { calls }.abi_encode().into()
}

/// Decode an `aggregate3` response for `expected` sub-calls.
pub fn decode_batch(chain: &str, raw: &[u8], expected: usize) -> Result<Vec<BatchCallResult>, ChainError> {
    let results = IMulticall3::aggregate3Call::abi_decode_returns(raw)
        .map_err(|e| ChainError::decode(chain, "aggregate3 response", e))?;

    if results.len() != expected {
        return Err(ChainError::BatchMisaligned {
            chain: chain.to_string(),
            expected,
            actual: results.len(),
        });
    }

    Ok(results
        .into_iter()
        .map(|r| BatchCallResult {
            success: r.success,
            return_data: r.returnData,
        })
        .collect())
}

/// Run `calls` as one `eth_call` against the batch contract.
pub async fn aggregate(
    client: &dyn EvmRpc,
    chain: &str,
    batch_contract: Address,
    calls: &[BatchCall],
) -> Result<Vec<BatchCallResult>, ChainError> {
    if calls.is_empty() {
        return Ok(Vec::new());
    }

    let raw = client.call(batch_contract, encode_batch(calls)).await?;
    // An address without code answers eth_call with empty data.
    if raw.is_empty() {
        return Err(ChainError::BatchUnavailable {
            chain: chain.to_string(),
            contract: format!("{batch_contract}"),
        });
    }
    decode_batch(chain, &raw, calls.len())
}
