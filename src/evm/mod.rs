pub mod client;
pub mod fetch;
pub mod lockbox;
pub mod multicall;

use alloy::sol;

pub use client::{AlloyEvmClient, EvmRpc};

// ── Token interfaces ─────────────────────────────────────────────────

sol! {
    #[allow(missing_docs)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
    }

    #[allow(missing_docs)]
    interface ITokenRouter {
        function wrappedToken() external view returns (address);
    }
}
