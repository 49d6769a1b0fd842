pub mod balance;
pub mod chain;
pub mod token;

pub use balance::{BalanceMap, HolderAddresses};
pub use chain::{ChainMetadata, ChainRegistry, ProtocolFamily};
pub use token::{TokenDescriptor, TokenKey, TokenStandard};
