use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cross-chain token balance scanner: one batched fetch of every balance a
/// wallet holds across EVM and Sealevel chains.
#[derive(Parser)]
#[command(name = "balance-scan", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fetch every balance listed in a scan file and print them as JSON
    Fetch {
        /// Path to the scan JSON file
        file: PathBuf,

        /// EVM holder address (overrides the file and BALANCE_SCAN_EVM_HOLDER)
        #[arg(long)]
        evm_holder: Option<String>,

        /// Sealevel holder address (overrides the file and BALANCE_SCAN_SEALEVEL_HOLDER)
        #[arg(long)]
        sealevel_holder: Option<String>,

        /// Print single-line JSON
        #[arg(long)]
        compact: bool,
    },

    /// Show how a scan file would be batched, without any network access
    Plan {
        /// Path to the scan JSON file
        file: PathBuf,
    },

    /// Output the JSON schema for scan files
    Schema,
}
