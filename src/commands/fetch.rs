use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use balance_scan::model::balance;
use balance_scan::{BalanceEngine, ConnectionPool, config};

/// CLI-facing options of the `fetch` command.
pub struct FetchConfig {
    pub file: PathBuf,
    pub evm_holder: Option<String>,
    pub sealevel_holder: Option<String>,
    pub compact: bool,
}

/// Entry point for the `fetch` command.
pub fn run(options: &FetchConfig) -> Result<()> {
    let mut scan = config::load(&options.file)?;
    scan.apply_holder_overrides(
        options.evm_holder.as_deref(),
        options.sealevel_holder.as_deref(),
    );
    if scan.holders.is_empty() {
        anyhow::bail!(
            "No holder address. Set `holders` in {}, {} / {}, or pass --evm-holder / --sealevel-holder.",
            options.file.display(),
            config::EVM_HOLDER_ENV,
            config::SEALEVEL_HOLDER_ENV,
        );
    }

    let pool = Arc::new(ConnectionPool::new(scan.registry()));
    let engine = BalanceEngine::new(pool);

    let rt = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let balances = rt.block_on(engine.fetch_balances(&scan.tokens, &scan.holders));

    let rendered = balance::to_decimal_strings(&balances);
    let json = if options.compact {
        serde_json::to_string(&rendered)?
    } else {
        serde_json::to_string_pretty(&rendered)?
    };
    println!("{json}");

    let missing = balance::missing_keys(&scan.tokens, &balances);
    if !missing.is_empty() {
        eprintln!(
            "{} token(s) without a balance (unsupported, unreachable or skipped)",
            missing.len()
        );
    }
    Ok(())
}
