use std::path::Path;

use anyhow::Result;

use balance_scan::config;
use balance_scan::group;
use balance_scan::model::ProtocolFamily;
use balance_scan::sealevel::TokenProgram;

/// Entry point for the `plan` command. Every family is planned, whether or
/// not a holder address is configured for it.
pub fn run(path: &Path) -> Result<()> {
    let scan = config::load(path)?;
    let registry = scan.registry();

    let evm = group::group_evm(&scan.tokens, &registry);
    let sealevel = group::group_sealevel(&scan.tokens, &registry);

    println!(
        "{} tokens on {} chains",
        scan.tokens.len(),
        registry.len()
    );

    for g in evm.groups.values() {
        println!();
        println!(
            "EVM {} (chain id {}) via batch contract {}",
            g.chain.name, g.chain_id, g.batch_contract
        );
        if !g.lockbox_calls.is_empty() {
            println!("  phase 1 wrappedToken() x{}", g.lockbox_calls.len());
            for call in &g.lockbox_calls {
                println!("    {} router {}", call.key, call.router);
            }
        }
        println!(
            "  balanceOf x{}{}",
            g.erc20_calls.len() + g.lockbox_calls.len(),
            if g.lockbox_calls.is_empty() { "" } else { " (incl. resolved lockboxes)" }
        );
        for call in &g.erc20_calls {
            println!("    {} token {}", call.key, call.address);
        }
    }

    for g in sealevel.groups.values() {
        println!();
        println!("Sealevel {}", g.chain.name);
        for program in [TokenProgram::Legacy, TokenProgram::Token2022] {
            let mints = g.mints(program);
            if mints.is_empty() {
                continue;
            }
            println!("  getTokenAccountsByOwner({program}) for {} token(s)", mints.len());
            for request in mints {
                println!("    {} mint {}", request.key, request.mint);
            }
        }
        if !g.native_tokens.is_empty() {
            println!("  getBalance for {} token(s)", g.native_tokens.len());
            for key in &g.native_tokens {
                println!("    {key}");
            }
        }
    }

    let others = scan
        .tokens
        .iter()
        .filter(|t| t.protocol == ProtocolFamily::Other);
    let fallback: Vec<_> = evm.fallback.iter().chain(&sealevel.fallback).chain(others).collect();
    if !fallback.is_empty() {
        println!();
        println!("Per-token fallback x{}", fallback.len());
        for token in fallback {
            println!("    {} ({:?})", token.key(), token.standard);
        }
    }

    Ok(())
}
