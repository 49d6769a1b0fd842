
use std::sync::Arc;

use alloy::primitives::U256;
use alloy::sol_types::SolCall;

use balance_scan::evm::{IERC20, ITokenRouter};
use balance_scan::{
    BalanceEngine, ChainMetadata, ConnectionPool, FallbackFetcher, HolderAddresses, ProtocolFamily,
    RpcFallback, TokenStandard,
};

use mock_common::*;

const BALANCE_OF: [u8; 4] = IERC20::balanceOfCall::SELECTOR;
const WRAPPED_TOKEN: [u8; 4] = ITokenRouter::wrappedTokenCall::SELECTOR;

fn evm_holders() -> HolderAddresses {
    HolderAddresses::new().with(ProtocolFamily::Evm, EVM_HOLDER)
}

// ── Batching ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_synthetic_and_lockbox_use_two_batches() {
    let synthetic = addr(0xaa);
    let router = addr(0xbb);
    let underlying = addr(0xcc);

    let ethereum = Arc::new(
        MockEvm::new()
            .with_balance(synthetic, 100)
            .with_lockbox(router, underlying)
            .with_balance(underlying, 250),
    );
    let engine = engine_with(
        ethereum.clone(),
        Arc::new(MockEvm::new()),
        Arc::new(MockSealevel::new()),
    );

    let tokens = vec![
        evm_token("ethereum", TokenStandard::EvmHypSynthetic, synthetic),
        evm_token("ethereum", TokenStandard::EvmHypXerc20Lockbox, router),
    ];
    let balances = engine.fetch_balances(&tokens, &evm_holders()).await;

    assert_eq!(balances.len(), 2);
    assert_eq!(balances[&tokens[0].key()], U256::from(100));
    assert_eq!(balances[&tokens[1].key()], U256::from(250));

    // Resolve first, then one balance batch shared with the plain token
    let batches = ethereum.batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0], vec![(router, WRAPPED_TOKEN)]);
    assert_eq!(
        batches[1],
        vec![(synthetic, BALANCE_OF), (underlying, BALANCE_OF)]
    );
    assert!(ethereum.direct_calls().is_empty());
}

#[tokio::test]
async fn test_collateral_router_queries_its_collateral() {
    let router = addr(0xb1);
    let usdc = addr(0xc1);

    let ethereum = Arc::new(MockEvm::new().with_balance(usdc, 1_000_000));
    let engine = engine_with(
        ethereum.clone(),
        Arc::new(MockEvm::new()),
        Arc::new(MockSealevel::new()),
    );

    let tokens = vec![
        evm_token("ethereum", TokenStandard::EvmHypCollateral, router).with_collateral(hex(usdc)),
    ];
    let balances = engine.fetch_balances(&tokens, &evm_holders()).await;

    assert_eq!(balances[&tokens[0].key()], U256::from(1_000_000));
    assert_eq!(ethereum.batches(), vec![vec![(usdc, BALANCE_OF)]]);
}

#[tokio::test]
async fn test_reverted_sub_call_leaves_gap_without_fallback() {
    let good = addr(0xa1);
    let bad = addr(0xa2);

    let ethereum = Arc::new(
        MockEvm::new()
            .with_balance(good, 5)
            .with_balance(bad, 6)
            .reverting(bad),
    );
    let fallback = Arc::new(RecordingFallback::new(99));
    let engine = BalanceEngine::with_fallback(
        pool_with(
            ethereum.clone(),
            Arc::new(MockEvm::new()),
            Arc::new(MockSealevel::new()),
        ),
        fallback.clone(),
    );

    let tokens = vec![
        evm_token("ethereum", TokenStandard::EvmHypSynthetic, good),
        evm_token("ethereum", TokenStandard::EvmHypSynthetic, bad),
    ];
    let balances = engine.fetch_balances(&tokens, &evm_holders()).await;

    assert_eq!(balances.len(), 1);
    assert_eq!(balances[&tokens[0].key()], U256::from(5));
    assert!(!balances.contains_key(&tokens[1].key()));
    assert!(fallback.seen().is_empty());
}

// ── Lockbox resolution ───────────────────────────────────────────────

#[tokio::test]
async fn test_unresolved_lockbox_reaches_only_fallback() {
    let synthetic = addr(0xaa);
    let router = addr(0xbb);

    // No wrappedToken() answer for the router
    let ethereum = Arc::new(MockEvm::new().with_balance(synthetic, 100));
    let fallback = Arc::new(RecordingFallback::new(5));
    let engine = BalanceEngine::with_fallback(
        pool_with(
            ethereum.clone(),
            Arc::new(MockEvm::new()),
            Arc::new(MockSealevel::new()),
        ),
        fallback.clone(),
    );

    let tokens = vec![
        evm_token("ethereum", TokenStandard::EvmHypSynthetic, synthetic),
        evm_token("ethereum", TokenStandard::EvmHypVsXerc20Lockbox, router),
    ];
    let balances = engine.fetch_balances(&tokens, &evm_holders()).await;

    assert_eq!(balances[&tokens[0].key()], U256::from(100));
    assert_eq!(balances[&tokens[1].key()], U256::from(5));
    assert_eq!(fallback.seen(), vec![tokens[1].key()]);

    let batches = ethereum.batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[1], vec![(synthetic, BALANCE_OF)]);
}

#[tokio::test]
async fn test_zero_underlying_is_unresolved() {
    let router = addr(0xbb);
    let ethereum = Arc::new(MockEvm::new().with_lockbox(router, alloy::primitives::Address::ZERO));
    let fallback = Arc::new(RecordingFallback::new(3));
    let engine = BalanceEngine::with_fallback(
        pool_with(
            ethereum.clone(),
            Arc::new(MockEvm::new()),
            Arc::new(MockSealevel::new()),
        ),
        fallback.clone(),
    );

    let tokens = vec![evm_token("ethereum", TokenStandard::EvmHypXerc20Lockbox, router)];
    let balances = engine.fetch_balances(&tokens, &evm_holders()).await;

    assert_eq!(balances[&tokens[0].key()], U256::from(3));
    // Nothing left to batch after resolution
    assert_eq!(ethereum.batches().len(), 1);
}

#[tokio::test]
async fn test_failed_resolution_still_fetches_plain_tokens() {
    let synthetic = addr(0xaa);
    let router = addr(0xbb);
    let underlying = addr(0xcc);

    let ethereum = Arc::new(
        MockEvm::new()
            .with_balance(synthetic, 100)
            .with_lockbox(router, underlying)
            .with_balance(underlying, 7)
            .failing_resolution(),
    );
    let fallback = Arc::new(RecordingFallback::new(4));
    let engine = BalanceEngine::with_fallback(
        pool_with(
            ethereum.clone(),
            Arc::new(MockEvm::new()),
            Arc::new(MockSealevel::new()),
        ),
        fallback.clone(),
    );

    let tokens = vec![
        evm_token("ethereum", TokenStandard::EvmHypSynthetic, synthetic),
        evm_token("ethereum", TokenStandard::EvmHypXerc20Lockbox, router),
    ];
    let balances = engine.fetch_balances(&tokens, &evm_holders()).await;

    // Plain token still batched, lockbox only through the fallback
    assert_eq!(balances[&tokens[0].key()], U256::from(100));
    assert_eq!(balances[&tokens[1].key()], U256::from(4));
    assert_eq!(fallback.seen(), vec![tokens[1].key()]);
    assert_eq!(ethereum.batches(), vec![vec![(synthetic, BALANCE_OF)]]);
    assert!(ethereum.direct_calls().is_empty());
}

// ── Batch contract ───────────────────────────────────────────────────

#[tokio::test]
async fn test_batch_contract_override_is_used() {
    let synthetic = addr(0xaa);
    let router = addr(0xbb);
    let underlying = addr(0xcc);
    let custom = addr(0x77);

    let ethereum = Arc::new(
        MockEvm::new()
            .with_balance(synthetic, 77)
            .with_lockbox(router, underlying)
            .with_balance(underlying, 8)
            .at_batch_contract(custom),
    );
    let mut registry = registry();
    registry.insert(ChainMetadata::ethereum().with_batch_contract(hex(custom)));
    let pool = ConnectionPool::new(registry);
    pool.insert_evm(ETHEREUM_CHAIN_ID, ethereum.clone());
    let engine = BalanceEngine::new(Arc::new(pool));

    let tokens = vec![
        evm_token("ethereum", TokenStandard::EvmHypSynthetic, synthetic),
        evm_token("ethereum", TokenStandard::EvmHypXerc20Lockbox, router),
    ];
    let balances = engine.fetch_balances(&tokens, &evm_holders()).await;

    assert_eq!(balances[&tokens[0].key()], U256::from(77));
    assert_eq!(balances[&tokens[1].key()], U256::from(8));
    // Both phases answered at the override, nothing sent to the canonical address
    assert_eq!(ethereum.batches().len(), 2);
    assert!(ethereum.direct_calls().is_empty());
}

// ── Chain-level failure ──────────────────────────────────────────────

#[tokio::test]
async fn test_batch_failure_falls_back_per_token() {
    let synthetic = addr(0xaa);
    let router = addr(0xbb);
    let underlying = addr(0xcc);

    let ethereum = Arc::new(
        MockEvm::new()
            .with_balance(synthetic, 100)
            .with_lockbox(router, underlying)
            .with_balance(underlying, 7)
            .failing_batch(),
    );
    let engine = engine_with(
        ethereum.clone(),
        Arc::new(MockEvm::new()),
        Arc::new(MockSealevel::new()),
    );

    let tokens = vec![
        evm_token("ethereum", TokenStandard::EvmHypSynthetic, synthetic),
        evm_token("ethereum", TokenStandard::EvmHypXerc20Lockbox, router),
    ];
    let balances = engine.fetch_balances(&tokens, &evm_holders()).await;

    assert_eq!(balances[&tokens[0].key()], U256::from(100));
    assert_eq!(balances[&tokens[1].key()], U256::from(7));

    let mut direct = ethereum.direct_calls();
    direct.sort();
    let mut expected = vec![
        (synthetic, BALANCE_OF),
        (router, WRAPPED_TOKEN),
        (underlying, BALANCE_OF),
    ];
    expected.sort();
    assert_eq!(direct, expected);
}

#[tokio::test]
async fn test_disabled_batching_uses_fallback() {
    let synthetic = addr(0xaa);
    let arbitrum = Arc::new(MockEvm::new().with_balance(synthetic, 11));

    let mut registry = registry();
    registry.insert(balance_scan::ChainMetadata::arbitrum().without_batch());
    let pool = balance_scan::ConnectionPool::new(registry);
    pool.insert_evm(ARBITRUM_CHAIN_ID, arbitrum.clone());
    let engine = BalanceEngine::new(Arc::new(pool));

    let tokens = vec![evm_token("arbitrum", TokenStandard::EvmHypSynthetic, synthetic)];
    let balances = engine.fetch_balances(&tokens, &evm_holders()).await;

    assert_eq!(balances[&tokens[0].key()], U256::from(11));
    assert!(arbitrum.batches().is_empty());
    assert_eq!(arbitrum.direct_calls(), vec![(synthetic, BALANCE_OF)]);
}

// ── Fallback-only tokens ─────────────────────────────────────────────

#[tokio::test]
async fn test_native_and_plain_erc20_never_batched() {
    let synthetic = addr(0xaa);
    let plain = addr(0xdd);

    let ethereum = Arc::new(
        MockEvm::new()
            .with_balance(synthetic, 1)
            .with_balance(plain, 42)
            .with_native(10_000),
    );
    let engine = engine_with(
        ethereum.clone(),
        Arc::new(MockEvm::new()),
        Arc::new(MockSealevel::new()),
    );

    let tokens = vec![
        evm_token("ethereum", TokenStandard::EvmHypSynthetic, synthetic),
        evm_token("ethereum", TokenStandard::Erc20, plain),
        evm_token("ethereum", TokenStandard::EvmNative, addr(0)),
    ];
    let balances = engine.fetch_balances(&tokens, &evm_holders()).await;

    assert_eq!(balances[&tokens[0].key()], U256::from(1));
    assert_eq!(balances[&tokens[1].key()], U256::from(42));
    assert_eq!(balances[&tokens[2].key()], U256::from(10_000));

    assert_eq!(ethereum.batches(), vec![vec![(synthetic, BALANCE_OF)]]);
    assert_eq!(ethereum.direct_calls(), vec![(plain, BALANCE_OF)]);
    assert_eq!(*ethereum.native_calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_chain_without_id_is_served_by_fallback() {
    let synthetic = addr(0xaa);
    let devnet = Arc::new(MockEvm::new().with_balance(synthetic, 31).with_native(2));

    let mut registry = registry();
    registry.insert(ChainMetadata {
        chain_id: None,
        ..ChainMetadata::evm("devnet", 0, "http://127.0.0.1:8545")
    });
    let pool = Arc::new(ConnectionPool::new(registry));
    pool.insert_evm_by_name("devnet", devnet.clone());

    let token = evm_token("devnet", TokenStandard::EvmHypSynthetic, synthetic);
    let fallback = RpcFallback::new(pool.clone());
    assert_eq!(
        fallback.balance_of(&token, EVM_HOLDER).await.unwrap(),
        U256::from(31)
    );

    let engine = BalanceEngine::new(pool);
    let tokens = vec![token, evm_token("devnet", TokenStandard::EvmNative, addr(0))];
    let balances = engine.fetch_balances(&tokens, &evm_holders()).await;

    assert_eq!(balances[&tokens[0].key()], U256::from(31));
    assert_eq!(balances[&tokens[1].key()], U256::from(2));
    assert!(devnet.batches().is_empty());
    assert_eq!(
        devnet.direct_calls(),
        vec![(synthetic, BALANCE_OF), (synthetic, BALANCE_OF)]
    );
}
