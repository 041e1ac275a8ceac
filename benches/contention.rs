//! Benchmark suite for contended vs. spread workloads
//!
//! Uses the divan benchmarking framework.
//!
//! # Running Benchmarks
//!
//! ```bash
//! cargo bench
//! ```
//!
//! `coordinator_deposits` fires 1,000 concurrent deposits spread over a
//! varying number of wallets: one wallet is the fully contended case, 1,000
//! wallets means no two operations touch the same row. The replay benches run
//! a generated journal through both strategies.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tempfile::NamedTempFile;
use uuid::Uuid;
use wallet_ledger::cli::StrategyType;
use wallet_ledger::core::{Backoff, InMemoryBalanceStore, OperationCoordinator, RetryConfig};
use wallet_ledger::strategy::{create_strategy, BatchConfig};
use wallet_ledger::Operation;

const OPERATIONS: usize = 1_000;

fn main() {
    divan::main();
}

fn retry_config() -> RetryConfig {
    RetryConfig::new(
        50,
        Backoff::Quadratic {
            unit: Duration::from_micros(100),
        },
        None,
    )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_time()
        .build()
        .expect("Failed to build runtime")
}

/// Concurrent deposits through the coordinator over `wallets` wallets
#[divan::bench(args = [1, 10, 100, 1_000])]
fn coordinator_deposits(bencher: divan::Bencher, wallets: usize) {
    let runtime = runtime();
    let ids: Vec<Uuid> = (0..wallets).map(|_| Uuid::new_v4()).collect();

    bencher.bench_local(|| {
        runtime.block_on(async {
            let coordinator =
                OperationCoordinator::new(Arc::new(InMemoryBalanceStore::new()), retry_config());

            let handles: Vec<_> = (0..OPERATIONS)
                .map(|i| {
                    let coordinator = coordinator.clone();
                    let id = ids[i % ids.len()];
                    tokio::spawn(async move {
                        coordinator
                            .apply(&Operation::deposit(id, Decimal::ONE))
                            .await
                    })
                })
                .collect();

            for handle in handles {
                handle
                    .await
                    .expect("task panicked")
                    .expect("deposit failed");
            }
        })
    });
}

/// Journal of deposits and affordable withdrawals over `wallets` wallets
fn journal(wallets: usize) -> NamedTempFile {
    let ids: Vec<Uuid> = (0..wallets).map(|_| Uuid::new_v4()).collect();
    let mut file = NamedTempFile::new().expect("Failed to create temp file");

    writeln!(file, "type,wallet,amount").expect("Failed to write journal");
    for i in 0..OPERATIONS {
        let id = ids[i % ids.len()];
        if i % 4 == 3 {
            writeln!(file, "withdraw,{},0.5", id).expect("Failed to write journal");
        } else {
            writeln!(file, "deposit,{},1", id).expect("Failed to write journal");
        }
    }
    file.flush().expect("Failed to flush journal");
    file
}

#[divan::bench(args = [1, 100])]
fn sync_replay(bencher: divan::Bencher, wallets: usize) {
    let input = journal(wallets);
    let strategy = create_strategy(StrategyType::Sync, None, retry_config());

    bencher.bench_local(|| {
        let mut output = Vec::new();
        strategy
            .process(input.path(), &mut output)
            .expect("Replay failed");
    });
}

#[divan::bench(args = [1, 100])]
fn async_replay(bencher: divan::Bencher, wallets: usize) {
    let input = journal(wallets);
    let strategy = create_strategy(
        StrategyType::Async,
        Some(BatchConfig::default()),
        retry_config(),
    );

    bencher.bench_local(|| {
        let mut output = Vec::new();
        strategy
            .process(input.path(), &mut output)
            .expect("Replay failed");
    });
}
