//! In-process contention scenario
//!
//! Fires `requests` concurrent deposits of 1 at one fresh wallet through a
//! coordinator and reports how many committed. With a correct store every
//! request commits, and the wallet ends with balance and version both equal
//! to `requests`.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::{BalanceStore, OperationCoordinator, RetryConfig};
use crate::types::{ApplyError, Operation, Wallet, WalletId};

/// Outcome of a load test run
#[derive(Debug, Clone, PartialEq)]
pub struct LoadTestReport {
    pub wallet_id: WalletId,
    pub requests: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
    /// Committed state after every request finished
    pub wallet: Option<Wallet>,
}

impl LoadTestReport {
    /// Whether every deposit landed exactly once
    pub fn is_consistent(&self) -> bool {
        match &self.wallet {
            Some(wallet) => {
                wallet.balance == Decimal::from(self.succeeded as u64)
                    && wallet.version == self.succeeded as i64
            }
            None => self.succeeded == 0,
        }
    }

    /// Requests per second over the whole run
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.requests as f64 / secs
    }
}

impl fmt::Display for LoadTestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "wallet: {}", self.wallet_id)?;
        writeln!(f, "requests: {}", self.requests)?;
        writeln!(f, "succeeded: {}", self.succeeded)?;
        writeln!(f, "failed: {}", self.failed)?;
        writeln!(f, "elapsed_ms: {}", self.elapsed.as_millis())?;
        writeln!(f, "throughput_rps: {:.2}", self.throughput())?;
        match &self.wallet {
            Some(wallet) => {
                writeln!(f, "balance: {}", wallet.balance.normalize())?;
                writeln!(f, "version: {}", wallet.version)?;
            }
            None => writeln!(f, "balance: <none>")?,
        }
        write!(f, "consistent: {}", self.is_consistent())
    }
}

/// Run the scenario against a new random wallet
pub async fn run<S: BalanceStore + 'static>(
    coordinator: &OperationCoordinator<S>,
    requests: usize,
) -> LoadTestReport {
    run_for_wallet(coordinator, Uuid::new_v4(), requests).await
}

/// Run the scenario against `wallet_id`, which should not exist yet
pub async fn run_for_wallet<S: BalanceStore + 'static>(
    coordinator: &OperationCoordinator<S>,
    wallet_id: WalletId,
    requests: usize,
) -> LoadTestReport {
    info!(wallet = %wallet_id, requests, "starting load test");
    let started = Instant::now();

    let handles: Vec<_> = (0..requests)
        .map(|_| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .apply(&Operation::deposit(wallet_id, Decimal::ONE))
                    .await
            })
        })
        .collect();

    let mut succeeded = 0;
    let mut failed = 0;
    for joined in join_all(handles).await {
        match joined {
            Ok(Ok(_)) => succeeded += 1,
            Ok(Err(e)) => {
                warn!(error = %e, "deposit failed");
                failed += 1;
            }
            Err(e) => {
                warn!(error = %e, "deposit task failed");
                failed += 1;
            }
        }
    }
    let elapsed = started.elapsed();

    let wallet = match coordinator.wallet(wallet_id).await {
        Ok(wallet) => Some(wallet),
        Err(ApplyError::NotFound { .. }) => None,
        Err(e) => {
            warn!(error = %e, "failed to read final balance");
            None
        }
    };

    LoadTestReport {
        wallet_id,
        requests,
        succeeded,
        failed,
        elapsed,
        wallet,
    }
}

/// Shared entry point for a store wrapped in an `Arc`
pub async fn run_with_store<S: BalanceStore + 'static>(
    store: Arc<S>,
    config: RetryConfig,
    requests: usize,
) -> LoadTestReport {
    run(&OperationCoordinator::new(store, config), requests).await
}
