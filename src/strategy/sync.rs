//! Synchronous replay strategy
//!
//! This module provides a sequential implementation of the ProcessingStrategy
//! trait: operations are applied one at a time, in file order.
//!
//! # Design
//!
//! The SyncProcessingStrategy focuses on orchestration, delegating:
//! - CSV parsing to `SyncReader` (iterator interface)
//! - Balance mutations to `OperationCoordinator` over an `InMemoryBalanceStore`
//! - CSV output to `csv_format::write_wallets_csv`
//!
//! The coordinator API is async, so the pipeline drives it on a
//! current-thread runtime. With a single writer no conflict ever occurs, which
//! makes this strategy the reference result for any journal.

use crate::core::{InMemoryBalanceStore, OperationCoordinator, RetryConfig};
use crate::io::csv_format::write_wallets_csv;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{ProcessingStrategy, ReplaySummary};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Synchronous replay strategy
///
/// # Examples
///
/// ```no_run
/// use wallet_ledger::core::RetryConfig;
/// use wallet_ledger::strategy::{ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::io;
///
/// let strategy = SyncProcessingStrategy::new(RetryConfig::default());
/// let mut output = io::stdout();
///
/// strategy.process(Path::new("operations.csv"), &mut output)
///     .expect("Replay failed");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SyncProcessingStrategy {
    retry: RetryConfig,
}

impl SyncProcessingStrategy {
    /// Create a new SyncProcessingStrategy with the given retry policy
    pub fn new(retry: RetryConfig) -> Self {
        Self { retry }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        // Open before building the runtime so a missing file fails fast
        let reader = SyncReader::new(input_path)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        let store = Arc::new(InMemoryBalanceStore::new());
        let coordinator = OperationCoordinator::new(Arc::clone(&store), self.retry.clone());

        let wallets = runtime.block_on(async {
            let mut summary = ReplaySummary::default();

            for result in reader {
                match result {
                    Ok(operation) => summary.record(&coordinator.apply(&operation).await),
                    Err(e) => warn!(error = %e, "skipping invalid record"),
                }
            }

            summary.log("sync");
            store.wallets().await
        });

        write_wallets_csv(&wallets, output)
    }
}
