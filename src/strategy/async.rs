//! Asynchronous batch replay strategy
//!
//! This module provides a concurrent implementation of the ProcessingStrategy
//! trait. Operations are read in batches and every operation of a batch is
//! spawned as its own task, so operations on the same wallet really contend
//! for its row and exercise the coordinator's retry path.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     └── OperationCoordinator (one clone per spawned task)
//!         └── InMemoryBalanceStore (DashMap rows, per-row locks)
//! ```
//!
//! # Ordering
//!
//! Batches run one after another, so an operation never races one from a
//! later batch. Within a batch the commit order is whatever the scheduler
//! produces: order-dependent journals (a withdraw relying on an earlier
//! deposit in the same batch) should use the sync strategy or a batch size
//! of 1. Commutative journals (deposits only, or withdraws that always fit)
//! end in the same state under both strategies.

use crate::core::{InMemoryBalanceStore, OperationCoordinator, RetryConfig};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_wallets_csv;
use crate::strategy::{ProcessingStrategy, ReplaySummary};
use futures::future::join_all;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, warn};

/// Configuration for batch processing
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Number of operations per batch
    pub batch_size: usize,
    /// Number of runtime worker threads
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig with custom values
    ///
    /// Zero values fall back to the defaults with a warning.
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                "Invalid batch_size ({}), using default ({})",
                batch_size, default.batch_size
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                "Invalid max_concurrent_batches ({}), using default ({})",
                max_concurrent_batches, default.max_concurrent_batches
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch replay strategy
///
/// # Configuration
///
/// - `batch_size`: Number of operations spawned together (default: 1000)
/// - `max_concurrent_batches`: Number of worker threads (default: CPU cores)
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
    retry: RetryConfig,
}

impl AsyncProcessingStrategy {
    /// Create a new AsyncProcessingStrategy
    pub fn new(config: BatchConfig, retry: RetryConfig) -> Self {
        Self { config, retry }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .enable_time()
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            let store = Arc::new(InMemoryBalanceStore::new());
            let coordinator = OperationCoordinator::new(Arc::clone(&store), self.retry.clone());

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;

            // Wrap tokio file in a compatibility layer for csv-async
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let mut summary = ReplaySummary::default();
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                let handles: Vec<_> = batch
                    .into_iter()
                    .map(|operation| {
                        let coordinator = coordinator.clone();
                        tokio::spawn(async move { coordinator.apply(&operation).await })
                    })
                    .collect();

                // Wait for the whole batch before reading the next one
                for joined in join_all(handles).await {
                    match joined {
                        Ok(outcome) => summary.record(&outcome),
                        Err(e) => {
                            error!(error = %e, "replay task failed");
                            summary.rejected += 1;
                        }
                    }
                }
            }

            summary.log("async");
            let wallets = store.wallets().await;
            write_wallets_csv(&wallets, output)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Backoff;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    const WALLET_A: &str = "00000000-0000-0000-0000-00000000000a";
    const WALLET_B: &str = "00000000-0000-0000-0000-00000000000b";

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig::new(
            50,
            Backoff::Quadratic {
                unit: Duration::from_millis(1),
            },
            None,
        )
    }

    fn replay(content: &str, config: BatchConfig) -> String {
        let file = create_temp_csv(content);
        let strategy = AsyncProcessingStrategy::new(config, fast_retry());
        let mut output = Vec::new();

        strategy.process(file.path(), &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_async_strategy_processes_valid_deposit() {
        let output = replay(
            &format!("type,wallet,amount\ndeposit,{},100.0\n", WALLET_A),
            BatchConfig::default(),
        );

        assert_eq!(
            output,
            format!("wallet,balance,version\n{},100,1\n", WALLET_A)
        );
    }

    #[test]
    fn test_async_strategy_contended_deposits_all_commit() {
        let mut content = String::from("type,wallet,amount\n");
        for _ in 0..40 {
            content.push_str(&format!("deposit,{},1\n", WALLET_A));
        }
        for _ in 0..10 {
            content.push_str(&format!("deposit,{},0.5\n", WALLET_B));
        }

        let output = replay(&content, BatchConfig::new(25, 4));

        assert_eq!(
            output,
            format!(
                "wallet,balance,version\n{},40,40\n{},5,10\n",
                WALLET_A, WALLET_B
            )
        );
    }

    #[test]
    fn test_async_strategy_batch_size_one_preserves_order() {
        let output = replay(
            &format!(
                "type,wallet,amount\n\
                 deposit,{a},100\n\
                 withdraw,{a},30\n\
                 withdraw,{a},20\n\
                 withdraw,{a},60\n",
                a = WALLET_A
            ),
            BatchConfig::new(1, 2),
        );

        // The last withdraw overdraws and is rejected
        assert_eq!(
            output,
            format!("wallet,balance,version\n{},50,3\n", WALLET_A)
        );
    }

    #[test]
    fn test_async_strategy_handles_missing_file() {
        let strategy = AsyncProcessingStrategy::new(BatchConfig::default(), fast_retry());
        let mut output = Vec::new();

        let result = strategy.process(Path::new("nonexistent.csv"), &mut output);
        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[test]
    fn test_batch_config_zero_values_fall_back() {
        let config = BatchConfig::new(0, 0);
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.max_concurrent_batches, num_cpus::get());
    }
}
