//! Replay strategy module
//!
//! This module defines the Strategy pattern for complete replay pipelines,
//! covering both CSV parsing and application through the operation coordinator.
//! Different pipelines (synchronous, asynchronous batch) can be selected at
//! runtime.

use crate::cli::StrategyType;
use crate::core::RetryConfig;
use crate::types::ApplyError;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete replay pipelines
///
/// Each strategy reads operations from a CSV journal, applies them through an
/// `OperationCoordinator` over a fresh in-memory store, and writes the final
/// wallet states to output.
pub trait ProcessingStrategy: Send + Sync {
    /// Replay operations from `input_path` and write wallets to `output`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input file cannot be opened
    /// - The async runtime cannot be created
    /// - Output cannot be written
    ///
    /// Malformed rows and rejected operations are logged and skipped; they
    /// never fail the replay.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String>;
}

/// Tally of a finished replay
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Operations committed
    pub applied: usize,
    /// Operations the coordinator refused
    pub rejected: usize,
}

impl ReplaySummary {
    /// Count one coordinator outcome
    pub fn record<T>(&mut self, outcome: &Result<T, ApplyError>) {
        match outcome {
            Ok(_) => self.applied += 1,
            Err(e) => {
                debug!(error = %e, "operation rejected");
                self.rejected += 1;
            }
        }
    }

    fn log(&self, strategy: &str) {
        info!(
            strategy,
            applied = self.applied,
            rejected = self.rejected,
            "replay finished"
        );
    }
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create (Sync or Async)
/// * `batch` - Optional batch configuration (ignored for sync)
/// * `retry` - Retry policy for the coordinator both strategies drive
pub fn create_strategy(
    strategy_type: StrategyType,
    batch: Option<BatchConfig>,
    retry: RetryConfig,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(retry)),
        StrategyType::Async => {
            let batch = batch.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(batch, retry))
        }
    }
}
