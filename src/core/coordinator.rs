//! Bounded-retry coordination of balance mutations
//!
//! This module provides the `OperationCoordinator` struct, the single entry
//! point callers use to apply an operation. It wraps a `BalanceStore`,
//! absorbs lock contention by retrying `Conflict` outcomes with a growing
//! backoff, and maps store outcomes into `ApplyError`.
//!
//! # Architecture
//!
//! ```text
//! OperationCoordinator
//!     ├── Arc<S: BalanceStore>  (one transaction per attempt)
//!     └── RetryConfig           (max_attempts, backoff, attempt_timeout)
//! ```
//!
//! # Retry Policy
//!
//! | store outcome        | coordinator                         |
//! |----------------------|-------------------------------------|
//! | committed            | `Ok(wallet)`                        |
//! | `Conflict`           | sleep `backoff.delay(attempt)`, retry |
//! | `NotFound`           | returned verbatim, no retry         |
//! | `InsufficientFunds`  | returned verbatim, no retry         |
//! | `Storage`            | returned as transient, no retry     |
//! | attempt timed out    | `Timeout`, no retry                 |
//!
//! Every attempt runs in a fresh transaction; no row lock is held during the
//! backoff sleep.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::traits::BalanceStore;
use crate::types::{ApplyError, Operation, StoreError, Wallet, WalletId};

/// Delay schedule between attempts that lost to a concurrent writer
///
/// Both schedules strictly increase with the attempt number (until they
/// saturate at `Duration::MAX`), so repeated contention never hot-loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `unit * (attempt + 1)^2`
    Quadratic {
        /// Delay after the first conflict
        unit: Duration,
    },

    /// `base * 2^attempt`
    Exponential {
        /// Delay after the first conflict
        base: Duration,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Quadratic {
            unit: Duration::from_millis(10),
        }
    }
}

impl Backoff {
    /// Delay to wait after the zero-based `attempt` ended in a conflict
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Quadratic { unit } => {
                let step = attempt.saturating_add(1);
                unit.saturating_mul(step.saturating_mul(step))
            }
            Backoff::Exponential { base } => {
                let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
                base.saturating_mul(factor)
            }
        }
    }
}

/// Configuration for the retry policy
///
/// Value-typed and handed to the coordinator at construction; nothing about
/// retries lives in process-wide state.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of store attempts per operation
    pub max_attempts: u32,
    /// Delay schedule between conflicting attempts
    pub backoff: Backoff,
    /// Deadline for a single attempt, lock wait included
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff: Backoff::default(),
            attempt_timeout: None,
        }
    }
}

impl RetryConfig {
    /// Create a new RetryConfig with custom values
    ///
    /// A zero `max_attempts` falls back to the default with a warning.
    pub fn new(max_attempts: u32, backoff: Backoff, attempt_timeout: Option<Duration>) -> Self {
        let default = Self::default();

        let max_attempts = if max_attempts == 0 {
            warn!(
                "Invalid max_attempts ({}), using default ({})",
                max_attempts, default.max_attempts
            );
            default.max_attempts
        } else {
            max_attempts
        };

        Self {
            max_attempts,
            backoff,
            attempt_timeout,
        }
    }
}

/// Retrying front door to a balance store
///
/// Cheap to clone; clones share the same store.
#[derive(Debug)]
pub struct OperationCoordinator<S> {
    store: Arc<S>,
    config: RetryConfig,
}

impl<S> Clone for OperationCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: BalanceStore> OperationCoordinator<S> {
    /// Create a new OperationCoordinator
    ///
    /// # Arguments
    ///
    /// * `store` - Arc-wrapped store shared with other coordinators or readers
    /// * `config` - Retry policy
    pub fn new(store: Arc<S>, config: RetryConfig) -> Self {
        Self { store, config }
    }

    /// The store this coordinator drives
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The retry policy in effect
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Read a wallet's committed balance
    ///
    /// Goes straight to the store; reads are never retried.
    pub async fn balance(&self, id: WalletId) -> Result<Decimal, ApplyError> {
        self.store
            .read_balance(id)
            .await
            .map_err(|e| Self::read_error(id, e))
    }

    /// Read a wallet's committed row
    pub async fn wallet(&self, id: WalletId) -> Result<Wallet, ApplyError> {
        self.store
            .read_wallet(id)
            .await
            .map_err(|e| Self::read_error(id, e))
    }

    /// Apply an operation, retrying while it loses to concurrent writers
    ///
    /// # Returns
    ///
    /// * `Ok(Wallet)` - The wallet as committed by the winning attempt
    /// * `Err(ApplyError::NotFound)` - Withdraw against an unknown wallet
    /// * `Err(ApplyError::InsufficientFunds)` - Withdraw larger than the balance
    /// * `Err(ApplyError::ExhaustedRetries)` - Every attempt hit a conflict
    /// * `Err(ApplyError::Storage)` - The store failed
    /// * `Err(ApplyError::Timeout)` - An attempt overran `attempt_timeout`
    ///
    /// Dropping the returned future aborts the in-flight attempt and releases
    /// its row lock.
    pub async fn apply(&self, operation: &Operation) -> Result<Wallet, ApplyError> {
        let wallet = operation.wallet_id;

        for attempt in 0..self.config.max_attempts {
            match self.attempt(operation).await? {
                Ok(committed) => return Ok(committed),
                Err(StoreError::Conflict { .. }) => {
                    if attempt + 1 == self.config.max_attempts {
                        break;
                    }
                    let delay = self.config.backoff.delay(attempt);
                    debug!(
                        wallet = %wallet,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "version conflict, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(StoreError::NotFound { wallet }) => {
                    return Err(ApplyError::NotFound { wallet })
                }
                Err(StoreError::InsufficientFunds {
                    wallet,
                    balance,
                    requested,
                }) => {
                    return Err(ApplyError::InsufficientFunds {
                        wallet,
                        balance,
                        requested,
                    })
                }
                Err(StoreError::Storage { message }) => {
                    warn!(wallet = %wallet, error = %message, "storage failure");
                    return Err(ApplyError::Storage { message });
                }
            }
        }

        warn!(
            wallet = %wallet,
            attempts = self.config.max_attempts,
            "giving up after repeated version conflicts"
        );
        Err(ApplyError::exhausted_retries(
            wallet,
            self.config.max_attempts,
        ))
    }

    /// Run one store attempt under the optional deadline
    ///
    /// The outer error is the terminal timeout; the inner result is the
    /// store's own outcome.
    async fn attempt(
        &self,
        operation: &Operation,
    ) -> Result<Result<Wallet, StoreError>, ApplyError> {
        let Some(limit) = self.config.attempt_timeout else {
            return Ok(self.store.mutate_balance(operation).await);
        };

        tokio::time::timeout(limit, self.store.mutate_balance(operation))
            .await
            .map_err(|_| {
                warn!(wallet = %operation.wallet_id, "attempt timed out, transaction aborted");
                ApplyError::timeout(operation.wallet_id, limit.as_millis() as u64)
            })
    }

    fn read_error(id: WalletId, error: StoreError) -> ApplyError {
        match error {
            StoreError::NotFound { wallet } => ApplyError::NotFound { wallet },
            StoreError::Storage { message } => ApplyError::Storage { message },
            // Reads take no part in the mutation protocol
            other @ (StoreError::InsufficientFunds { .. } | StoreError::Conflict { .. }) => {
                ApplyError::Storage {
                    message: format!("unexpected outcome reading wallet {}: {}", id, other),
                }
            }
        }
    }
}
