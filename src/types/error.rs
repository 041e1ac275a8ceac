//! Error types for the wallet ledger
//!
//! This module defines the closed outcome sets of the two core layers.
//!
//! # Error Categories
//!
//! - **Business outcomes**: `NotFound`, `InsufficientFunds`. Final; surfaced
//!   verbatim from the store through the coordinator.
//! - **Concurrency outcomes**: `StoreError::Conflict`. Local to the
//!   store/coordinator boundary; retried or turned into `ExhaustedRetries`.
//! - **Infrastructure outcomes**: `Storage`, `Timeout`. Transient; callers may
//!   retry them at a higher level.

use super::wallet::WalletId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Outcome of a single store call that did not commit
///
/// Every `mutate_balance` attempt either commits or fails with exactly one of
/// these variants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// No wallet row exists for the id
    #[error("Wallet {wallet} not found")]
    NotFound {
        /// The wallet that was looked up
        wallet: WalletId,
    },

    /// A withdraw asked for more than the wallet holds
    ///
    /// The transaction is aborted; balance and version stay unchanged.
    #[error("Insufficient funds in wallet {wallet}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// Wallet ID
        wallet: WalletId,
        /// Balance read under the row lock
        balance: Decimal,
        /// Requested withdraw amount
        requested: Decimal,
    },

    /// Another writer committed first
    ///
    /// Either the conditional update matched no row, or the insert of a new
    /// wallet hit an existing primary key (`expected_version` is 0 then).
    #[error("Version conflict on wallet {wallet} (expected version {expected_version})")]
    Conflict {
        /// Wallet ID
        wallet: WalletId,
        /// Version read at lock acquisition
        expected_version: i64,
    },

    /// I/O-level failure unrelated to the business rules
    #[error("Storage failure: {message}")]
    Storage {
        /// Description of the failure
        message: String,
    },
}

impl StoreError {
    /// Create a NotFound error
    pub fn not_found(wallet: WalletId) -> Self {
        StoreError::NotFound { wallet }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(wallet: WalletId, balance: Decimal, requested: Decimal) -> Self {
        StoreError::InsufficientFunds {
            wallet,
            balance,
            requested,
        }
    }

    /// Create a Conflict error
    pub fn conflict(wallet: WalletId, expected_version: i64) -> Self {
        StoreError::Conflict {
            wallet,
            expected_version,
        }
    }

    /// Create a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        StoreError::Storage {
            message: message.into(),
        }
    }
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for StoreError {
    fn from(error: tokio_postgres::Error) -> Self {
        StoreError::storage(error.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<deadpool_postgres::PoolError> for StoreError {
    fn from(error: deadpool_postgres::PoolError) -> Self {
        StoreError::storage(format!("connection pool: {}", error))
    }
}

/// Outcome of a coordinated operation that did not succeed
///
/// `Conflict` never appears here: the coordinator either retries it or reports
/// `ExhaustedRetries`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApplyError {
    /// No wallet row exists for the id
    #[error("Wallet {wallet} not found")]
    NotFound {
        /// The wallet that was looked up
        wallet: WalletId,
    },

    /// A withdraw asked for more than the wallet holds
    #[error("Insufficient funds in wallet {wallet}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// Wallet ID
        wallet: WalletId,
        /// Balance read under the row lock
        balance: Decimal,
        /// Requested withdraw amount
        requested: Decimal,
    },

    /// Every attempt lost the race to a concurrent writer
    #[error("Wallet {wallet} still contended after {attempts} attempts")]
    ExhaustedRetries {
        /// Wallet ID
        wallet: WalletId,
        /// Attempts made
        attempts: u32,
    },

    /// The store failed for reasons unrelated to the business rules
    #[error("Storage failure: {message}")]
    Storage {
        /// Description of the failure
        message: String,
    },

    /// An attempt overran the caller's deadline and was aborted
    #[error("Operation on wallet {wallet} timed out after {timeout_ms}ms")]
    Timeout {
        /// Wallet ID
        wallet: WalletId,
        /// Deadline that was exceeded
        timeout_ms: u64,
    },
}

impl ApplyError {
    /// Create an ExhaustedRetries error
    pub fn exhausted_retries(wallet: WalletId, attempts: u32) -> Self {
        ApplyError::ExhaustedRetries { wallet, attempts }
    }

    /// Create a Timeout error
    pub fn timeout(wallet: WalletId, timeout_ms: u64) -> Self {
        ApplyError::Timeout { wallet, timeout_ms }
    }

    /// Whether a caller may retry this outcome at a higher level
    ///
    /// Business rejections are never transient.
    pub fn is_transient(&self) -> bool {
        match self {
            ApplyError::NotFound { .. } | ApplyError::InsufficientFunds { .. } => false,
            ApplyError::ExhaustedRetries { .. }
            | ApplyError::Storage { .. }
            | ApplyError::Timeout { .. } => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use uuid::Uuid;

    const WALLET: Uuid = Uuid::from_u128(0x1);

    #[rstest]
    #[case::not_found(
        StoreError::not_found(WALLET),
        "Wallet 00000000-0000-0000-0000-000000000001 not found"
    )]
    #[case::insufficient_funds(
        StoreError::insufficient_funds(WALLET, Decimal::new(1000, 2), Decimal::new(40, 0)),
        "Insufficient funds in wallet 00000000-0000-0000-0000-000000000001: balance 10.00, requested 40"
    )]
    #[case::conflict(
        StoreError::conflict(WALLET, 7),
        "Version conflict on wallet 00000000-0000-0000-0000-000000000001 (expected version 7)"
    )]
    #[case::storage(
        StoreError::storage("connection reset"),
        "Storage failure: connection reset"
    )]
    fn test_store_error_display(#[case] error: StoreError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::exhausted(
        ApplyError::exhausted_retries(WALLET, 3),
        "Wallet 00000000-0000-0000-0000-000000000001 still contended after 3 attempts"
    )]
    #[case::timeout(
        ApplyError::timeout(WALLET, 250),
        "Operation on wallet 00000000-0000-0000-0000-000000000001 timed out after 250ms"
    )]
    fn test_apply_error_display(#[case] error: ApplyError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::not_found(ApplyError::NotFound { wallet: WALLET }, false)]
    #[case::insufficient_funds(
        ApplyError::InsufficientFunds { wallet: WALLET, balance: Decimal::ZERO, requested: Decimal::ONE },
        false
    )]
    #[case::exhausted(ApplyError::exhausted_retries(WALLET, 1), true)]
    #[case::storage(ApplyError::Storage { message: "down".to_string() }, true)]
    #[case::timeout(ApplyError::timeout(WALLET, 10), true)]
    fn test_is_transient(#[case] error: ApplyError, #[case] expected: bool) {
        assert_eq!(error.is_transient(), expected);
    }
}
