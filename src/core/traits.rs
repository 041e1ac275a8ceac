//! Core trait for balance persistence
//!
//! This module defines the seam between the operation coordinator and the
//! storage engines, allowing the in-memory and PostgreSQL stores to be used
//! interchangeably.

use crate::types::{Operation, StoreError, Wallet, WalletId};
use rust_decimal::Decimal;
use std::future::Future;

/// Durable wallet storage executing one mutation attempt per call
///
/// Implementations must run `mutate_balance` inside a single transaction that
/// holds an exclusive lock on the target row from the initial read until commit
/// or abort. Callers contending for the same wallet are serialized; callers on
/// different wallets must not block each other.
pub trait BalanceStore: Send + Sync {
    /// Read the committed balance of a wallet
    ///
    /// Side-effect free. Fails with `StoreError::NotFound` when no row exists.
    fn read_balance(&self, id: WalletId)
        -> impl Future<Output = Result<Decimal, StoreError>> + Send;

    /// Read the committed wallet row, version included
    fn read_wallet(&self, id: WalletId) -> impl Future<Output = Result<Wallet, StoreError>> + Send;

    /// Execute exactly one mutation attempt
    ///
    /// # Returns
    ///
    /// * `Ok(Wallet)` - Committed; the wallet as it now stands
    /// * `Err(StoreError::NotFound)` - Withdraw against an unknown wallet
    /// * `Err(StoreError::InsufficientFunds)` - Withdraw larger than the balance
    /// * `Err(StoreError::Conflict)` - A concurrent writer committed first
    /// * `Err(StoreError::Storage)` - I/O-level failure
    ///
    /// Nothing is written unless the result is `Ok`.
    fn mutate_balance(
        &self,
        operation: &Operation,
    ) -> impl Future<Output = Result<Wallet, StoreError>> + Send;
}
