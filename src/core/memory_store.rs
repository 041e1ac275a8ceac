//! In-memory balance store with per-row locking
//!
//! This module provides the `InMemoryBalanceStore` struct, a `BalanceStore`
//! that keeps wallet rows in process memory while following the same
//! transactional protocol a relational engine would.
//!
//! # Design
//!
//! Rows live in a `DashMap` keyed by wallet id. Each row sits behind its own
//! `tokio::sync::Mutex`, whose owned guard plays the part of the exclusive row
//! lock (`SELECT ... FOR UPDATE`). A mutation attempt:
//!
//! ```text
//! lock row ──► absent ──► deposit: insert via vacant entry (occupied => Conflict)
//!    │                    withdraw: NotFound
//!    └─► present ──► compute new balance (InsufficientFunds aborts)
//!                    └─► conditional write: version unchanged? commit : Conflict
//! ```
//!
//! # Thread Safety
//!
//! The DashMap shard guard is only held long enough to clone the row handle;
//! it is never held across an await. Operations on different wallets never
//! contend, and a cancelled attempt drops its row guard, releasing the lock.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

use super::traits::BalanceStore;
use crate::types::{Operation, OperationType, StoreError, Wallet, WalletId};

/// Committed state of one wallet row
#[derive(Debug)]
pub(crate) struct WalletRow {
    balance: Decimal,
    version: i64,
}

impl WalletRow {
    /// Write a new balance only if the row still carries `expected_version`
    ///
    /// Returns `false`, leaving the row untouched, when the version moved on.
    fn update_if_version(&mut self, expected_version: i64, balance: Decimal) -> bool {
        if self.version != expected_version {
            return false;
        }
        self.balance = balance;
        self.version = expected_version + 1;
        true
    }
}

/// Thread-safe in-memory wallet storage
///
/// Intended for tests, benchmarks, CSV replay, and running the HTTP service
/// without a database.
#[derive(Debug, Default)]
pub struct InMemoryBalanceStore {
    rows: DashMap<WalletId, Arc<Mutex<WalletRow>>>,
}

impl InMemoryBalanceStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
        }
    }

    /// Number of wallets created so far
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no wallet has been created yet
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Snapshot every committed wallet
    ///
    /// Each row is read under its lock, so no half-applied mutation is ever
    /// observed. Wallets are returned in arbitrary order.
    pub async fn wallets(&self) -> Vec<Wallet> {
        let handles: Vec<(WalletId, Arc<Mutex<WalletRow>>)> = self
            .rows
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();

        let mut wallets = Vec::with_capacity(handles.len());
        for (id, row) in handles {
            let row = row.lock().await;
            wallets.push(Wallet {
                id,
                balance: row.balance,
                version: row.version,
            });
        }
        wallets
    }

    /// Acquire the exclusive lock on an existing row
    ///
    /// Returns `None` when the wallet doesn't exist. Like `FOR UPDATE` against
    /// a missing key, nothing is locked in that case.
    async fn lock_row(&self, id: WalletId) -> Option<OwnedMutexGuard<WalletRow>> {
        let row = self.rows.get(&id).map(|entry| Arc::clone(entry.value()))?;
        Some(row.lock_owned().await)
    }

    /// Insert a brand-new row, failing on an existing key
    fn insert_row(&self, id: WalletId, balance: Decimal) -> Result<Wallet, StoreError> {
        match self.rows.entry(id) {
            Entry::Occupied(_) => Err(StoreError::conflict(id, 0)),
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(Mutex::new(WalletRow {
                    balance,
                    version: Wallet::INITIAL_VERSION,
                })));
                Ok(Wallet::opened(id, balance))
            }
        }
    }

    /// Hold a row lock from outside the mutation path
    #[cfg(test)]
    pub(crate) async fn hold_row(&self, id: WalletId) -> Option<OwnedMutexGuard<WalletRow>> {
        self.lock_row(id).await
    }
}

impl BalanceStore for InMemoryBalanceStore {
    async fn read_balance(&self, id: WalletId) -> Result<Decimal, StoreError> {
        self.read_wallet(id).await.map(|wallet| wallet.balance)
    }

    async fn read_wallet(&self, id: WalletId) -> Result<Wallet, StoreError> {
        let row = self
            .lock_row(id)
            .await
            .ok_or_else(|| StoreError::not_found(id))?;

        Ok(Wallet {
            id,
            balance: row.balance,
            version: row.version,
        })
    }

    async fn mutate_balance(&self, operation: &Operation) -> Result<Wallet, StoreError> {
        let id = operation.wallet_id;

        let Some(mut row) = self.lock_row(id).await else {
            return match operation.kind {
                OperationType::Deposit => self.insert_row(id, operation.amount),
                OperationType::Withdraw => Err(StoreError::not_found(id)),
            };
        };

        // Snapshot as of lock acquisition
        let read_version = row.version;
        let balance = operation.next_balance(row.balance)?;

        if !row.update_if_version(read_version, balance) {
            return Err(StoreError::conflict(id, read_version));
        }

        trace!(wallet = %id, version = row.version, "committed");

        Ok(Wallet {
            id,
            balance: row.balance,
            version: row.version,
        })
    }
}
