//! PostgreSQL balance store
//!
//! This module provides the `PostgresBalanceStore` struct, a `BalanceStore`
//! backed by a `wallets` table and a `deadpool-postgres` connection pool.
//!
//! # Protocol
//!
//! Each mutation attempt checks out one pooled connection and runs one
//! READ COMMITTED transaction:
//!
//! ```text
//! SELECT balance, version ... FOR UPDATE     (row lock held until commit/abort)
//!   ├── no row:  INSERT (unique violation => Conflict) | NotFound
//!   └── row:     UPDATE ... WHERE id = $2 AND version = $3
//!                  └── 0 rows => Conflict
//! COMMIT
//! ```
//!
//! Dropping an attempt mid-flight drops its transaction, which rolls back and
//! releases the row lock.

use deadpool_postgres::{
    Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime, Transaction,
};
use rust_decimal::Decimal;
use tokio_postgres::error::SqlState;
use tokio_postgres::{IsolationLevel, NoTls};
use tracing::{info, warn};

use super::traits::BalanceStore;
use crate::types::{Operation, OperationType, StoreError, Wallet, WalletId};

/// Schema for the `wallets` table
pub const MIGRATION: &str = include_str!("../../migrations/001_create_wallets.sql");

const SELECT_BALANCE: &str = "SELECT balance FROM wallets WHERE id = $1";
const SELECT_WALLET: &str = "SELECT balance, version FROM wallets WHERE id = $1";
const SELECT_FOR_UPDATE: &str = "SELECT balance, version FROM wallets WHERE id = $1 FOR UPDATE";
const INSERT_WALLET: &str = "INSERT INTO wallets (id, balance, version) VALUES ($1, $2, $3)";
const UPDATE_IF_VERSION: &str =
    "UPDATE wallets SET balance = $1, version = version + 1 WHERE id = $2 AND version = $3";

/// Connection settings for the PostgreSQL store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    /// libpq-style connection string or `postgres://` URL
    pub url: String,
    /// Maximum pooled connections
    pub pool_size: usize,
}

impl PostgresConfig {
    /// Default maximum pooled connections
    pub const DEFAULT_POOL_SIZE: usize = 25;

    /// Settings for `url` with the default pool size
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pool_size: Self::DEFAULT_POOL_SIZE,
        }
    }
}

/// Wallet storage in PostgreSQL
#[derive(Clone)]
pub struct PostgresBalanceStore {
    pool: Pool,
}

impl PostgresBalanceStore {
    /// Build the pool and check that the database answers
    pub async fn connect(config: &PostgresConfig) -> Result<Self, StoreError> {
        let mut cfg = Config::new();
        cfg.url = Some(config.url.clone());
        cfg.pool = Some(PoolConfig::new(config.pool_size.max(1)));
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| StoreError::storage(format!("failed to create pool: {}", e)))?;

        let store = Self::from_pool(pool);
        store.ping().await?;

        info!(pool_size = config.pool_size, "PostgreSQL storage initialized");
        Ok(store)
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: Pool) -> Self {
        Self { pool }
    }

    /// Round-trip a trivial query
    pub async fn ping(&self) -> Result<(), StoreError> {
        let client = self.pool.get().await?;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }

    /// Create the `wallets` table if it is missing
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        let client = self.pool.get().await?;
        client.batch_execute(MIGRATION).await?;
        info!("migrations completed");
        Ok(())
    }

    /// First deposit into an unknown wallet
    async fn create_wallet(
        tx: Transaction<'_>,
        operation: &Operation,
    ) -> Result<Wallet, StoreError> {
        let id = operation.wallet_id;
        let inserted = tx
            .execute(
                INSERT_WALLET,
                &[&id, &operation.amount, &Wallet::INITIAL_VERSION],
            )
            .await;

        match inserted {
            Ok(_) => {
                tx.commit().await?;
                Ok(Wallet::opened(id, operation.amount))
            }
            // A concurrent creator committed the same key first
            Err(e) if e.code() == Some(&SqlState::UNIQUE_VIOLATION) => {
                Self::abort(tx, StoreError::conflict(id, 0)).await
            }
            Err(e) => Self::abort(tx, e.into()).await,
        }
    }

    /// Roll back and report `outcome`
    async fn abort(tx: Transaction<'_>, outcome: StoreError) -> Result<Wallet, StoreError> {
        if let Err(e) = tx.rollback().await {
            warn!(error = %e, "rollback failed; connection will discard the transaction");
        }
        Err(outcome)
    }
}

impl BalanceStore for PostgresBalanceStore {
    async fn read_balance(&self, id: WalletId) -> Result<Decimal, StoreError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(SELECT_BALANCE, &[&id])
            .await?
            .ok_or_else(|| StoreError::not_found(id))?;
        Ok(row.try_get("balance")?)
    }

    async fn read_wallet(&self, id: WalletId) -> Result<Wallet, StoreError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(SELECT_WALLET, &[&id])
            .await?
            .ok_or_else(|| StoreError::not_found(id))?;
        Ok(Wallet {
            id,
            balance: row.try_get("balance")?,
            version: row.try_get("version")?,
        })
    }

    async fn mutate_balance(&self, operation: &Operation) -> Result<Wallet, StoreError> {
        let id = operation.wallet_id;
        let mut client = self.pool.get().await?;
        let tx = client
            .build_transaction()
            .isolation_level(IsolationLevel::ReadCommitted)
            .start()
            .await?;

        let Some(row) = tx.query_opt(SELECT_FOR_UPDATE, &[&id]).await? else {
            return match operation.kind {
                OperationType::Deposit => Self::create_wallet(tx, operation).await,
                OperationType::Withdraw => Self::abort(tx, StoreError::not_found(id)).await,
            };
        };

        let balance: Decimal = row.try_get("balance")?;
        let read_version: i64 = row.try_get("version")?;

        let new_balance = match operation.next_balance(balance) {
            Ok(new_balance) => new_balance,
            Err(outcome) => return Self::abort(tx, outcome).await,
        };

        let updated = tx
            .execute(UPDATE_IF_VERSION, &[&new_balance, &id, &read_version])
            .await?;
        if updated == 0 {
            return Self::abort(tx, StoreError::conflict(id, read_version)).await;
        }

        tx.commit().await?;

        Ok(Wallet {
            id,
            balance: new_balance,
            version: read_version + 1,
        })
    }
}
