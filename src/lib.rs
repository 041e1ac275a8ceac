//! Wallet Ledger Library
//! # Overview
//!
//! This library keeps wallet balances consistent under concurrent deposits and
//! withdrawals. Every mutation is an optimistic read-modify-write that bumps a
//! per-wallet version; callers go through a coordinator that retries attempts
//! which lost to a concurrent writer.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Wallet, Operation, errors)
//! - [`core`] - Business logic components:
//!   - [`core::traits`] - The `BalanceStore` seam
//!   - [`core::memory_store`] - In-memory store with per-row locks
//!   - `core::postgres_store` - PostgreSQL store (feature `postgres`)
//!   - [`core::coordinator`] - Bounded retry with backoff
//! - [`io`] - CSV journal parsing and wallet output
//! - [`strategy`] - Sync and async replay pipelines
//! - `http` - axum request layer (feature `http`)
//! - [`loadtest`] - In-process contention scenario
//! - [`cli`] - CLI arguments parsing
//! - [`logging`] - Tracing subscriber setup
//!
//! # Operations
//!
//! - **Deposit**: Credit a wallet, creating it on first use
//! - **Withdraw**: Debit an existing wallet; never drives the balance negative
//!
//! # Wallet State
//!
//! Each wallet maintains:
//! - `balance`: Non-negative decimal balance
//! - `version`: 1 at creation, incremented by every committed mutation

// Module declarations
pub mod cli;
pub mod core;
#[cfg(feature = "http")]
pub mod http;
pub mod io;
pub mod loadtest;
pub mod logging;
pub mod strategy;
pub mod types;

pub use core::{BalanceStore, InMemoryBalanceStore, OperationCoordinator, RetryConfig};
#[cfg(feature = "postgres")]
pub use core::{PostgresBalanceStore, PostgresConfig};
pub use io::write_wallets_csv;
pub use types::{ApplyError, Operation, OperationType, StoreError, Wallet, WalletId};
