//! Core balance-mutation module
//!
//! This module contains the ledger's core components:
//! - `traits` - The `BalanceStore` seam shared by every storage engine
//! - `memory_store` - In-memory store with per-row locks
//! - `postgres_store` - PostgreSQL store (feature `postgres`)
//! - `coordinator` - Bounded-retry front door over a store

pub mod coordinator;
pub mod memory_store;
#[cfg(feature = "postgres")]
pub mod postgres_store;
pub mod traits;

pub use coordinator::{Backoff, OperationCoordinator, RetryConfig};
pub use memory_store::InMemoryBalanceStore;
#[cfg(feature = "postgres")]
pub use postgres_store::{PostgresBalanceStore, PostgresConfig};
pub use traits::BalanceStore;
