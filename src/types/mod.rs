//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `wallet`: The persisted wallet record and its identifier
//! - `operation`: Balance-changing operations submitted by callers
//! - `error`: Store-level and coordinator-level outcome types

pub mod error;
pub mod operation;
pub mod wallet;

pub use error::{ApplyError, StoreError};
pub use operation::{Operation, OperationType};
pub use wallet::{Wallet, WalletId};
