//! Operation-related types
//!
//! This module defines the balance-changing operations callers submit to the
//! ledger. Operations are ephemeral: they are never persisted, and the
//! coordinator may resubmit the same value several times.

use super::error::StoreError;
use super::wallet::WalletId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of a balance change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationType {
    /// Credit funds to a wallet
    ///
    /// Creates the wallet if it doesn't exist yet.
    Deposit,

    /// Debit funds from a wallet
    ///
    /// Requires an existing wallet holding at least the requested amount.
    Withdraw,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationType::Deposit => f.write_str("DEPOSIT"),
            OperationType::Withdraw => f.write_str("WITHDRAW"),
        }
    }
}

impl FromStr for OperationType {
    type Err = String;

    /// Parse an operation type, ignoring case
    ///
    /// `withdrawal` is accepted as an alias of `withdraw`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deposit" => Ok(OperationType::Deposit),
            "withdraw" | "withdrawal" => Ok(OperationType::Withdraw),
            _ => Err(format!("Invalid operation type: '{}'", s)),
        }
    }
}

/// A request to change one wallet's balance
///
/// The request layer guarantees the amount is positive before an Operation
/// reaches the core; the core performs no input validation of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Target wallet
    pub wallet_id: WalletId,

    /// Credit or debit
    pub kind: OperationType,

    /// Positive amount to move
    pub amount: Decimal,
}

impl Operation {
    /// Build a deposit operation
    pub fn deposit(wallet_id: WalletId, amount: Decimal) -> Self {
        Operation {
            wallet_id,
            kind: OperationType::Deposit,
            amount,
        }
    }

    /// Build a withdraw operation
    pub fn withdraw(wallet_id: WalletId, amount: Decimal) -> Self {
        Operation {
            wallet_id,
            kind: OperationType::Withdraw,
            amount,
        }
    }

    /// Compute the balance this operation leaves behind
    ///
    /// # Arguments
    ///
    /// * `balance` - The committed balance read under the row lock
    ///
    /// # Returns
    ///
    /// * `Ok(Decimal)` - The new balance
    /// * `Err(StoreError::InsufficientFunds)` - A withdraw larger than the balance
    /// * `Err(StoreError::Storage)` - The result does not fit a Decimal
    pub fn next_balance(&self, balance: Decimal) -> Result<Decimal, StoreError> {
        match self.kind {
            OperationType::Deposit => balance.checked_add(self.amount).ok_or_else(|| {
                StoreError::storage(format!(
                    "balance overflow depositing {} into wallet {}",
                    self.amount, self.wallet_id
                ))
            }),
            OperationType::Withdraw => {
                if self.amount > balance {
                    return Err(StoreError::insufficient_funds(
                        self.wallet_id,
                        balance,
                        self.amount,
                    ));
                }
                balance.checked_sub(self.amount).ok_or_else(|| {
                    StoreError::storage(format!(
                        "balance underflow withdrawing {} from wallet {}",
                        self.amount, self.wallet_id
                    ))
                })
            }
        }
    }
}
