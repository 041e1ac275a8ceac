//! Wallet-related types
//!
//! This module defines the Wallet record, the only entity the ledger persists.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Wallet identifier
///
/// Supplied by the caller; the store never generates one.
pub type WalletId = Uuid;

/// Committed wallet state
///
/// A snapshot of one wallet row as of the last committed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    /// The wallet identifier
    pub id: WalletId,

    /// Current balance
    ///
    /// Equals the sum of committed deposits minus the sum of committed
    /// withdrawals. Never negative.
    pub balance: Decimal,

    /// Optimistic-concurrency token
    ///
    /// Starts at 1 when the wallet is created by its first deposit and grows by
    /// exactly one per committed mutation.
    pub version: i64,
}

impl Wallet {
    /// Version assigned to a freshly created wallet
    pub const INITIAL_VERSION: i64 = 1;

    /// Create the wallet produced by a first deposit of `amount`
    pub fn opened(id: WalletId, amount: Decimal) -> Self {
        Wallet {
            id,
            balance: amount,
            version: Self::INITIAL_VERSION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opened_wallet_starts_at_version_one() {
        let id = Uuid::new_v4();
        let wallet = Wallet::opened(id, Decimal::new(2500, 2));

        assert_eq!(wallet.id, id);
        assert_eq!(wallet.balance, Decimal::new(25, 0));
        assert_eq!(wallet.version, 1);
    }
}
