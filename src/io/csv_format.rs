//! CSV format handling for operation records and wallet output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Validation and conversion from CSV records to operations
//! - Wallet output serialization
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::{Operation, OperationType, Wallet};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;
use uuid::Uuid;

/// CSV record structure for deserialization
///
/// Matches the input CSV format with columns: type, wallet, amount
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvRecord {
    #[serde(rename = "type")]
    pub op_type: String,
    pub wallet: String,
    pub amount: Option<String>,
}

/// Convert a CsvRecord to an Operation
///
/// This is the replay pipeline's request validation:
/// - Parses the operation type (case-insensitive)
/// - Parses the wallet id as a non-nil UUID
/// - Parses the amount and requires it to be positive
///
/// # Returns
///
/// Result containing either:
/// - Ok(Operation) - Successfully validated operation
/// - Err(String) - Error message describing the conversion failure
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<Operation, String> {
    let kind = OperationType::from_str(&csv_record.op_type)?;

    let wallet_id = Uuid::parse_str(csv_record.wallet.trim())
        .map_err(|_| format!("Invalid wallet id '{}'", csv_record.wallet))?;
    if wallet_id.is_nil() {
        return Err("walletId is required".to_string());
    }

    let amount = match csv_record.amount {
        Some(amount_str) if !amount_str.trim().is_empty() => Decimal::from_str(amount_str.trim())
            .map_err(|_| {
                format!(
                    "Invalid amount '{}' for wallet {}",
                    amount_str, csv_record.wallet
                )
            })?,
        _ => {
            return Err(format!(
                "{} for wallet {} requires an amount",
                kind, csv_record.wallet
            ))
        }
    };

    if amount <= Decimal::ZERO {
        return Err(format!(
            "amount must be positive, got {} for wallet {}",
            amount, csv_record.wallet
        ));
    }

    Ok(Operation {
        wallet_id,
        kind,
        amount,
    })
}

/// Write wallet states to CSV format
///
/// Writes wallets in CSV format with columns: wallet, balance, version
/// Wallets are sorted by id for deterministic output; balances are written
/// without trailing zeros.
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_wallets_csv(wallets: &[Wallet], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["wallet", "balance", "version"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted_wallets = wallets.to_vec();
    sorted_wallets.sort_by_key(|wallet| wallet.id);

    for wallet in sorted_wallets {
        writer
            .write_record(&[
                wallet.id.to_string(),
                wallet.balance.normalize().to_string(),
                wallet.version.to_string(),
            ])
            .map_err(|e| format!("Failed to write wallet record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
