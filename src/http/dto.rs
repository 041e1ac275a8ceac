//! Wire types for the HTTP layer

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::types::{ApplyError, Operation, OperationType, WalletId};

/// Body of `POST /api/v1/wallet`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRequest {
    pub wallet_id: WalletId,
    pub operation_type: String,
    pub amount: Decimal,
}

impl OperationRequest {
    /// Validate into an operation the coordinator can apply
    pub fn into_operation(self) -> Result<Operation, ApiError> {
        if self.wallet_id.is_nil() {
            return Err(ApiError::bad_request("walletId is required"));
        }

        let kind = match self.operation_type.as_str() {
            "DEPOSIT" => OperationType::Deposit,
            "WITHDRAW" => OperationType::Withdraw,
            _ => {
                return Err(ApiError::bad_request(
                    "operationType must be DEPOSIT or WITHDRAW",
                ))
            }
        };

        if self.amount <= Decimal::ZERO {
            return Err(ApiError::bad_request("amount must be positive"));
        }

        Ok(Operation {
            wallet_id: self.wallet_id,
            kind,
            amount: self.amount,
        })
    }
}

/// Body of a successful mutation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
        }
    }
}

/// Body of `GET /api/v1/wallets/:wallet_id`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub wallet_id: WalletId,
    pub balance: Decimal,
}

/// An error reply: status code plus `{"error": message}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<ApplyError> for ApiError {
    fn from(error: ApplyError) -> Self {
        match error {
            ApplyError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, "Wallet not found"),
            ApplyError::InsufficientFunds { .. } => Self::bad_request("Insufficient funds"),
            ApplyError::ExhaustedRetries { .. } => {
                Self::new(StatusCode::CONFLICT, "Operation conflict, please retry")
            }
            ApplyError::Storage { .. } => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            ApplyError::Timeout { .. } => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "Operation timed out")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
