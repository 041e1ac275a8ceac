use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::debug;
use uuid::Uuid;

use super::dto::{ApiError, BalanceResponse, OperationRequest, StatusResponse};
use crate::core::{BalanceStore, OperationCoordinator};

/// `GET /health`
pub(super) async fn health() -> &'static str {
    "OK"
}

/// `POST /api/v1/wallet`
pub(super) async fn apply_operation<S: BalanceStore + 'static>(
    State(coordinator): State<OperationCoordinator<S>>,
    payload: Result<Json<OperationRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            debug!(error = %rejection, "rejected request body");
            return ApiError::bad_request("Invalid request body").into_response();
        }
    };

    let operation = match request.into_operation() {
        Ok(operation) => operation,
        Err(e) => return e.into_response(),
    };

    match coordinator.apply(&operation).await {
        Ok(_) => Json(StatusResponse::success()).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// `GET /api/v1/wallets/:wallet_id`
pub(super) async fn get_balance<S: BalanceStore + 'static>(
    State(coordinator): State<OperationCoordinator<S>>,
    Path(wallet_id): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let wallet_id =
        Uuid::parse_str(&wallet_id).map_err(|_| ApiError::bad_request("Invalid wallet ID"))?;

    let balance = coordinator.balance(wallet_id).await?;

    Ok(Json(BalanceResponse { wallet_id, balance }))
}
