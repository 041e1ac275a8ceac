//! HTTP request layer integration tests.
//!
//! Starts an axum server over the in-memory store and exercises it with reqwest.

#![cfg(feature = "http")]

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::{json, Value};
use uuid::Uuid;
use wallet_ledger::core::{Backoff, InMemoryBalanceStore, OperationCoordinator, RetryConfig};
use wallet_ledger::http;

/// Bind to port 0 and return the base URL.
async fn start_server() -> String {
    let coordinator = OperationCoordinator::new(
        Arc::new(InMemoryBalanceStore::new()),
        RetryConfig::new(
            50,
            Backoff::Quadratic {
                unit: Duration::from_millis(1),
            },
            None,
        ),
    );
    let app = http::router(coordinator);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn post_operation(
    client: &reqwest::Client,
    base: &str,
    body: Value,
) -> (reqwest::StatusCode, Value) {
    let resp = client
        .post(format!("{base}/api/v1/wallet"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

async fn balance_of(client: &reqwest::Client, base: &str, id: Uuid) -> Decimal {
    let resp = client
        .get(format!("{base}/api/v1/wallets/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["walletId"], json!(id.to_string()));
    Decimal::from_str(body["balance"].as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn health_check() {
    let base = start_server().await;

    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn deposit_then_withdraw() {
    let base = start_server().await;
    let client = reqwest::Client::new();
    let id = Uuid::new_v4();

    let (status, body) = post_operation(
        &client,
        &base,
        json!({ "walletId": id, "operationType": "DEPOSIT", "amount": "100" }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "status": "success" }));

    let (status, _) = post_operation(
        &client,
        &base,
        json!({ "walletId": id, "operationType": "WITHDRAW", "amount": 40 }),
    )
    .await;
    assert_eq!(status, 200);

    assert_eq!(balance_of(&client, &base, id).await, Decimal::from(60));
}

#[tokio::test]
async fn business_outcomes_map_to_status_codes() {
    let base = start_server().await;
    let client = reqwest::Client::new();
    let id = Uuid::new_v4();

    let (status, body) = post_operation(
        &client,
        &base,
        json!({ "walletId": id, "operationType": "WITHDRAW", "amount": "1" }),
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(body, json!({ "error": "Wallet not found" }));

    post_operation(
        &client,
        &base,
        json!({ "walletId": id, "operationType": "DEPOSIT", "amount": "5" }),
    )
    .await;
    let (status, body) = post_operation(
        &client,
        &base,
        json!({ "walletId": id, "operationType": "WITHDRAW", "amount": "5.01" }),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body, json!({ "error": "Insufficient funds" }));

    assert_eq!(balance_of(&client, &base, id).await, Decimal::from(5));
}

#[tokio::test]
async fn request_validation() {
    let base = start_server().await;
    let client = reqwest::Client::new();
    let id = Uuid::new_v4();

    let cases = [
        (
            json!({ "walletId": Uuid::nil(), "operationType": "DEPOSIT", "amount": "1" }),
            "walletId is required",
        ),
        (
            json!({ "walletId": id, "operationType": "TRANSFER", "amount": "1" }),
            "operationType must be DEPOSIT or WITHDRAW",
        ),
        (
            json!({ "walletId": id, "operationType": "DEPOSIT", "amount": "0" }),
            "amount must be positive",
        ),
        (
            json!({ "walletId": id, "operationType": "DEPOSIT", "amount": "-3" }),
            "amount must be positive",
        ),
        (
            json!({ "walletId": "not-a-uuid", "operationType": "DEPOSIT", "amount": "1" }),
            "Invalid request body",
        ),
        (json!({ "walletId": id }), "Invalid request body"),
    ];

    for (body, message) in cases {
        let (status, reply) = post_operation(&client, &base, body).await;
        assert_eq!(status, 400, "{message}");
        assert_eq!(reply, json!({ "error": message }));
    }

    // Nothing was created along the way
    let resp = client
        .get(format!("{base}/api/v1/wallets/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn malformed_json_is_rejected() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/v1/wallet"))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Invalid request body" }));
}

#[tokio::test]
async fn balance_lookup_errors() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{base}/api/v1/wallets/not-a-uuid"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Invalid wallet ID" }));

    let resp = client
        .get(format!("{base}/api/v1/wallets/{}", Uuid::new_v4()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Wallet not found" }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_deposits_over_http() {
    let base = start_server().await;
    let client = reqwest::Client::new();
    let id = Uuid::new_v4();

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let client = client.clone();
            let base = base.clone();
            tokio::spawn(async move {
                post_operation(
                    &client,
                    &base,
                    json!({ "walletId": id, "operationType": "DEPOSIT", "amount": "1" }),
                )
                .await
                .0
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), 200);
    }

    assert_eq!(balance_of(&client, &base, id).await, Decimal::from(100));
}
