//! Wallet Ledger CLI
//!
//! # Usage
//!
//! ```bash
//! cargo run -- replay operations.csv > wallets.csv
//! cargo run -- replay --strategy async --batch-size 500 operations.csv > wallets.csv
//! cargo run -- serve --bind 0.0.0.0:8080
//! DATABASE_URL=postgres://localhost/wallets cargo run -- serve --migrate
//! cargo run -- --max-attempts 20 loadtest --requests 1000
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (file not found, database unreachable, bind failure, etc.)

use std::process;
use std::sync::Arc;

use tracing::{error, info};
use wallet_ledger::cli::{self, Command, LoadtestArgs, ServeArgs, StorageArgs};
use wallet_ledger::core::{InMemoryBalanceStore, RetryConfig};
use wallet_ledger::{logging, loadtest, strategy};

fn main() {
    let args = cli::parse_args();
    logging::init(logging::DEFAULT_FILTER);

    let retry = args.retry.to_retry_config();

    let result = match args.command {
        Command::Replay(replay) => {
            let config = if matches!(replay.strategy, cli::StrategyType::Async) {
                Some(replay.to_batch_config())
            } else {
                None
            };
            let strategy = strategy::create_strategy(replay.strategy, config, retry);

            // Output goes to stdout
            let mut output = std::io::stdout();
            strategy.process(&replay.input_file, &mut output)
        }
        Command::Serve(serve) => block_on(run_serve(serve, retry)),
        Command::Loadtest(load) => block_on(run_loadtest(load, retry)),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn block_on<F: std::future::Future<Output = Result<(), String>>>(future: F) -> Result<(), String> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to create tokio runtime: {}", e))?
        .block_on(future)
}

#[cfg(feature = "postgres")]
async fn connect_postgres(
    storage: &StorageArgs,
    url: &str,
) -> Result<Arc<wallet_ledger::PostgresBalanceStore>, String> {
    let config = wallet_ledger::PostgresConfig {
        url: url.to_string(),
        pool_size: storage.pool_size,
    };
    let store = wallet_ledger::PostgresBalanceStore::connect(&config)
        .await
        .map_err(|e| format!("Failed to connect to database: {}", e))?;

    if storage.migrate {
        store
            .run_migrations()
            .await
            .map_err(|e| format!("Failed to run migrations: {}", e))?;
    }
    Ok(Arc::new(store))
}

#[cfg(not(feature = "postgres"))]
fn postgres_disabled() -> Result<(), String> {
    Err("--database-url requires the `postgres` feature".to_string())
}

async fn run_serve(serve: ServeArgs, retry: RetryConfig) -> Result<(), String> {
    #[cfg(feature = "http")]
    {
        use wallet_ledger::core::OperationCoordinator;
        use wallet_ledger::http;

        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Unable to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
        };

        let served = match serve.storage.database_url.as_deref() {
            #[cfg(feature = "postgres")]
            Some(url) => {
                let store = connect_postgres(&serve.storage, url).await?;
                http::serve(OperationCoordinator::new(store, retry), &serve.bind, shutdown).await
            }
            #[cfg(not(feature = "postgres"))]
            Some(_) => return postgres_disabled(),
            None => {
                info!("DATABASE_URL not set, using in-memory storage");
                let store = Arc::new(InMemoryBalanceStore::new());
                http::serve(OperationCoordinator::new(store, retry), &serve.bind, shutdown).await
            }
        };

        served.map_err(|e| format!("HTTP server failed on {}: {}", serve.bind, e))
    }

    #[cfg(not(feature = "http"))]
    {
        let _ = (serve, retry);
        Err("`serve` requires the `http` feature".to_string())
    }
}

async fn run_loadtest(load: LoadtestArgs, retry: RetryConfig) -> Result<(), String> {
    let report = match load.storage.database_url.as_deref() {
        #[cfg(feature = "postgres")]
        Some(url) => {
            let store = connect_postgres(&load.storage, url).await?;
            loadtest::run_with_store(store, retry, load.requests).await
        }
        #[cfg(not(feature = "postgres"))]
        Some(_) => return postgres_disabled(),
        None => {
            let store = Arc::new(InMemoryBalanceStore::new());
            loadtest::run_with_store(store, retry, load.requests).await
        }
    };

    println!("{}", report);
    Ok(())
}
