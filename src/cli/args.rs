use crate::core::{Backoff, RetryConfig};
use crate::strategy::BatchConfig;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Wallet balances with optimistic concurrency and bounded retry
#[derive(Parser, Debug)]
#[command(name = "wallet-ledger")]
#[command(about = "Wallet balances with optimistic concurrency and bounded retry", long_about = None)]
pub struct CliArgs {
    #[command(flatten)]
    pub retry: RetryArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a CSV journal of operations and print the final wallets
    Replay(ReplayArgs),
    /// Serve the HTTP API
    Serve(ServeArgs),
    /// Fire concurrent deposits at one fresh wallet and report the outcome
    Loadtest(LoadtestArgs),
}

/// Retry policy shared by every command
#[derive(Args, Debug, Clone)]
pub struct RetryArgs {
    /// Maximum store attempts per operation
    #[arg(
        long = "max-attempts",
        env = "WALLET_MAX_ATTEMPTS",
        value_name = "COUNT",
        default_value_t = 10,
        global = true
    )]
    pub max_attempts: u32,

    /// Quadratic backoff unit: the n-th retry waits unit * n^2
    #[arg(
        long = "backoff-ms",
        env = "WALLET_BACKOFF_MS",
        value_name = "MILLIS",
        default_value_t = 10,
        global = true
    )]
    pub backoff_ms: u64,

    /// Deadline for a single attempt; 0 disables it
    #[arg(
        long = "attempt-timeout-ms",
        env = "WALLET_ATTEMPT_TIMEOUT_MS",
        value_name = "MILLIS",
        global = true
    )]
    pub attempt_timeout_ms: Option<u64>,
}

impl RetryArgs {
    /// Create a RetryConfig from CLI arguments
    ///
    /// A zero `max_attempts` falls back to the default with a warning.
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig::new(
            self.max_attempts,
            Backoff::Quadratic {
                unit: Duration::from_millis(self.backoff_ms),
            },
            self.attempt_timeout_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
        )
    }
}

/// Arguments of `replay`
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Input CSV file path containing operation records
    #[arg(value_name = "INPUT", help = "Path to the input CSV file")]
    pub input_file: PathBuf,

    /// Replay strategy
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "sync",
        help = "Replay strategy: 'sync' for file order or 'async' for concurrent batches"
    )]
    pub strategy: StrategyType,

    /// Number of operations per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of operations per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Number of worker threads (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Number of worker threads (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,
}

/// Available replay strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl ReplayArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Missing values take their defaults; zero values fall back with a
    /// warning.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }
}

/// Storage selection for `serve` and `loadtest`
#[derive(Args, Debug, Clone)]
pub struct StorageArgs {
    /// PostgreSQL connection URL; the in-memory store is used when absent
    #[arg(long = "database-url", env = "DATABASE_URL", value_name = "URL")]
    pub database_url: Option<String>,

    /// Maximum pooled database connections
    #[arg(
        long = "pool-size",
        env = "DB_POOL_SIZE",
        value_name = "COUNT",
        default_value_t = 25
    )]
    pub pool_size: usize,

    /// Create the wallets table before starting
    #[arg(long = "migrate")]
    pub migrate: bool,
}

/// Arguments of `serve`
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Socket address to listen on
    #[arg(
        long = "bind",
        env = "WALLET_BIND",
        value_name = "ADDR",
        default_value = "0.0.0.0:8080"
    )]
    pub bind: String,

    #[command(flatten)]
    pub storage: StorageArgs,
}

/// Arguments of `loadtest`
#[derive(Args, Debug)]
pub struct LoadtestArgs {
    /// Number of concurrent deposits
    #[arg(long = "requests", value_name = "COUNT", default_value_t = 1000)]
    pub requests: usize,

    #[command(flatten)]
    pub storage: StorageArgs,
}
