//! Storage service.
//!
//! Consumes chat messages from Kafka and writes them to PostgreSQL, then to
//! the Redis recent-history list.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin chatline-storage
//! ```

use chatline_server::{config::StorageConfig, ui::spawn_signal_listener};
use chatline_shared::logger::setup_logger;
use clap::Parser;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "debug");
    let config = StorageConfig::parse();

    let shutdown = CancellationToken::new();
    spawn_signal_listener(shutdown.clone());

    if let Err(e) = chatline_server::run_storage(config, shutdown).await {
        tracing::error!("Storage error: {:#}", e);
        std::process::exit(1);
    }
}
